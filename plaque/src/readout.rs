//! Per-plaque readouts for fluorescence wells.
//!
//! A readout combines the region geometry with the intensities of the virus
//! channel inside the plaque and, when a nuclei mask is available, estimates
//! of the number of cells the plaque covers.

use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::VirusDetectionParameters;
use crate::error::Result;
use crate::geometry::{convex_hull_image, estimator_for, GeometryEstimator};
use crate::image::{apply_mask, ensure_same_size, BinaryMask, IntensityImage};
use crate::peaks::{FluorescencePeakCounter, PixelCoord};
use crate::plaque::PlaqueRecord;
use crate::region::{BBox, Region};

/// Axis lengths of the ellipse with the same second central moments as a
/// pixel set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentAxes {
    pub major_axis_length: f64,
    pub minor_axis_length: f64,
}

impl MomentAxes {
    /// Axes of `coords` given as `(row, col)`. Empty input gives zeros.
    pub fn from_coords(coords: &[(usize, usize)]) -> Self {
        if coords.is_empty() {
            return Self {
                major_axis_length: 0.0,
                minor_axis_length: 0.0,
            };
        }

        let n = coords.len() as f64;
        let mean = coords
            .iter()
            .fold(DVec2::ZERO, |acc, &(r, c)| acc + DVec2::new(c as f64, r as f64))
            / n;

        let (mut mu20, mut mu02, mut mu11) = (0.0, 0.0, 0.0);
        for &(r, c) in coords {
            let d = DVec2::new(c as f64, r as f64) - mean;
            mu20 += d.x * d.x;
            mu02 += d.y * d.y;
            mu11 += d.x * d.y;
        }
        let (a, b, c) = (mu20 / n, mu11 / n, mu02 / n);

        let half_trace = (a + c) / 2.0;
        let spread = (((a - c) / 2.0).powi(2) + b * b).sqrt();
        let l1 = half_trace + spread;
        let l2 = (half_trace - spread).max(0.0);

        Self {
            major_axis_length: 4.0 * l1.sqrt(),
            minor_axis_length: 4.0 * l2.sqrt(),
        }
    }
}

/// Measurements of one plaque region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaqueReadout {
    pub label: u32,
    /// Area under the configured estimator.
    pub area: f64,
    pub perimeter: f64,
    /// `(x, y)` in image coordinates.
    pub centroid: DVec2,
    pub bbox: BBox,
    pub axes: MomentAxes,
    /// Contour ellipse-fit eccentricity, as for [`PlaqueRecord::eccentricity`].
    pub eccentricity: f64,
    /// As for [`PlaqueRecord::roundness`].
    pub roundness: f64,
    /// Pixels in the convex hull of the region.
    pub convex_area: usize,
    pub max_intensity: f64,
    pub total_intensity: f64,
    /// Mean over non-zero masked pixels, 0 when there are none.
    pub mean_intensity: f64,
    /// `None` when fine detection is off.
    pub peaks: Option<Vec<PixelCoord>>,
    /// Nuclei area inside the convex hull, in units of the mean cell area.
    pub nuclei_in_plaque: Option<f64>,
    /// Nuclei area inside the plaque itself, in units of the mean cell area.
    pub infected_nuclei: Option<f64>,
}

/// Builds [`PlaqueReadout`]s from segmented regions.
#[derive(Debug)]
pub struct PlaqueReader {
    params: VirusDetectionParameters,
    estimator: Box<dyn GeometryEstimator>,
    counter: FluorescencePeakCounter,
}

impl PlaqueReader {
    pub fn new(params: VirusDetectionParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            estimator: estimator_for(params.geometry()),
            counter: FluorescencePeakCounter::new(&params)?,
            params,
        })
    }

    pub fn params(&self) -> &VirusDetectionParameters {
        &self.params
    }

    pub fn estimator(&self) -> &dyn GeometryEstimator {
        self.estimator.as_ref()
    }

    /// Estimated area of the pixels set in both masks.
    fn overlap_area(&self, mask: &BinaryMask, nuclei: &BinaryMask) -> Result<f64> {
        let overlap = mask.zip_map(nuclei, |&a, &b| a && b)?;
        Ok(self.estimator.area(&overlap))
    }

    /// Reads one region of `image`. `nuclei_mask`, when given, covers the
    /// whole image. Nuclei estimates are `None` without a nuclei mask or
    /// without both cell-area bounds.
    pub fn read(
        &self,
        image: &IntensityImage,
        region: &Region,
        nuclei_mask: Option<&BinaryMask>,
    ) -> Result<PlaqueReadout> {
        let bbox = region.bbox;
        let crop = image.crop(bbox.min_col, bbox.min_row, bbox.width(), bbox.height())?;
        let masked = apply_mask(&crop, &region.pixel_mask)?;

        let max_intensity = masked.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let total_intensity: f64 = masked.iter().sum();
        let nonzero = masked.count_where(|&v| v != 0.0);
        let mean_intensity = if nonzero == 0 {
            0.0
        } else {
            total_intensity / nonzero as f64
        };

        let record = PlaqueRecord::new(
            region.pixel_mask.clone(),
            Some(region.centroid),
            Some(bbox),
            self.estimator.as_ref(),
        )?;
        let convex = convex_hull_image(&region.pixel_mask);

        let peaks = if self.params.fine_plaque_detection_flag {
            Some(self.counter.count_peaks(
                &crop,
                &region.pixel_mask,
                PixelCoord::new(bbox.min_row, bbox.min_col),
            )?)
        } else {
            None
        };

        let (nuclei_in_plaque, infected_nuclei) =
            match (nuclei_mask, self.params.mean_cell_area()) {
                (Some(nuclei), Some(cell_area)) => {
                    ensure_same_size(image, nuclei)?;
                    let nuclei =
                        nuclei.crop(bbox.min_col, bbox.min_row, bbox.width(), bbox.height())?;
                    (
                        Some(self.overlap_area(&convex, &nuclei)? / cell_area),
                        Some(self.overlap_area(&region.pixel_mask, &nuclei)? / cell_area),
                    )
                }
                _ => (None, None),
            };

        Ok(PlaqueReadout {
            label: region.label,
            area: record.measure().1,
            perimeter: record.perimeter(),
            centroid: region.centroid,
            bbox,
            axes: MomentAxes::from_coords(&region.coords),
            eccentricity: record.eccentricity(),
            roundness: record.roundness(),
            convex_area: convex.count_where(|&v| v),
            max_intensity,
            total_intensity,
            mean_intensity,
            peaks,
            nuclei_in_plaque,
            infected_nuclei,
        })
    }

    /// Reads every region, in order.
    pub fn read_all(
        &self,
        image: &IntensityImage,
        regions: &[Region],
        nuclei_mask: Option<&BinaryMask>,
    ) -> Result<Vec<PlaqueReadout>> {
        let readouts: Vec<PlaqueReadout> = regions
            .par_iter()
            .map(|region| self.read(image, region, nuclei_mask))
            .collect::<Result<_>>()?;
        tracing::debug!("Read out {} plaques", readouts.len());
        Ok(readouts)
    }
}
