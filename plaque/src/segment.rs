//! Fluorescence plaque segmentation.
//!
//! Thresholding alone splits one plaque into fragments wherever the signal
//! dips, and merges neighbouring plaques wherever they touch. The segmenter
//! bridges short gaps before labeling so fragments share an id, keeps the
//! thresholded shape, and then counts intensity peaks per region to recover
//! plaques that have coalesced.

use common::Buffer2;
use rayon::prelude::*;

use crate::config::{Connectivity, VirusDetectionParameters};
use crate::distance::bridge_gaps;
use crate::error::Result;
use crate::geometry::{estimator_for, GeometryEstimator};
use crate::image::{ensure_non_empty, threshold, BinaryMask, IntensityImage};
use crate::labeling::LabelMap;
use crate::peaks::{FluorescencePeakCounter, PixelCoord};
use crate::plaque::PlaqueRecord;
use crate::region::{regions_from_labels, Region};

/// One accepted region and the peaks found inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedRegion {
    pub region: Region,
    /// Area under the configured estimator.
    pub area: f64,
    /// Image coordinates; empty when fine detection is off.
    pub peaks: Vec<PixelCoord>,
}

impl SegmentedRegion {
    pub fn peak_count(&self) -> usize {
        self.peaks.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Pixels of every accepted region.
    pub mask: BinaryMask,
    /// All peaks in region order, `None` when fine detection is off.
    pub peaks: Option<Vec<PixelCoord>>,
    pub regions: Vec<SegmentedRegion>,
}

impl Segmentation {
    /// Converts accepted regions into plaque records measured by `estimator`.
    pub fn plaque_records(&self, estimator: &dyn GeometryEstimator) -> Result<Vec<PlaqueRecord>> {
        self.regions
            .iter()
            .map(|r| {
                PlaqueRecord::new(
                    r.region.pixel_mask.clone(),
                    Some(r.region.centroid),
                    Some(r.region.bbox),
                    estimator,
                )
            })
            .collect()
    }

    pub fn plaque_count(&self) -> usize {
        self.regions.len()
    }
}

#[derive(Debug)]
pub struct VirusPlaqueSegmenter {
    params: VirusDetectionParameters,
    estimator: Box<dyn GeometryEstimator>,
    counter: FluorescencePeakCounter,
}

impl VirusPlaqueSegmenter {
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

    pub fn segment(&self, image: &IntensityImage) -> Result<Segmentation> {
        ensure_non_empty("intensity image", image)?;

        let above = threshold(image, self.params.virus_threshold);
        let bridged = bridge_gaps(&above, self.params.plaque_connectivity as f64);
        let mut labels = LabelMap::from_mask(&bridged, Connectivity::Eight);
        labels.retain_where(&above);

        let candidates = regions_from_labels(&labels);
        let candidate_count = candidates.len();
        let accepted: Vec<(Region, f64)> = candidates
            .into_iter()
            .filter_map(|region| {
                let area = self.estimator.area(&region.pixel_mask);
                self.params.accepts_plaque_area(area).then_some((region, area))
            })
            .collect();

        tracing::debug!(
            "Kept {} of {} regions above threshold {}",
            accepted.len(),
            candidate_count,
            self.params.virus_threshold
        );

        let mut mask = Buffer2::new_filled(image.width(), image.height(), false);
        for (region, _) in &accepted {
            for &(row, col) in &region.coords {
                mask[(col, row)] = true;
            }
        }

        if !self.params.fine_plaque_detection_flag {
            let regions = accepted
                .into_iter()
                .map(|(region, area)| SegmentedRegion {
                    region,
                    area,
                    peaks: Vec::new(),
                })
                .collect();
            return Ok(Segmentation {
                mask,
                peaks: None,
                regions,
            });
        }

        let regions: Vec<SegmentedRegion> = accepted
            .into_par_iter()
            .map(|(region, area)| {
                let peaks = self.counter.count_region_peaks(image, &region)?;
                Ok(SegmentedRegion {
                    region,
                    area,
                    peaks,
                })
            })
            .collect::<Result<_>>()?;

        let peaks: Vec<PixelCoord> = regions
            .iter()
            .flat_map(|r| r.peaks.iter().copied())
            .collect();
        tracing::info!(
            "Segmented {} regions with {} peaks",
            regions.len(),
            peaks.len()
        );

        Ok(Segmentation {
            mask,
            peaks: Some(peaks),
            regions,
        })
    }
}
