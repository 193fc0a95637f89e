//! Whole-well readouts for paired virus and nuclei channels.

use serde::{Deserialize, Serialize};

use crate::config::{Connectivity, VirusDetectionParameters};
use crate::error::Result;
use crate::image::{ensure_non_empty, ensure_same_size, BinaryMask, IntensityImage};
use crate::labeling::LabelMap;
use crate::measure::median;
use crate::readout::{PlaqueReader, PlaqueReadout};
use crate::region::{regions_from_labels, Region};
use crate::segment::VirusPlaqueSegmenter;

/// Intensity statistics over every pixel of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelIntensity {
    pub max: f64,
    pub total: f64,
    /// 0 when the channel has no non-zero pixel.
    pub mean: f64,
    /// 0 when the channel has no non-zero pixel.
    pub median: f64,
}

impl ChannelIntensity {
    pub fn of(image: &IntensityImage) -> Self {
        let max = image.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let total: f64 = image.iter().sum();
        if image.iter().all(|&v| v == 0.0) {
            return Self {
                max,
                total,
                mean: 0.0,
                median: 0.0,
            };
        }
        Self {
            max,
            total,
            mean: total / image.len() as f64,
            median: median(image.pixels()),
        }
    }
}

/// Readout of one well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellReadout {
    /// Nuclei mask area in cells, `None` without both cell-area bounds.
    pub nuclei_count: Option<u64>,
    /// Peaks found by segmenting the virus channel, 0 when fine detection
    /// is off.
    pub plaque_count: usize,
    /// Area of the accepted plaques in cells, `None` without both
    /// cell-area bounds.
    pub infected_nuclei_count: Option<u64>,
    /// Set pixels of the plaque mask.
    pub lesion_area: usize,
    pub plaque_intensity: ChannelIntensity,
    pub nuclei_intensity: ChannelIntensity,
    /// One readout per accepted plaque region, in label order.
    pub plaques: Vec<PlaqueReadout>,
}

/// Reads whole wells: counts, lesion area, channel intensities and the
/// per-plaque readouts.
#[derive(Debug)]
pub struct WellReader {
    segmenter: VirusPlaqueSegmenter,
    reader: PlaqueReader,
}

impl WellReader {
    pub fn new(params: VirusDetectionParameters) -> Result<Self> {
        Ok(Self {
            segmenter: VirusPlaqueSegmenter::new(params.clone())?,
            reader: PlaqueReader::new(params)?,
        })
    }

    pub fn params(&self) -> &VirusDetectionParameters {
        self.reader.params()
    }

    /// 8-connected components of `plaque_mask` whose estimated area passes
    /// the plaque area bounds, paired with that area.
    pub fn plaque_regions(&self, plaque_mask: &BinaryMask) -> Vec<(Region, f64)> {
        let labels = LabelMap::from_mask(plaque_mask, Connectivity::Eight);
        regions_from_labels(&labels)
            .into_iter()
            .filter_map(|region| {
                let area = self.reader.estimator().area(&region.pixel_mask);
                self.params()
                    .accepts_plaque_area(area)
                    .then_some((region, area))
            })
            .collect()
    }

    /// Reads a well. All four grids must share one size; `plaque_mask` is
    /// usually [`crate::Segmentation::mask`] of `plaque_image`.
    pub fn read(
        &self,
        plaque_image: &IntensityImage,
        plaque_mask: &BinaryMask,
        nuclei_image: &IntensityImage,
        nuclei_mask: &BinaryMask,
    ) -> Result<WellReadout> {
        ensure_non_empty("plaque image", plaque_image)?;
        ensure_same_size(plaque_image, plaque_mask)?;
        ensure_same_size(plaque_image, nuclei_image)?;
        ensure_same_size(plaque_image, nuclei_mask)?;

        let cell_area = self.params().mean_cell_area();
        let in_cells = |area: f64| cell_area.map(|cell| (area / cell).round_ties_even() as u64);

        let plaque_count = self
            .segmenter
            .segment(plaque_image)?
            .peaks
            .map_or(0, |peaks| peaks.len());

        let (regions, areas): (Vec<Region>, Vec<f64>) =
            self.plaque_regions(plaque_mask).into_iter().unzip();
        let plaques = self
            .reader
            .read_all(plaque_image, &regions, Some(nuclei_mask))?;

        let readout = WellReadout {
            nuclei_count: in_cells(nuclei_mask.count_where(|&v| v) as f64),
            plaque_count,
            infected_nuclei_count: in_cells(areas.iter().sum()),
            lesion_area: plaque_mask.count_where(|&v| v),
            plaque_intensity: ChannelIntensity::of(plaque_image),
            nuclei_intensity: ChannelIntensity::of(nuclei_image),
            plaques,
        };
        tracing::info!(
            plaques = readout.plaque_count,
            regions = readout.plaques.len(),
            lesion_area = readout.lesion_area,
            "Read well"
        );
        Ok(readout)
    }
}
