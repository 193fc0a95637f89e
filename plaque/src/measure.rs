//! Plaque extraction and aggregate statistics for binary plaque masks.

use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::MeasurementConfig;
use crate::error::Result;
use crate::geometry::{estimator_for, GeometryEstimator};
use crate::image::BinaryMask;
use crate::plaque::PlaqueRecord;
use crate::region::{Region, RegionExtractor};

/// Mean of `points`, `None` when empty.
pub fn centroid(points: &[DVec2]) -> Option<DVec2> {
    if points.is_empty() {
        return None;
    }
    Some(points.iter().copied().sum::<DVec2>() / points.len() as f64)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Aggregate over a list of plaques. Statistics over an empty list are NaN
/// and the centroid is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSummary {
    pub count: usize,
    pub mean_area: f64,
    pub median_area: f64,
    /// Mean of the per-plaque bbox centres as `(x, y)`.
    pub centroid: Option<DVec2>,
    pub mean_eccentricity: f64,
    pub mean_roundness: f64,
}

/// Finds and measures plaques in a binary mask.
#[derive(Debug)]
pub struct PlaqueMeasurementEngine {
    config: MeasurementConfig,
    estimator: Box<dyn GeometryEstimator>,
}

impl PlaqueMeasurementEngine {
    pub fn new(config: MeasurementConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            estimator: estimator_for(config.geometry),
            config,
        })
    }

    /// Uses a caller-supplied estimator instead of the one named by
    /// `config.geometry`.
    pub fn with_estimator(
        config: MeasurementConfig,
        estimator: Box<dyn GeometryEstimator>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, estimator })
    }

    pub fn config(&self) -> &MeasurementConfig {
        &self.config
    }

    pub fn estimator(&self) -> &dyn GeometryEstimator {
        self.estimator.as_ref()
    }

    /// Interior regions of `mask` whose estimated area lies in
    /// `min_area..=max_area`, in label order.
    pub fn get_plaques(&self, mask: &BinaryMask) -> Result<Vec<PlaqueRecord>> {
        let regions = RegionExtractor::new(self.config.connectivity).extract(mask)?;
        let min_area = self.config.min_area as f64;
        let max_area = self.config.max_area as f64;

        let records: Vec<Option<PlaqueRecord>> = regions
            .into_par_iter()
            .map(|region| self.measure_region(region, min_area, max_area))
            .collect::<Result<_>>()?;

        let total = records.len();
        let plaques: Vec<PlaqueRecord> = records.into_iter().flatten().collect();
        tracing::debug!(
            "Kept {} of {} regions with area in {}..={}",
            plaques.len(),
            total,
            self.config.min_area,
            self.config.max_area
        );
        Ok(plaques)
    }

    fn measure_region(
        &self,
        region: Region,
        min_area: f64,
        max_area: f64,
    ) -> Result<Option<PlaqueRecord>> {
        let area = self.estimator.area(&region.pixel_mask);
        if area < min_area || area > max_area {
            return Ok(None);
        }
        PlaqueRecord::new(
            region.pixel_mask,
            Some(region.centroid),
            Some(region.bbox),
            self.estimator.as_ref(),
        )
        .map(Some)
    }

    /// Aggregate statistics over `plaques`.
    pub fn get_measure(&self, plaques: &[PlaqueRecord]) -> MeasurementSummary {
        summarize(plaques)
    }
}

/// Mean/median area, mean eccentricity and roundness, and the centroid of
/// the bbox centres. Plaques without a bbox do not contribute to the centroid.
pub fn summarize(plaques: &[PlaqueRecord]) -> MeasurementSummary {
    let measured: Vec<[f64; 3]> = plaques
        .par_iter()
        .map(|plaque| {
            let (_, area) = plaque.measure();
            [area, plaque.eccentricity(), plaque.roundness()]
        })
        .collect();
    let column = |i: usize| -> Vec<f64> { measured.iter().map(|m| m[i]).collect() };
    let (areas, eccentricities, roundness) = (column(0), column(1), column(2));

    let centres: Vec<DVec2> = plaques
        .iter()
        .filter_map(|p| p.bbox().map(|b| b.center()))
        .collect();

    let summary = MeasurementSummary {
        count: plaques.len(),
        mean_area: mean(&areas),
        median_area: median(&areas),
        centroid: centroid(&centres),
        mean_eccentricity: mean(&eccentricities),
        mean_roundness: mean(&roundness),
    };
    tracing::info!(
        "Measured {} plaques: mean area {:.2}, median area {:.2}",
        summary.count,
        summary.mean_area,
        summary.median_area
    );
    summary
}

/// Shorthand for `PlaqueMeasurementEngine::new(MeasurementConfig::new(..)).get_plaques(mask)`.
pub fn get_plaques(
    mask: &BinaryMask,
    min_area: u32,
    max_area: u32,
    use_picks: bool,
) -> Result<Vec<PlaqueRecord>> {
    PlaqueMeasurementEngine::new(MeasurementConfig::new(min_area, max_area, use_picks))?
        .get_plaques(mask)
}

#[cfg(test)]
mod tests;
