//! Configuration types for plaque detection.
//!
//! [`VirusDetectionParameters`] drives the fluorescence path and is usually
//! loaded once per analysis run from a YAML or JSON file.
//! [`MeasurementConfig`] drives the crystal-violet (binary mask) path.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::validate::check_numbers;

// ============================================================================
// Enums
// ============================================================================

/// Pixel connectivity for labeling and morphology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Horizontal and vertical neighbours only.
    #[default]
    Four,
    /// Horizontal, vertical and diagonal neighbours.
    Eight,
}

impl Connectivity {
    /// Parses the numeric neighbourhood size (4 or 8).
    pub fn from_neighbourhood(neighbourhood: u32) -> Result<Self> {
        match neighbourhood {
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(Error::InvalidConnectivity(other)),
        }
    }

    pub fn neighbourhood(self) -> u32 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

/// Which discrete-geometry estimator measures area and perimeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryMode {
    /// Pixel count and traced contour length.
    #[default]
    Exact,
    /// Boundary-weighted Pick's-theorem estimator for low-resolution masks.
    Picks,
}

impl GeometryMode {
    pub fn from_use_picks(use_picks: bool) -> Self {
        if use_picks {
            Self::Picks
        } else {
            Self::Exact
        }
    }

    pub fn uses_picks(self) -> bool {
        self == Self::Picks
    }
}

// ============================================================================
// Fluorescence parameters
// ============================================================================

fn default_fine_detection() -> bool {
    true
}

/// Parameters for fluorescence plaque segmentation and peak counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirusDetectionParameters {
    /// Intensity cutoff; pixels strictly above it are plaque candidates.
    pub virus_threshold: f64,
    /// Maximum gap in pixels bridged when merging fragments of one plaque.
    pub plaque_connectivity: u32,
    /// Regions must be strictly larger than this area to be kept.
    pub min_plaque_area: u32,
    /// Optional inclusive upper bound on region area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_plaque_area: Option<u32>,
    #[serde(default)]
    pub use_picks: bool,
    /// Enables per-region peak counting.
    #[serde(default = "default_fine_detection")]
    pub fine_plaque_detection_flag: bool,
    pub plaque_gaussian_filter_sigma: f64,
    /// Kernel half-width in pixels; the Gaussian is truncated at `size / sigma` sigmas.
    pub plaque_gaussian_filter_size: f64,
    /// Minimum separation between accepted peaks.
    pub peak_region_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cell_area: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cell_area: Option<u32>,
}

/// Keys that must hold numbers when present in a loosely-typed parameter map.
const NUMERIC_KEYS: [&str; 9] = [
    "virus_threshold",
    "plaque_connectivity",
    "min_plaque_area",
    "max_plaque_area",
    "plaque_gaussian_filter_sigma",
    "plaque_gaussian_filter_size",
    "peak_region_size",
    "min_cell_area",
    "max_cell_area",
];

impl VirusDetectionParameters {
    /// Number of standard deviations at which the smoothing kernel is cut.
    /// 0 when smoothing is disabled.
    pub fn truncate(&self) -> f64 {
        if self.plaque_gaussian_filter_sigma == 0.0 {
            return 0.0;
        }
        self.plaque_gaussian_filter_size / self.plaque_gaussian_filter_sigma
    }

    pub fn geometry(&self) -> GeometryMode {
        GeometryMode::from_use_picks(self.use_picks)
    }

    /// Strictly above `min_plaque_area` and, when set, at most `max_plaque_area`.
    pub fn accepts_plaque_area(&self, area: f64) -> bool {
        area > self.min_plaque_area as f64
            && self.max_plaque_area.map_or(true, |max| area <= max as f64)
    }

    /// Mean of the two cell-area bounds, `None` unless both are set and
    /// their sum is positive.
    pub fn mean_cell_area(&self) -> Option<f64> {
        match (self.min_cell_area, self.max_cell_area) {
            (Some(min), Some(max)) => {
                let mean = (min as f64 + max as f64) / 2.0;
                (mean > 0.0).then_some(mean)
            }
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.virus_threshold.is_finite() || self.virus_threshold < 0.0 {
            return Err(Error::InvalidParameter {
                name: "virus_threshold",
                reason: format!("must be finite and non-negative, got {}", self.virus_threshold),
            });
        }
        if !self.plaque_gaussian_filter_sigma.is_finite() || self.plaque_gaussian_filter_sigma < 0.0
        {
            return Err(Error::InvalidParameter {
                name: "plaque_gaussian_filter_sigma",
                reason: format!(
                    "must be finite and non-negative, got {}",
                    self.plaque_gaussian_filter_sigma
                ),
            });
        }
        if !self.plaque_gaussian_filter_size.is_finite() || self.plaque_gaussian_filter_size < 0.0 {
            return Err(Error::InvalidParameter {
                name: "plaque_gaussian_filter_size",
                reason: format!(
                    "must be non-negative, got {}",
                    self.plaque_gaussian_filter_size
                ),
            });
        }
        if let Some(max) = self.max_plaque_area {
            if max < self.min_plaque_area {
                return Err(Error::InvalidParameter {
                    name: "max_plaque_area",
                    reason: format!("{} is below min_plaque_area {}", max, self.min_plaque_area),
                });
            }
        }
        if let (Some(min), Some(max)) = (self.min_cell_area, self.max_cell_area) {
            if max < min {
                return Err(Error::InvalidParameter {
                    name: "max_cell_area",
                    reason: format!("{} is below min_cell_area {}", max, min),
                });
            }
        }
        Ok(())
    }

    /// Builds parameters from a loosely-typed JSON object.
    ///
    /// Every numeric key present in the map is checked before decoding so that
    /// a string where a number belongs is reported by name.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| Error::InvalidParameter {
            name: "parameters",
            reason: "expected a key/value map".to_string(),
        })?;

        for key in NUMERIC_KEYS {
            if let Some(v) = map.get(key) {
                if !v.is_null() && !check_numbers(std::slice::from_ref(v)) {
                    return Err(Error::NonNumericParameter {
                        key: key.to_string(),
                    });
                }
            }
        }

        let params: Self = serde_json::from_value(value.clone())?;
        params.validate()?;
        Ok(params)
    }

    /// Loads parameters from a `.yaml`/`.yml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let params: Self =
            common::serde::load_file(path).map_err(|source| Error::ConfigLoad {
                path: path.to_path_buf(),
                source,
            })?;
        params.validate()?;
        tracing::debug!("Loaded virus detection parameters from {}", path.display());
        Ok(params)
    }
}

// ============================================================================
// Binary mask measurement
// ============================================================================

/// Configuration for measuring plaques in a binary mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Inclusive lower area bound in pixels.
    pub min_area: u32,
    /// Inclusive upper area bound in pixels.
    pub max_area: u32,
    pub geometry: GeometryMode,
    /// Connectivity used when labeling plaques.
    pub connectivity: Connectivity,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            min_area: 100,
            max_area: 200,
            geometry: GeometryMode::Exact,
            connectivity: Connectivity::Eight,
        }
    }
}

impl MeasurementConfig {
    pub fn new(min_area: u32, max_area: u32, use_picks: bool) -> Self {
        Self {
            min_area,
            max_area,
            geometry: GeometryMode::from_use_picks(use_picks),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_area > self.max_area {
            return Err(Error::InvalidParameter {
                name: "min_area",
                reason: format!("{} exceeds max_area {}", self.min_area, self.max_area),
            });
        }
        Ok(())
    }
}

/// Fixed-threshold binarization of a smoothed grayscale image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedThresholdConfig {
    pub threshold: f64,
    /// Gaussian blur sigma in pixels applied before thresholding.
    pub sigma: f64,
}

impl FixedThresholdConfig {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            sigma: 5.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "threshold",
                reason: format!("must be finite, got {}", self.threshold),
            });
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(Error::InvalidParameter {
                name: "sigma",
                reason: format!("must be finite and non-negative, got {}", self.sigma),
            });
        }
        Ok(())
    }
}
