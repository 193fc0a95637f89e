//! Plaque - detection and morphometry of virological plaques.
//!
//! This library turns plate images into measured plaque objects:
//! - Connected-component extraction with border clearing
//! - Exact and Pick's-theorem area/perimeter estimators
//! - Ellipse-fit eccentricity and isoperimetric roundness
//! - Fluorescence segmentation with gap bridging and per-region peak counting
//! - Per-plaque and whole-well readouts of the virus and nuclei channels
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use plaque::{MeasurementConfig, PlaqueMeasurementEngine};
//!
//! let engine = PlaqueMeasurementEngine::new(MeasurementConfig::new(100, 2000, true))?;
//! let plaques = engine.get_plaques(&mask)?;
//! let summary = engine.get_measure(&plaques);
//!
//! println!("{} plaques, median area {:.1}", summary.count, summary.median_area);
//! ```

pub mod background;
pub mod config;
pub(crate) mod convolution;
pub(crate) mod distance;
pub mod error;
pub mod geometry;
pub mod gray;
pub mod image;
pub mod labeling;
pub mod measure;
pub(crate) mod morphology;
pub mod peaks;
pub mod plaque;
pub mod readout;
pub mod region;
pub mod segment;
pub mod validate;
pub mod well;

#[cfg(test)]
mod test_utils;

// ============================================================================
// Configuration and errors
// ============================================================================

pub use config::{
    Connectivity, FixedThresholdConfig, GeometryMode, MeasurementConfig, VirusDetectionParameters,
};
pub use error::{Error, Result};
pub use validate::check_numbers;

// ============================================================================
// Images and regions
// ============================================================================

pub use background::remove_background;
pub use common::Buffer2;
pub use gray::GrayPlaqueImage;
pub use image::{
    apply_mask, binarize, fixed_threshold, remove_artifacts, threshold, BinaryMask, IntensityImage,
};
pub use labeling::LabelMap;
pub use region::{BBox, Region, RegionExtractor};

// ============================================================================
// Measurement
// ============================================================================

pub use geometry::{
    convex_hull_image, estimator_for, ExactGeometry, GeometryEstimator, PicksGeometry,
};
pub use measure::{centroid, get_plaques, summarize, MeasurementSummary, PlaqueMeasurementEngine};
pub use plaque::{PlaqueMetrics, PlaqueRecord};

// ============================================================================
// Fluorescence
// ============================================================================

pub use peaks::{peak_local_max, FluorescencePeakCounter, PixelCoord};
pub use readout::{MomentAxes, PlaqueReader, PlaqueReadout};
pub use segment::{Segmentation, SegmentedRegion, VirusPlaqueSegmenter};
pub use well::{ChannelIntensity, WellReader, WellReadout};
