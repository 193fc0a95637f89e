//! Discrete area and perimeter estimators.
//!
//! [`ExactGeometry`] counts pixels and measures the traced contour.
//! [`PicksGeometry`] applies boundary-pattern weights and Pick's theorem,
//! which behaves better on small pixelated blobs.

pub mod contour;
pub mod ellipse;
pub mod hull;
pub mod picks;


use std::fmt::Debug;

use crate::config::{Connectivity, GeometryMode};
use crate::image::BinaryMask;

pub use contour::{closed_length, contour_perimeter, find_contours};
pub use ellipse::{ellipse_eccentricity, fit_ellipse, FittedEllipse};
pub use hull::{convex_area, convex_hull_image};
pub use picks::{picks_area, picks_perimeter};

/// Area and perimeter of a single-object mask.
pub trait GeometryEstimator: Debug + Send + Sync {
    fn mode(&self) -> GeometryMode;

    fn area(&self, mask: &BinaryMask) -> f64;

    fn perimeter(&self, mask: &BinaryMask) -> f64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactGeometry;

impl GeometryEstimator for ExactGeometry {
    fn mode(&self) -> GeometryMode {
        GeometryMode::Exact
    }

    fn area(&self, mask: &BinaryMask) -> f64 {
        mask.count_where(|&v| v) as f64
    }

    fn perimeter(&self, mask: &BinaryMask) -> f64 {
        contour_perimeter(mask)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PicksGeometry {
    pub connectivity: Connectivity,
}

impl PicksGeometry {
    pub fn new(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }
}

impl GeometryEstimator for PicksGeometry {
    fn mode(&self) -> GeometryMode {
        GeometryMode::Picks
    }

    fn area(&self, mask: &BinaryMask) -> f64 {
        picks_area(mask, self.connectivity)
    }

    fn perimeter(&self, mask: &BinaryMask) -> f64 {
        picks_perimeter(mask, self.connectivity)
    }
}

/// Estimator for `mode`. Pick's mode uses 4-connectivity.
pub fn estimator_for(mode: GeometryMode) -> Box<dyn GeometryEstimator> {
    match mode {
        GeometryMode::Exact => Box::new(ExactGeometry),
        GeometryMode::Picks => Box::new(PicksGeometry::new(Connectivity::Four)),
    }
}

/// Eccentricity of the first contour with enough points for an ellipse fit,
/// 0 when there is none.
pub fn mask_eccentricity(mask: &BinaryMask) -> f64 {
    find_contours(mask)
        .iter()
        .find(|contour| contour.len() >= ellipse::MIN_FIT_POINTS)
        .map_or(0.0, |contour| {
            fit_ellipse(contour).map_or(0.0, |e| ellipse_eccentricity(&e))
        })
}
