//! Algebraic least-squares ellipse fit for contour points.
//!
//! Points are centred and scaled, a general conic is fitted to locate the
//! ellipse centre, and the quadratic terms are re-fitted about that centre.
//! Every linear solve goes through an SVD.

use glam::{DVec2, IVec2};
use nalgebra::{DMatrix, DVector};

/// Minimum number of points the fit accepts.
pub const MIN_FIT_POINTS: usize = 5;

/// Smallest semi-axis used for eccentricity, in pixels.
const MIN_SEMI_AXIS: f64 = 0.1;

const MIN_EPS: f64 = 1e-8;
const SVD_EPS: f64 = 1e-12;

/// Fitted ellipse. `size` holds full axis lengths with `size.x <= size.y`;
/// `angle` is the rotation in degrees, in `(-180, 360]` rather than a
/// canonical `[0, 180)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedEllipse {
    pub center: DVec2,
    pub size: DVec2,
    pub angle: f64,
}

fn solve_least_squares(a: DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    a.svd(true, true).solve(b, SVD_EPS).ok()
}

/// Fits an ellipse through `points`. Returns `None` for fewer than
/// [`MIN_FIT_POINTS`] points or when a solve fails.
pub fn fit_ellipse(points: &[IVec2]) -> Option<FittedEllipse> {
    let n = points.len();
    if n < MIN_FIT_POINTS {
        return None;
    }

    let pts: Vec<DVec2> = points.iter().map(|p| p.as_dvec2()).collect();
    let c = pts.iter().copied().sum::<DVec2>() / n as f64;
    let spread: f64 = pts.iter().map(|&p| (p - c).abs().element_sum()).sum();
    let scale = 100.0 / spread.max(f32::EPSILON as f64);
    let scaled: Vec<DVec2> = pts.iter().map(|&p| (p - c) * scale).collect();

    // General conic with the quadratic signs flipped:
    // -A x² - B y² - C xy + D x + E y = 10000
    let design = DMatrix::from_fn(n, 5, |i, j| {
        let p = scaled[i];
        match j {
            0 => -p.x * p.x,
            1 => -p.y * p.y,
            2 => -p.x * p.y,
            3 => p.x,
            _ => p.y,
        }
    });
    let gfp = solve_least_squares(design, &DVector::from_element(n, 10000.0))?;

    // Centre where both partial derivatives vanish.
    let centre_system = DMatrix::from_row_slice(2, 2, &[2.0 * gfp[0], gfp[2], gfp[2], 2.0 * gfp[1]]);
    let centre = solve_least_squares(centre_system, &DVector::from_row_slice(&[gfp[3], gfp[4]]))?;
    let rc = DVec2::new(centre[0], centre[1]);

    let design = DMatrix::from_fn(n, 3, |i, j| {
        let d = scaled[i] - rc;
        match j {
            0 => d.x * d.x,
            1 => d.y * d.y,
            _ => d.x * d.y,
        }
    });
    let q = solve_least_squares(design, &DVector::from_element(n, 1.0))?;

    let theta = -0.5 * q[2].atan2(q[1] - q[0]);
    let t = if q[2].abs() > MIN_EPS {
        q[2] / (-2.0 * theta).sin()
    } else {
        q[1] - q[0]
    };
    let semi_axis = |v: f64| {
        let v = v.abs();
        if v > MIN_EPS {
            (2.0 / v).sqrt()
        } else {
            v
        }
    };
    let rx = semi_axis(q[0] + q[1] - t);
    let ry = semi_axis(q[0] + q[1] + t);

    let mut size = DVec2::new(rx * 2.0 / scale, ry * 2.0 / scale);
    let mut angle = theta.to_degrees();
    if size.x > size.y {
        size = DVec2::new(size.y, size.x);
        angle += 90.0;
    }
    if angle < -180.0 {
        angle += 360.0;
    }
    if angle > 360.0 {
        angle -= 360.0;
    }

    Some(FittedEllipse {
        center: rc / scale + c,
        size,
        angle,
    })
}

/// Eccentricity of the fitted ellipse, with both semi-axes clamped to at
/// least 0.1 px, so the result stays in `[0, 1)`.
///
/// A fit with exactly zero rotation reports 0. Only `0.0` itself counts:
/// [`fit_ellipse`] leaves angles in `(-180, 360]`, so an axis-aligned fit
/// reported as 90 or 180 degrees goes through the axis formula.
pub fn ellipse_eccentricity(ellipse: &FittedEllipse) -> f64 {
    if ellipse.angle == 0.0 {
        return 0.0;
    }
    let mut minor = ellipse.size.x / 2.0;
    let mut major = ellipse.size.y / 2.0;
    if minor > major {
        std::mem::swap(&mut minor, &mut major);
    }
    let minor = minor.max(MIN_SEMI_AXIS);
    let major = major.max(MIN_SEMI_AXIS);
    (1.0 - (minor * minor) / (major * major)).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::contour::find_contours;
    use crate::test_utils::{disk_mask, ellipse_mask};

    fn sample_ellipse(center: DVec2, a: f64, b: f64, rot: f64, n: usize) -> Vec<DVec2> {
        (0..n)
            .map(|i| {
                let t = i as f64 / n as f64 * std::f64::consts::TAU;
                let (s, c) = rot.sin_cos();
                let local = DVec2::new(a * t.cos(), b * t.sin());
                center + DVec2::new(c * local.x - s * local.y, s * local.x + c * local.y)
            })
            .collect()
    }

    #[test]
    fn too_few_points() {
        let pts = [IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(1, 1), IVec2::new(0, 1)];
        assert!(fit_ellipse(&pts).is_none());
    }

    #[test]
    fn recovers_large_sampled_ellipse() {
        // Integer rounding is negligible at this scale.
        let pts: Vec<IVec2> = sample_ellipse(DVec2::new(500.0, 400.0), 300.0, 150.0, 0.5, 200)
            .into_iter()
            .map(|p| p.round().as_ivec2())
            .collect();
        let ellipse = fit_ellipse(&pts).unwrap();
        assert!((ellipse.center - DVec2::new(500.0, 400.0)).length() < 1.0);
        assert!((ellipse.size.x - 300.0).abs() < 2.0, "{:?}", ellipse);
        assert!((ellipse.size.y - 600.0).abs() < 2.0, "{:?}", ellipse);
        let ecc = ellipse_eccentricity(&ellipse);
        assert!((ecc - (1.0f64 - 0.25).sqrt()).abs() < 0.01);
    }

    #[test]
    fn disk_contour_is_circular() {
        let mask = disk_mask(31, 31, 15.0, 15.0, 12.0);
        let contour = &find_contours(&mask)[0];
        let ellipse = fit_ellipse(contour).unwrap();
        assert!((ellipse.center - DVec2::new(15.0, 15.0)).length() < 1e-6);
        assert!(ellipse_eccentricity(&ellipse) < 1e-3);
    }

    #[test]
    fn elongated_mask_is_eccentric() {
        let mask = ellipse_mask(41, 31, 20.0, 15.0, 12.0, 6.0);
        let contour = &find_contours(&mask)[0];
        let ecc = ellipse_eccentricity(&fit_ellipse(contour).unwrap());
        assert!((ecc - 0.866).abs() < 0.05, "{ecc}");
    }

    #[test]
    fn zero_angle_reports_zero() {
        let ellipse = FittedEllipse {
            center: DVec2::ZERO,
            size: DVec2::new(2.0, 10.0),
            angle: 0.0,
        };
        assert_eq!(ellipse_eccentricity(&ellipse), 0.0);
    }

    #[test]
    fn degenerate_axes_are_clamped() {
        let ellipse = FittedEllipse {
            center: DVec2::ZERO,
            size: DVec2::new(0.0, 0.0),
            angle: 45.0,
        };
        assert_eq!(ellipse_eccentricity(&ellipse), 0.0);

        let ellipse = FittedEllipse {
            center: DVec2::ZERO,
            size: DVec2::new(0.0, 4.0),
            angle: 45.0,
        };
        let ecc = ellipse_eccentricity(&ellipse);
        assert!((ecc - (1.0f64 - 0.01 / 4.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn near_zero_minor_axis_is_clamped() {
        let ellipse = FittedEllipse {
            center: DVec2::new(1.0, 1.0),
            size: DVec2::new(4.44e-19, 2.0f64.sqrt()),
            angle: 45.0,
        };
        let ecc = ellipse_eccentricity(&ellipse);
        assert!(ecc < 1.0);
        assert!((ecc - (1.0f64 - 0.01 / 0.5).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn collinear_zigzag_stays_below_one() {
        let pts = [
            IVec2::new(0, 0),
            IVec2::new(1, 1),
            IVec2::new(0, 2),
            IVec2::new(1, 1),
            IVec2::new(2, 2),
        ];
        if let Some(ellipse) = fit_ellipse(&pts) {
            let ecc = ellipse_eccentricity(&ellipse);
            assert!((0.0..1.0).contains(&ecc), "{ellipse:?}: {ecc}");
        }
    }

    #[test]
    fn half_turn_angle_is_not_treated_as_zero() {
        let ellipse = FittedEllipse {
            center: DVec2::ZERO,
            size: DVec2::new(2.0, 4.0),
            angle: 180.0,
        };
        assert!((ellipse_eccentricity(&ellipse) - 0.75f64.sqrt()).abs() < 1e-12);
    }
}
