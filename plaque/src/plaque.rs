//! Measured plaque records.

use std::f64::consts::PI;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::config::GeometryMode;
use crate::error::Result;
use crate::geometry::{mask_eccentricity, GeometryEstimator};
use crate::image::{ensure_non_empty, BinaryMask};
use crate::region::BBox;
use crate::validate::ensure_finite;

/// One measured plaque. Area and perimeter are computed once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaqueRecord {
    mask: BinaryMask,
    centroid: Option<DVec2>,
    bbox: Option<BBox>,
    mode: GeometryMode,
    area: f64,
    perimeter: f64,
}

/// Serializable view of a [`PlaqueRecord`] for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaqueMetrics {
    pub area: f64,
    pub perimeter: f64,
    pub centroid: Option<[f64; 2]>,
    pub bbox: Option<[usize; 4]>,
    pub bbox_area: Option<usize>,
    pub eccentricity: f64,
    pub roundness: f64,
}

impl PlaqueRecord {
    /// Measures `mask` with `estimator`. `centroid` is `(x, y)`; both it and
    /// `bbox` are optional.
    pub fn new(
        mask: BinaryMask,
        centroid: Option<DVec2>,
        bbox: Option<BBox>,
        estimator: &dyn GeometryEstimator,
    ) -> Result<Self> {
        ensure_non_empty("plaque mask", &mask)?;
        if let Some(c) = centroid {
            ensure_finite("centroid", &[c.x, c.y])?;
        }

        let area = estimator.area(&mask);
        let perimeter = estimator.perimeter(&mask);

        Ok(Self {
            mask,
            centroid,
            bbox,
            mode: estimator.mode(),
            area,
            perimeter,
        })
    }

    pub fn mask(&self) -> &BinaryMask {
        &self.mask
    }

    pub fn centroid(&self) -> Option<DVec2> {
        self.centroid
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.bbox
    }

    pub fn mode(&self) -> GeometryMode {
        self.mode
    }

    /// Area from the estimator chosen at construction.
    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn perimeter(&self) -> f64 {
        self.perimeter
    }

    /// `(bbox_area, plaque_area)`. The bbox term is `None` without a bbox.
    /// In exact mode the plaque area is the number of set mask pixels.
    pub fn measure(&self) -> (Option<usize>, f64) {
        let bbox_area = self.bbox.map(|b| b.area());
        let plaque_area = match self.mode {
            GeometryMode::Picks => self.area,
            GeometryMode::Exact => self.mask.count_where(|&v| v) as f64,
        };
        (bbox_area, plaque_area)
    }

    /// Ellipse-fit eccentricity in `[0, 1)`.
    pub fn eccentricity(&self) -> f64 {
        mask_eccentricity(&self.mask)
    }

    /// `4π·area / perimeter²`, 0 when the perimeter is 0.
    ///
    /// Pick's mode uses the cached perimeter. Exact mode approximates the
    /// perimeter as `2π·r`, with `r` the distance from the bbox corner
    /// `(max_col, max_row)` to the bbox centre. Without a bbox the exact
    /// mode returns 0.
    pub fn roundness(&self) -> f64 {
        let (_, area) = self.measure();
        let perimeter = match self.mode {
            GeometryMode::Picks => self.perimeter,
            GeometryMode::Exact => match self.bbox {
                Some(bbox) => {
                    let corner = DVec2::new(bbox.max_col as f64, bbox.max_row as f64);
                    2.0 * PI * corner.distance(bbox.center())
                }
                None => 0.0,
            },
        };

        if perimeter == 0.0 {
            0.0
        } else {
            4.0 * PI * area / (perimeter * perimeter)
        }
    }

    pub fn metrics(&self) -> PlaqueMetrics {
        let (bbox_area, area) = self.measure();
        PlaqueMetrics {
            area,
            perimeter: self.perimeter,
            centroid: self.centroid.map(|c| c.to_array()),
            bbox: self.bbox.map(|b| b.as_array()),
            bbox_area,
            eccentricity: self.eccentricity(),
            roundness: self.roundness(),
        }
    }
}

#[cfg(test)]
mod tests {
    use common::Buffer2;

    use super::*;
    use crate::config::Connectivity;
    use crate::error::Error;
    use crate::geometry::{ExactGeometry, PicksGeometry};
    use crate::test_utils::{disk_mask, rect_mask};

    #[test]
    fn exact_record_caches_area_and_perimeter() {
        let mask = rect_mask(5, 3, 0, 0, 5, 3);
        let record = PlaqueRecord::new(mask, None, None, &ExactGeometry).unwrap();
        assert_eq!(record.area(), 15.0);
        assert_eq!(record.perimeter(), 12.0);
        assert_eq!(record.mode(), GeometryMode::Exact);
        assert_eq!(record.measure(), (None, 15.0));
    }

    #[test]
    fn measure_uses_bbox_extent() {
        let mask = rect_mask(4, 3, 0, 0, 4, 3);
        let bbox = BBox::new(10, 20, 13, 24);
        let record = PlaqueRecord::new(mask, None, Some(bbox), &ExactGeometry).unwrap();
        assert_eq!(record.measure(), (Some(12), 12.0));
    }

    #[test]
    fn picks_record_reports_picks_area() {
        let mask = rect_mask(7, 5, 1, 1, 6, 4);
        let record =
            PlaqueRecord::new(mask, None, None, &PicksGeometry::new(Connectivity::Four)).unwrap();
        assert_eq!(record.mode(), GeometryMode::Picks);
        assert!((record.measure().1 - 3.5).abs() < 1e-12);
    }

    #[test]
    fn empty_mask_is_rejected() {
        let mask: BinaryMask = Buffer2::new(0, 4, vec![]);
        assert!(matches!(
            PlaqueRecord::new(mask, None, None, &ExactGeometry),
            Err(Error::EmptyImage { .. })
        ));
    }

    #[test]
    fn non_finite_centroid_is_rejected() {
        let mask = rect_mask(2, 2, 0, 0, 2, 2);
        let result =
            PlaqueRecord::new(mask, Some(DVec2::new(f64::NAN, 1.0)), None, &ExactGeometry);
        assert!(matches!(result, Err(Error::NonNumeric { field: "centroid", .. })));
    }

    #[test]
    fn exact_roundness_uses_bbox_radius() {
        // 10x10 box: r = sqrt(50), perimeter = 2π·r.
        let mask = disk_mask(10, 10, 4.5, 4.5, 5.0);
        let area = mask.count_where(|&v| v) as f64;
        let record =
            PlaqueRecord::new(mask, None, Some(BBox::new(0, 0, 10, 10)), &ExactGeometry).unwrap();
        let perimeter = 2.0 * PI * 50f64.sqrt();
        let expected = 4.0 * PI * area / (perimeter * perimeter);
        assert!((record.roundness() - expected).abs() < 1e-12);
        assert!(record.roundness() > 0.0 && record.roundness() <= 1.0);
    }

    #[test]
    fn zero_perimeter_gives_zero_roundness() {
        let mask = rect_mask(1, 1, 0, 0, 1, 1);
        let degenerate = BBox::new(3, 3, 3, 3);
        let record = PlaqueRecord::new(mask.clone(), None, Some(degenerate), &ExactGeometry).unwrap();
        assert_eq!(record.roundness(), 0.0);

        let record = PlaqueRecord::new(mask, None, None, &ExactGeometry).unwrap();
        assert_eq!(record.roundness(), 0.0);
    }

    #[test]
    fn picks_roundness_of_disks_is_in_unit_range() {
        for r in [6.0, 10.0, 16.0] {
            let size = (2.0 * r) as usize + 5;
            let c = (size / 2) as f64;
            let record = PlaqueRecord::new(
                disk_mask(size, size, c, c, r),
                None,
                None,
                &PicksGeometry::default(),
            )
            .unwrap();
            let roundness = record.roundness();
            assert!(roundness > 0.0 && roundness <= 1.1, "r={r}: {roundness}");
        }
    }

    #[test]
    fn metrics_serialize() {
        let mask = disk_mask(12, 12, 5.5, 5.5, 4.0);
        let record = PlaqueRecord::new(
            mask,
            Some(DVec2::new(5.5, 5.5)),
            Some(BBox::new(1, 1, 11, 11)),
            &ExactGeometry,
        )
        .unwrap();
        let metrics = record.metrics();
        assert_eq!(metrics.bbox, Some([1, 1, 11, 11]));
        assert_eq!(metrics.bbox_area, Some(100));
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["bbox_area"], 100);
        assert_eq!(json["centroid"], serde_json::json!([5.5, 5.5]));
        assert!(json["roundness"].is_number());
    }
}
