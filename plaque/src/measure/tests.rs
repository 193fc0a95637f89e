use common::Buffer2;
use glam::DVec2;

use super::*;
use crate::config::GeometryMode;
use crate::error::Error;
use crate::geometry::{picks_area, ExactGeometry};
use crate::test_utils::{disk_mask, rect_mask};

/// Three interior disks of 29, 81 and 113 pixels plus a block on the border.
fn plate() -> BinaryMask {
    let (w, h) = (40, 30);
    let layers = [
        disk_mask(w, h, 8.0, 8.0, 3.0),
        disk_mask(w, h, 25.0, 10.0, 5.0),
        disk_mask(w, h, 10.0, 20.0, 6.0),
        rect_mask(w, h, 35, 0, 40, 5),
    ];
    let mut mask = Buffer2::new_filled(w, h, false);
    for layer in &layers {
        for (dst, &src) in mask.iter_mut().zip(layer.iter()) {
            *dst |= src;
        }
    }
    mask
}

#[test]
fn test_area_bounds_are_inclusive() {
    let plaques = get_plaques(&plate(), 29, 81, false).unwrap();
    let areas: Vec<f64> = plaques.iter().map(|p| p.area()).collect();
    assert_eq!(areas, vec![29.0, 81.0]);

    let plaques = get_plaques(&plate(), 30, 200, false).unwrap();
    let areas: Vec<f64> = plaques.iter().map(|p| p.area()).collect();
    assert_eq!(areas, vec![81.0, 113.0]);
}

#[test]
fn test_border_components_are_excluded() {
    let plaques = get_plaques(&plate(), 0, 10_000, false).unwrap();
    assert_eq!(plaques.len(), 3);
    for plaque in &plaques {
        let bbox = plaque.bbox().unwrap();
        assert!(!bbox.touches_border(40, 30));
    }
}

#[test]
fn test_records_carry_region_geometry() {
    let plaques = get_plaques(&plate(), 20, 100, false).unwrap();
    let first = &plaques[0];
    assert_eq!(first.bbox(), Some(crate::region::BBox::new(5, 5, 12, 12)));
    assert_eq!(first.centroid(), Some(DVec2::new(8.0, 8.0)));
    assert_eq!(first.mask().width(), 7);
    assert_eq!(first.mask().height(), 7);
    assert_eq!(first.mode(), GeometryMode::Exact);
}

#[test]
fn test_get_plaques_is_idempotent() {
    let mask = plate();
    let engine = PlaqueMeasurementEngine::new(MeasurementConfig::new(0, 500, true)).unwrap();
    let first = engine.get_plaques(&mask).unwrap();
    let second = engine.get_plaques(&mask).unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.area(), b.area());
        assert_eq!(a.perimeter(), b.perimeter());
        assert_eq!(a.centroid(), b.centroid());
    }
}

#[test]
fn test_picks_mode_filters_on_picks_area() {
    let engine = PlaqueMeasurementEngine::new(MeasurementConfig::new(0, 500, true)).unwrap();
    assert_eq!(engine.estimator().mode(), GeometryMode::Picks);
    let plaques = engine.get_plaques(&plate()).unwrap();
    assert_eq!(plaques.len(), 3);
    for plaque in &plaques {
        let expected = picks_area(plaque.mask(), crate::config::Connectivity::Four);
        assert!((plaque.area() - expected).abs() < 1e-12);
        assert!(plaque.area() < plaque.mask().count_where(|&v| v) as f64);
    }
}

#[test]
fn test_invalid_inputs_are_rejected() {
    assert!(matches!(
        get_plaques(&plate(), 200, 100, false),
        Err(Error::InvalidParameter { .. })
    ));
    let empty: BinaryMask = Buffer2::new(0, 0, vec![]);
    assert!(matches!(
        get_plaques(&empty, 0, 10, false),
        Err(Error::EmptyImage { .. })
    ));
}

#[test]
fn test_all_background_gives_no_plaques() {
    let mask = Buffer2::new_filled(10, 10, false);
    assert!(get_plaques(&mask, 0, 10, false).unwrap().is_empty());
}

#[test]
fn test_summary_statistics() {
    let engine = PlaqueMeasurementEngine::new(MeasurementConfig::new(20, 100, false)).unwrap();
    let plaques = engine.get_plaques(&plate()).unwrap();
    let summary = engine.get_measure(&plaques);

    assert_eq!(summary.count, 2);
    assert_eq!(summary.mean_area, 55.0);
    assert_eq!(summary.median_area, 55.0);
    // Bbox centres (8.5, 8.5) and (25.5, 10.5).
    assert_eq!(summary.centroid, Some(DVec2::new(17.0, 9.5)));
    assert!(summary.mean_eccentricity >= 0.0 && summary.mean_eccentricity < 0.1);
    assert!(summary.mean_roundness > 0.0 && summary.mean_roundness <= 1.0);
}

#[test]
fn test_median_of_even_count() {
    let plaques: Vec<PlaqueRecord> = [(2, 2), (2, 3), (2, 5), (4, 5)]
        .iter()
        .map(|&(w, h)| PlaqueRecord::new(rect_mask(w, h, 0, 0, w, h), None, None, &ExactGeometry))
        .collect::<Result<_>>()
        .unwrap();
    let summary = summarize(&plaques);
    assert_eq!(summary.median_area, 8.0);
    assert_eq!(summary.mean_area, 10.0);
    assert_eq!(summary.centroid, None);
}

#[test]
fn test_empty_summary_is_nan() {
    let summary = summarize(&[]);
    assert_eq!(summary.count, 0);
    assert!(summary.mean_area.is_nan());
    assert!(summary.median_area.is_nan());
    assert!(summary.mean_eccentricity.is_nan());
    assert!(summary.mean_roundness.is_nan());
    assert_eq!(summary.centroid, None);
}

#[test]
fn test_centroid_of_points() {
    assert_eq!(centroid(&[]), None);
    let points = [DVec2::new(0.0, 0.0), DVec2::new(2.0, 4.0), DVec2::new(4.0, 2.0)];
    assert_eq!(centroid(&points), Some(DVec2::new(2.0, 2.0)));
}

#[test]
fn test_summary_serializes() {
    let engine = PlaqueMeasurementEngine::new(MeasurementConfig::new(20, 100, false)).unwrap();
    let summary = engine.get_measure(&engine.get_plaques(&plate()).unwrap());
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["count"], 2);
    assert_eq!(json["centroid"], serde_json::json!([17.0, 9.5]));
}
