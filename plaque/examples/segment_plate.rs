//! Example: Segment a synthetic fluorescence well and measure its plaques
//!
//! Builds a well image with isolated and touching foci, runs the segmenter,
//! reads out the well and every plaque, and prints the aggregate summary as
//! JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example segment_plate
//! cargo run --example segment_plate -- params.yaml
//! ```

use std::path::PathBuf;

use anyhow::Context;
use common::log_setup::{LogConfig, setup_logging};
use plaque::{
    Buffer2, ExactGeometry, IntensityImage, VirusDetectionParameters, VirusPlaqueSegmenter,
    WellReader, summarize,
};

/// Foci as `(x, y, amplitude, sigma)`. The last two overlap.
const FOCI: [(f64, f64, f64, f64); 5] = [
    (40.0, 40.0, 1.0, 5.0),
    (120.0, 50.0, 0.8, 7.0),
    (60.0, 130.0, 1.2, 4.0),
    (140.0, 140.0, 1.0, 5.0),
    (156.0, 146.0, 0.9, 5.0),
];

fn synthetic_well(size: usize) -> IntensityImage {
    let mut image = Buffer2::new_filled(size, size, 0.0);
    for y in 0..size {
        for x in 0..size {
            image[(x, y)] = FOCI
                .iter()
                .map(|&(cx, cy, amplitude, sigma)| {
                    let r2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
                    amplitude * (-r2 / (2.0 * sigma * sigma)).exp()
                })
                .sum();
        }
    }
    image
}

fn default_params() -> VirusDetectionParameters {
    VirusDetectionParameters {
        virus_threshold: 0.25,
        plaque_connectivity: 4,
        min_plaque_area: 20,
        max_plaque_area: None,
        use_picks: false,
        fine_plaque_detection_flag: true,
        plaque_gaussian_filter_sigma: 2.0,
        plaque_gaussian_filter_size: 6.0,
        peak_region_size: 4,
        min_cell_area: Some(20),
        max_cell_area: Some(60),
    }
}

fn main() -> anyhow::Result<()> {
    setup_logging(&LogConfig::default().with_log_dir("logs"))?;

    let params = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => VirusDetectionParameters::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => default_params(),
    };

    let image = synthetic_well(200);
    let segmentation = VirusPlaqueSegmenter::new(params.clone())?.segment(&image)?;
    tracing::info!(
        regions = segmentation.plaque_count(),
        peaks = segmentation.peaks.as_ref().map_or(0, Vec::len),
        "Segmentation finished"
    );

    // Nuclei stand in as the brighter core of every focus.
    let nuclei = image.map(|&v| v > 0.5);
    let nuclei_image = nuclei.map(|&v| if v { 1.0 } else { 0.0 });
    let well = WellReader::new(params)?.read(&image, &segmentation.mask, &nuclei_image, &nuclei)?;
    tracing::info!(
        plaques = well.plaque_count,
        nuclei = ?well.nuclei_count,
        infected = ?well.infected_nuclei_count,
        lesion_area = well.lesion_area,
        "Well"
    );
    for readout in &well.plaques {
        tracing::info!(
            label = readout.label,
            area = readout.area,
            peaks = readout.peaks.as_ref().map_or(0, Vec::len),
            eccentricity = readout.eccentricity,
            convex_area = readout.convex_area,
            mean_intensity = readout.mean_intensity,
            "Plaque"
        );
    }

    let records = segmentation.plaque_records(&ExactGeometry)?;
    let summary = summarize(&records);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
