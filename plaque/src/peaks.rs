//! Local-maxima detection used to count coalesced plaques inside one region.

use serde::{Deserialize, Serialize};

use crate::config::VirusDetectionParameters;
use crate::convolution::{check_smoothing, gaussian_filter};
use crate::error::Result;
use crate::image::{apply_mask, BinaryMask, IntensityImage};
use crate::region::Region;

/// Integer pixel position in `(row, col)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelCoord {
    pub row: usize,
    pub col: usize,
}

impl PixelCoord {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    #[inline]
    pub fn offset(self, origin: PixelCoord) -> Self {
        Self::new(self.row + origin.row, self.col + origin.col)
    }

    #[inline]
    fn chebyshev(self, other: PixelCoord) -> usize {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }
}

/// Local maxima of `image`, brightest first.
///
/// A pixel is a candidate when it equals the maximum of the
/// `(2d+1) x (2d+1)` window around it (clipped to the image) and is strictly
/// above the image minimum. Candidates are visited in descending intensity
/// (ties in raster order); a candidate closer than `min_distance` (Chebyshev)
/// to an accepted peak is dropped. Maxima on the image border are kept.
pub fn peak_local_max(image: &IntensityImage, min_distance: usize) -> Vec<PixelCoord> {
    let width = image.width();
    let height = image.height();
    if image.is_empty() {
        return Vec::new();
    }

    let floor = image.iter().copied().fold(f64::INFINITY, f64::min);
    let d = min_distance;

    let mut candidates: Vec<(PixelCoord, f64)> = Vec::new();
    for y in 0..height {
        let y0 = y.saturating_sub(d);
        let y1 = (y + d).min(height - 1);
        for x in 0..width {
            let value = image[(x, y)];
            if value <= floor {
                continue;
            }
            let x0 = x.saturating_sub(d);
            let x1 = (x + d).min(width - 1);
            let is_max = (y0..=y1).all(|wy| image.row(wy)[x0..=x1].iter().all(|&v| v <= value));
            if is_max {
                candidates.push((PixelCoord::new(y, x), value));
            }
        }
    }

    // Stable sort keeps raster order among equal intensities.
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut accepted: Vec<PixelCoord> = Vec::with_capacity(candidates.len());
    for (coord, _) in candidates {
        if accepted.iter().all(|&peak| peak.chebyshev(coord) >= d) {
            accepted.push(coord);
        }
    }
    accepted
}

/// Smooths a masked region crop and reports its peaks in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluorescencePeakCounter {
    pub sigma: f64,
    /// Kernel extent in standard deviations.
    pub truncate: f64,
    pub min_distance: usize,
}

impl FluorescencePeakCounter {
    /// Takes the smoothing settings from `params`. Sigma 0 counts peaks on
    /// the unsmoothed region.
    pub fn new(params: &VirusDetectionParameters) -> Result<Self> {
        let sigma = params.plaque_gaussian_filter_sigma;
        let truncate = params.truncate();
        check_smoothing(sigma, truncate)?;
        Ok(Self {
            sigma,
            truncate,
            min_distance: params.peak_region_size as usize,
        })
    }

    /// Peaks of `intensity_crop` restricted to `region_mask`, shifted by
    /// `origin` (the crop's top-left pixel in the full image).
    pub fn count_peaks(
        &self,
        intensity_crop: &IntensityImage,
        region_mask: &BinaryMask,
        origin: PixelCoord,
    ) -> Result<Vec<PixelCoord>> {
        let masked = apply_mask(intensity_crop, region_mask)?;
        let smoothed = gaussian_filter(&masked, self.sigma, self.truncate)?;
        Ok(peak_local_max(&smoothed, self.min_distance)
            .into_iter()
            .map(|p| p.offset(origin))
            .collect())
    }

    /// Crops `image` to `region`'s bbox and counts its peaks.
    pub fn count_region_peaks(
        &self,
        image: &IntensityImage,
        region: &Region,
    ) -> Result<Vec<PixelCoord>> {
        let bbox = region.bbox;
        let crop = image.crop(bbox.min_col, bbox.min_row, bbox.width(), bbox.height())?;
        let peaks = self.count_peaks(
            &crop,
            &region.pixel_mask,
            PixelCoord::new(bbox.min_row, bbox.min_col),
        )?;
        tracing::debug!("Region {} has {} peaks", region.label, peaks.len());
        Ok(peaks)
    }
}
