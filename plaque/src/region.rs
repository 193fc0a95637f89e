//! Connected regions extracted from a labeled mask.

use common::Buffer2;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::config::Connectivity;
use crate::error::Result;
use crate::image::{ensure_non_empty, BinaryMask};
use crate::labeling::LabelMap;

/// Half-open pixel bounding box: rows `min_row..max_row`, columns
/// `min_col..max_col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl BBox {
    #[inline]
    pub const fn new(min_row: usize, min_col: usize, max_row: usize, max_col: usize) -> Self {
        Self {
            min_row,
            min_col,
            max_row,
            max_col,
        }
    }

    /// Inverted box that any included pixel overwrites.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            min_row: usize::MAX,
            min_col: usize::MAX,
            max_row: 0,
            max_col: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min_row >= self.max_row || self.min_col >= self.max_col
    }

    /// Grows the box to cover pixel `(x, y)`.
    #[inline]
    pub fn include(&mut self, x: usize, y: usize) {
        self.min_col = self.min_col.min(x);
        self.max_col = self.max_col.max(x + 1);
        self.min_row = self.min_row.min(y);
        self.max_row = self.max_row.max(y + 1);
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.max_col.saturating_sub(self.min_col)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.max_row.saturating_sub(self.min_row)
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// Midpoint as `(x, y)` = `((max_col + min_col) / 2, (max_row + min_row) / 2)`.
    #[inline]
    pub fn center(&self) -> DVec2 {
        DVec2::new(
            (self.max_col + self.min_col) as f64 / 2.0,
            (self.max_row + self.min_row) as f64 / 2.0,
        )
    }

    /// Whether the box reaches the edge of a `width x height` image.
    pub fn touches_border(&self, width: usize, height: usize) -> bool {
        self.min_row == 0 || self.min_col == 0 || self.max_row >= height || self.max_col >= width
    }

    pub fn as_array(&self) -> [usize; 4] {
        [self.min_row, self.min_col, self.max_row, self.max_col]
    }
}

/// One labeled component.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Id in the label map this region was read from.
    pub label: u32,
    /// Member pixels, cropped to `bbox`. Pixels of other labels are false.
    pub pixel_mask: BinaryMask,
    pub bbox: BBox,
    /// Mean member position as `(x, y)` = `(col, row)`.
    pub centroid: DVec2,
    /// Member pixels as `(row, col)` in raster order.
    pub coords: Vec<(usize, usize)>,
}

impl Region {
    #[inline]
    pub fn area(&self) -> usize {
        self.coords.len()
    }
}

/// Builds one region per non-empty label, in label order.
pub fn regions_from_labels(labels: &LabelMap) -> Vec<Region> {
    let width = labels.width();
    let n = labels.num_labels();
    if n == 0 {
        return Vec::new();
    }

    let mut bboxes = vec![BBox::empty(); n];
    let mut coords: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    for (idx, &label) in labels.labels().iter().enumerate() {
        if label == 0 {
            continue;
        }
        let (x, y) = (idx % width, idx / width);
        let slot = (label - 1) as usize;
        bboxes[slot].include(x, y);
        coords[slot].push((y, x));
    }

    bboxes
        .into_iter()
        .zip(coords)
        .enumerate()
        .filter(|(_, (_, coords))| !coords.is_empty())
        .map(|(slot, (bbox, coords))| {
            let mut pixel_mask = Buffer2::new_filled(bbox.width(), bbox.height(), false);
            let mut sum = DVec2::ZERO;
            for &(row, col) in &coords {
                pixel_mask[(col - bbox.min_col, row - bbox.min_row)] = true;
                sum += DVec2::new(col as f64, row as f64);
            }
            Region {
                label: slot as u32 + 1,
                pixel_mask,
                bbox,
                centroid: sum / coords.len() as f64,
                coords,
            }
        })
        .collect()
}

/// Labels a mask and keeps the components that do not touch the border.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionExtractor {
    pub connectivity: Connectivity,
}

impl RegionExtractor {
    pub fn new(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }

    pub fn extract(&self, mask: &BinaryMask) -> Result<Vec<Region>> {
        ensure_non_empty("mask", mask)?;

        let mut labels = LabelMap::from_mask(mask, self.connectivity);
        labels.clear_border();
        let regions = regions_from_labels(&labels);

        tracing::debug!("Extracted {} interior regions", regions.len());
        Ok(regions)
    }
}
