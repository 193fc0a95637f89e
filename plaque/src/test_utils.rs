//! Synthetic image builders shared by unit tests.

use common::Buffer2;

use crate::image::{BinaryMask, IntensityImage};

/// Builds a mask from ASCII rows: `#` is foreground, anything else background.
pub(crate) fn mask_from_ascii(rows: &[&str]) -> BinaryMask {
    let rows: Vec<Vec<bool>> = rows
        .iter()
        .map(|row| row.chars().map(|c| c == '#').collect())
        .collect();
    Buffer2::from_rows(&rows).unwrap()
}

/// Filled disk of radius `r` centred on pixel `(cx, cy)`.
pub(crate) fn disk_mask(width: usize, height: usize, cx: f64, cy: f64, r: f64) -> BinaryMask {
    ellipse_mask(width, height, cx, cy, r, r)
}

/// Filled axis-aligned ellipse with semi-axes `a` (x) and `b` (y).
pub(crate) fn ellipse_mask(
    width: usize,
    height: usize,
    cx: f64,
    cy: f64,
    a: f64,
    b: f64,
) -> BinaryMask {
    let mut mask = Buffer2::new_filled(width, height, false);
    for y in 0..height {
        for x in 0..width {
            let dx = (x as f64 - cx) / a;
            let dy = (y as f64 - cy) / b;
            mask[(x, y)] = dx * dx + dy * dy <= 1.0;
        }
    }
    mask
}

/// Filled rectangle covering columns `x0..x1` and rows `y0..y1`.
pub(crate) fn rect_mask(
    width: usize,
    height: usize,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
) -> BinaryMask {
    let mut mask = Buffer2::new_filled(width, height, false);
    for y in y0..y1 {
        for x in x0..x1 {
            mask[(x, y)] = true;
        }
    }
    mask
}

/// Sum of isotropic Gaussian blobs `(cx, cy, amplitude, sigma)`.
pub(crate) fn gaussian_blobs(
    width: usize,
    height: usize,
    blobs: &[(f64, f64, f64, f64)],
) -> IntensityImage {
    let mut image = Buffer2::new_filled(width, height, 0.0);
    for y in 0..height {
        for x in 0..width {
            image[(x, y)] = blobs
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

pub(crate) fn mask_to_u8_rows(mask: &BinaryMask) -> Vec<Vec<u8>> {
    (0..mask.height())
        .map(|y| mask.row(y).iter().map(|&v| v as u8).collect())
        .collect()
}
