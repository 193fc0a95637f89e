//! Boundary-weighted area and perimeter estimates for low-resolution masks.
//!
//! Boundary pixels are classified by convolving the boundary band with
//! [`PATTERN_KERNEL`]. The centre weight is 1, so only boundary pixels produce
//! odd codes; every code in `0..50` maps to a fixed weight.

use common::Buffer2;

use crate::config::Connectivity;
use crate::image::BinaryMask;
use crate::morphology::{binary_dilate, binary_erode, StructuringElement};

const PATTERN_KERNEL: [[u32; 3]; 3] = [[10, 2, 10], [2, 1, 2], [10, 2, 10]];

const CODE_COUNT: usize = 50;

const ORTHOGONAL_CODES: [usize; 6] = [5, 7, 15, 17, 25, 27];
const DIAGONAL_CODES: [usize; 2] = [21, 33];
const MIXED_CODES: [usize; 2] = [13, 23];

fn weight_table(orthogonal: f64, diagonal: f64, mixed: f64) -> [f64; CODE_COUNT] {
    let mut weights = [0.0; CODE_COUNT];
    for code in ORTHOGONAL_CODES {
        weights[code] = orthogonal;
    }
    for code in DIAGONAL_CODES {
        weights[code] = diagonal;
    }
    for code in MIXED_CODES {
        weights[code] = mixed;
    }
    weights
}

/// Pixels set in `a` but not in `b`. Both masks share one size.
fn difference(a: &BinaryMask, b: &BinaryMask) -> BinaryMask {
    let pixels = a.iter().zip(b.iter()).map(|(&a, &b)| a && !b).collect();
    Buffer2::new(a.width(), a.height(), pixels)
}

/// Weighted sum of boundary pattern codes.
fn weighted_boundary(border: &BinaryMask, weights: &[f64; CODE_COUNT]) -> f64 {
    let (w, h) = (border.width() as isize, border.height() as isize);
    let mut histogram = [0usize; CODE_COUNT];

    for y in 0..h {
        for x in 0..w {
            let mut code = 0u32;
            for (ky, kernel_row) in PATTERN_KERNEL.iter().enumerate() {
                for (kx, &k) in kernel_row.iter().enumerate() {
                    let sx = x + kx as isize - 1;
                    let sy = y + ky as isize - 1;
                    if sx >= 0 && sy >= 0 && sx < w && sy < h && border[(sx as usize, sy as usize)] {
                        code += k;
                    }
                }
            }
            histogram[code as usize] += 1;
        }
    }

    histogram
        .iter()
        .zip(weights)
        .map(|(&count, &weight)| count as f64 * weight)
        .sum()
}

/// Pick's-theorem area: `interior + boundary / 2 - 1`, or the weighted
/// boundary alone when erosion leaves no interior.
pub fn picks_area(mask: &BinaryMask, connectivity: Connectivity) -> f64 {
    let eroded = binary_erode(mask, &StructuringElement::for_connectivity(connectivity));
    let border = difference(mask, &eroded);

    let weights = weight_table(0.25, 1.0, 0.125);
    let total = weighted_boundary(&border, &weights);

    let interior = eroded.count_where(|&v| v);
    if interior == 0 {
        total
    } else {
        interior as f64 + total / 2.0 - 1.0
    }
}

/// Weighted length of the one-pixel band just outside the object.
pub fn picks_perimeter(mask: &BinaryMask, connectivity: Connectivity) -> f64 {
    let padded = mask.padded(1, false);
    let dilated = binary_dilate(&padded, &StructuringElement::for_connectivity(connectivity));
    let border = difference(&dilated, &padded);

    let sqrt2 = std::f64::consts::SQRT_2;
    let weights = weight_table(1.0, sqrt2, (1.0 + sqrt2) / 2.0);
    weighted_boundary(&border, &weights)
}
