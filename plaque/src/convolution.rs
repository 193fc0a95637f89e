//! Separable Gaussian smoothing.
//!
//! Kernel radius is `floor(truncate * sigma + 0.5)` and samples outside the
//! image repeat the nearest edge pixel. A sigma of 0 leaves the image as is.

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::image::IntensityImage;

/// Rows handed to one rayon task.
const ROWS_PER_CHUNK: usize = 8;

/// Default number of standard deviations kept in the kernel.
pub const DEFAULT_TRUNCATE: f64 = 4.0;

/// Fails unless `sigma` and `truncate` are finite and non-negative.
pub fn check_smoothing(sigma: f64, truncate: f64) -> Result<()> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(Error::InvalidParameter {
            name: "sigma",
            reason: format!("must be finite and non-negative, got {sigma}"),
        });
    }
    if !truncate.is_finite() || truncate < 0.0 {
        return Err(Error::InvalidParameter {
            name: "truncate",
            reason: format!("must be finite and non-negative, got {truncate}"),
        });
    }
    Ok(())
}

/// Normalized 1D Gaussian kernel of length `2 * radius + 1`. Sigma 0 gives
/// the identity kernel `[1.0]`.
pub fn gaussian_kernel_1d(sigma: f64, truncate: f64) -> Result<Vec<f64>> {
    check_smoothing(sigma, truncate)?;
    if sigma == 0.0 {
        return Ok(vec![1.0]);
    }

    let radius = kernel_radius(sigma, truncate);
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }

    Ok(kernel)
}

#[inline]
pub fn kernel_radius(sigma: f64, truncate: f64) -> usize {
    (truncate * sigma + 0.5).max(0.0).floor() as usize
}

/// Smooths `image` with an isotropic Gaussian.
pub fn gaussian_filter(
    image: &IntensityImage,
    sigma: f64,
    truncate: f64,
) -> Result<IntensityImage> {
    let kernel = gaussian_kernel_1d(sigma, truncate)?;
    if image.is_empty() || kernel.len() == 1 {
        return Ok(image.clone());
    }
    let width = image.width();
    let height = image.height();

    let mut temp = IntensityImage::new_filled(width, height, 0.0);
    convolve_rows_parallel(image.pixels(), temp.pixels_mut(), width, &kernel);

    let mut output = IntensityImage::new_filled(width, height, 0.0);
    convolve_cols_parallel(temp.pixels(), output.pixels_mut(), width, height, &kernel);

    Ok(output)
}

fn convolve_rows_parallel(input: &[f64], output: &mut [f64], width: usize, kernel: &[f64]) {
    output
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, out_chunk)| {
            let y_start = chunk_idx * ROWS_PER_CHUNK;
            for (local_y, out_row) in out_chunk.chunks_mut(width).enumerate() {
                let y = y_start + local_y;
                convolve_row(&input[y * width..(y + 1) * width], out_row, kernel);
            }
        });
}

fn convolve_row(input: &[f64], output: &mut [f64], kernel: &[f64]) {
    let radius = (kernel.len() / 2) as isize;
    let last = input.len() as isize - 1;
    for (x, out) in output.iter_mut().enumerate() {
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, &kval)| {
                let sx = (x as isize + k as isize - radius).clamp(0, last);
                input[sx as usize] * kval
            })
            .sum();
    }
}

fn convolve_cols_parallel(
    input: &[f64],
    output: &mut [f64],
    width: usize,
    height: usize,
    kernel: &[f64],
) {
    let radius = (kernel.len() / 2) as isize;
    let last = height as isize - 1;

    output
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, out_chunk)| {
            let y_start = chunk_idx * ROWS_PER_CHUNK;
            for (local_y, out_row) in out_chunk.chunks_mut(width).enumerate() {
                let y = (y_start + local_y) as isize;
                for (x, out) in out_row.iter_mut().enumerate() {
                    *out = kernel
                        .iter()
                        .enumerate()
                        .map(|(k, &kval)| {
                            let sy = (y + k as isize - radius).clamp(0, last) as usize;
                            input[sy * width + x] * kval
                        })
                        .sum();
                }
            }
        });
}
