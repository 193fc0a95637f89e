//! Image types and pixel-wise operations.

use common::Buffer2;

use crate::convolution::{gaussian_filter, DEFAULT_TRUNCATE};
use crate::error::{Error, Result};

/// Foreground / background mask.
pub type BinaryMask = Buffer2<bool>;

/// Grayscale or single-channel fluorescence image.
pub type IntensityImage = Buffer2<f64>;

/// Fails when the image has no pixels.
pub fn ensure_non_empty<T>(what: &'static str, image: &Buffer2<T>) -> Result<()> {
    if image.is_empty() {
        return Err(Error::EmptyImage {
            what,
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(())
}

/// Fails when the two grids do not share width and height.
pub fn ensure_same_size<T, U>(image: &Buffer2<T>, mask: &Buffer2<U>) -> Result<()> {
    if !image.same_size(mask) {
        return Err(Error::SizeMismatch {
            image: (image.width(), image.height()),
            mask: (mask.width(), mask.height()),
        });
    }
    Ok(())
}

/// Pixels strictly above `threshold`.
pub fn threshold(image: &IntensityImage, threshold: f64) -> BinaryMask {
    image.map(|&v| v > threshold)
}

/// Gaussian smoothing followed by a strict threshold. Sigma 0 skips the
/// smoothing; a negative or non-finite sigma is an error.
pub fn fixed_threshold(
    image: &IntensityImage,
    threshold_value: f64,
    sigma: f64,
) -> Result<BinaryMask> {
    let smoothed = gaussian_filter(image, sigma, DEFAULT_TRUNCATE)?;
    Ok(threshold(&smoothed, threshold_value))
}

/// Zeroes saturated pixels (strictly above `artifact_threshold`).
pub fn remove_artifacts(image: &IntensityImage, artifact_threshold: f64) -> IntensityImage {
    image.map(|&v| if v > artifact_threshold { 0.0 } else { v })
}

/// Converts a numeric mask into a boolean one: any non-zero pixel is foreground.
pub fn binarize(image: &IntensityImage) -> BinaryMask {
    image.map(|&v| v != 0.0)
}

/// Keeps intensity values where `mask` is set, zero elsewhere.
pub fn apply_mask(image: &IntensityImage, mask: &BinaryMask) -> Result<IntensityImage> {
    ensure_same_size(image, mask)?;
    Ok(image.zip_map(mask, |&v, &m| if m { v } else { 0.0 })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> IntensityImage {
        Buffer2::new(
            width,
            height,
            (0..width * height).map(|i| i as f64 / 10.0).collect(),
        )
    }

    #[test]
    fn threshold_is_strict() {
        let image = Buffer2::new(3, 1, vec![0.4, 0.5, 0.6]);
        assert_eq!(threshold(&image, 0.5).pixels(), &[false, false, true]);
    }

    #[test]
    fn fixed_threshold_matches_smoothed_comparison() {
        let image = crate::test_utils::gaussian_blobs(24, 24, &[(8.0, 9.0, 2.0, 2.0)]);
        let mask = fixed_threshold(&image, 0.5, 1.5).unwrap();
        let smoothed = gaussian_filter(&image, 1.5, DEFAULT_TRUNCATE).unwrap();
        assert_eq!(mask, smoothed.map(|&v| v > 0.5));
        assert!(mask[(8, 9)]);
        assert!(!mask[(20, 20)]);
    }

    #[test]
    fn fixed_threshold_without_smoothing() {
        let image = Buffer2::new(3, 1, vec![1.0, 0.2, 0.7]);
        let mask = fixed_threshold(&image, 0.5, 0.0).unwrap();
        assert_eq!(mask.pixels(), &[true, false, true]);

        let flat = Buffer2::new_filled(5, 5, 1.0);
        assert!(fixed_threshold(&flat, 0.5, 0.0).unwrap().iter().all(|&v| v));
        assert!(matches!(
            fixed_threshold(&flat, 0.5, -2.0),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn remove_artifacts_zeroes_bright_pixels() {
        let image = Buffer2::new(4, 1, vec![0.1, 0.9, 0.5, 1.0]);
        let cleaned = remove_artifacts(&image, 0.5);
        assert_eq!(cleaned.pixels(), &[0.1, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn apply_mask_requires_matching_size() {
        let image = ramp(3, 2);
        let mask = Buffer2::new(3, 2, vec![true, false, true, false, true, false]);
        let masked = apply_mask(&image, &mask).unwrap();
        assert_eq!(masked.pixels(), &[0.0, 0.0, 0.2, 0.0, 0.4, 0.0]);

        let wrong = Buffer2::new(2, 3, vec![true; 6]);
        assert!(matches!(
            apply_mask(&image, &wrong),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn empty_image_is_rejected() {
        let image: IntensityImage = Buffer2::new(0, 3, vec![]);
        assert!(matches!(
            ensure_non_empty("image", &image),
            Err(Error::EmptyImage { what: "image", .. })
        ));
        assert!(ensure_non_empty("image", &ramp(1, 1)).is_ok());
    }

    #[test]
    fn binarize_marks_non_zero() {
        let image = Buffer2::new(3, 1, vec![0.0, -1.0, 2.0]);
        assert_eq!(binarize(&image).pixels(), &[false, true, true]);
    }
}
