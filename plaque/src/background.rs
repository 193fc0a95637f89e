//! Rolling-ball style background subtraction.

use crate::image::IntensityImage;
use crate::morphology::{grey_opening, StructuringElement};

/// Splits `image` into a smooth background and the structures smaller than
/// a disk of `radius`. Returns `(background, foreground)`.
///
/// The background is the grey opening with an elliptical element, so it
/// never exceeds the image and the foreground is non-negative.
pub fn remove_background(
    image: &IntensityImage,
    radius: usize,
) -> (IntensityImage, IntensityImage) {
    let background = grey_opening(image, &StructuringElement::ellipse(radius));
    let mut foreground = image.clone();
    for (fg, &bg) in foreground.iter_mut().zip(background.iter()) {
        *fg -= bg;
    }
    tracing::debug!(
        "Removed background from {}x{} image with radius {}",
        image.width(),
        image.height(),
        radius
    );
    (background, foreground)
}
