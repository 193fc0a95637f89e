//! Binary and grey-level morphology with small symmetric structuring elements.

use common::Buffer2;

use crate::config::Connectivity;
use crate::image::{BinaryMask, IntensityImage};

/// Set of `(dx, dy)` offsets relative to the anchor pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    offsets: Vec<(isize, isize)>,
}

impl StructuringElement {
    /// 3x3 plus shape.
    pub fn cross() -> Self {
        Self {
            offsets: vec![(0, -1), (-1, 0), (0, 0), (1, 0), (0, 1)],
        }
    }

    /// Full 3x3 square.
    pub fn square() -> Self {
        let offsets = (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
            .collect();
        Self { offsets }
    }

    pub fn for_connectivity(connectivity: Connectivity) -> Self {
        match connectivity {
            Connectivity::Four => Self::cross(),
            Connectivity::Eight => Self::square(),
        }
    }

    /// Discretized ellipse inscribed in a `(2r+1) x (2r+1)` box.
    ///
    /// Row `dy` spans `dx` in `-w..=w` with `w = round(sqrt(r² - dy²))`.
    pub fn ellipse(radius: usize) -> Self {
        let r = radius as isize;
        let mut offsets = Vec::new();
        for dy in -r..=r {
            let half = ((r * r - dy * dy) as f64).sqrt().round() as isize;
            offsets.extend((-half..=half).map(|dx| (dx, dy)));
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[(isize, isize)] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

#[inline]
fn neighbour<T: Copy>(grid: &Buffer2<T>, x: usize, y: usize, dx: isize, dy: isize) -> Option<T> {
    let nx = x as isize + dx;
    let ny = y as isize + dy;
    if nx < 0 || ny < 0 || nx >= grid.width() as isize || ny >= grid.height() as isize {
        None
    } else {
        Some(grid[(nx as usize, ny as usize)])
    }
}

/// Keeps a pixel only if every offset lands on foreground. Pixels outside
/// the image count as background.
pub fn binary_erode(mask: &BinaryMask, se: &StructuringElement) -> BinaryMask {
    let mut out = Buffer2::new_filled(mask.width(), mask.height(), false);
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            out[(x, y)] = se
                .offsets()
                .iter()
                .all(|&(dx, dy)| neighbour(mask, x, y, dx, dy).unwrap_or(false));
        }
    }
    out
}

/// Sets a pixel if any offset lands on foreground.
pub fn binary_dilate(mask: &BinaryMask, se: &StructuringElement) -> BinaryMask {
    let mut out = Buffer2::new_filled(mask.width(), mask.height(), false);
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            out[(x, y)] = se
                .offsets()
                .iter()
                .any(|&(dx, dy)| neighbour(mask, x, y, dx, dy).unwrap_or(false));
        }
    }
    out
}

fn grey_reduce(
    image: &IntensityImage,
    se: &StructuringElement,
    pick: fn(f64, f64) -> f64,
) -> IntensityImage {
    let mut out = Buffer2::new_filled(image.width(), image.height(), 0.0);
    for y in 0..image.height() {
        for x in 0..image.width() {
            out[(x, y)] = se
                .offsets()
                .iter()
                .filter_map(|&(dx, dy)| neighbour(image, x, y, dx, dy))
                .reduce(pick)
                .unwrap_or(image[(x, y)]);
        }
    }
    out
}

/// Minimum over the in-bounds part of the structuring element.
pub fn grey_erode(image: &IntensityImage, se: &StructuringElement) -> IntensityImage {
    grey_reduce(image, se, f64::min)
}

/// Maximum over the in-bounds part of the structuring element.
pub fn grey_dilate(image: &IntensityImage, se: &StructuringElement) -> IntensityImage {
    grey_reduce(image, se, f64::max)
}

/// Erosion followed by dilation. Never exceeds the input.
pub fn grey_opening(image: &IntensityImage, se: &StructuringElement) -> IntensityImage {
    grey_dilate(&grey_erode(image, se), se)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mask_from_ascii, mask_to_u8_rows};

    #[test]
    fn ellipse_matches_discrete_disk() {
        assert_eq!(StructuringElement::ellipse(0).offsets(), &[(0, 0)]);
        assert_eq!(StructuringElement::ellipse(1), {
            let mut cross = StructuringElement::cross();
            cross.offsets.sort_by_key(|&(dx, dy)| (dy, dx));
            cross
        });
        // Rows of a radius-2 ellipse have half-widths 0, 2, 2, 2, 0.
        assert_eq!(StructuringElement::ellipse(2).len(), 1 + 5 + 5 + 5 + 1);
    }

    #[test]
    fn erosion_treats_outside_as_background() {
        let mask = mask_from_ascii(&["###", "###", "###"]);
        let eroded = binary_erode(&mask, &StructuringElement::cross());
        assert_eq!(
            mask_to_u8_rows(&eroded),
            vec![vec![0, 0, 0], vec![0, 1, 0], vec![0, 0, 0]]
        );
    }

    #[test]
    fn cross_and_square_erosion_differ_on_diagonals() {
        let mask = mask_from_ascii(&[
            ".....", //
            ".###.", //
            "####.", //
            ".###.", //
            ".....",
        ]);
        let cross = binary_erode(&mask, &StructuringElement::cross());
        let square = binary_erode(&mask, &StructuringElement::square());
        assert!(cross[(2, 2)]);
        assert!(cross[(1, 2)]);
        assert!(square[(2, 2)]);
        assert!(!square[(1, 2)]);
        assert_eq!(cross.count_where(|&v| v), 2);
        assert_eq!(square.count_where(|&v| v), 1);
    }

    #[test]
    fn dilation_grows_by_structuring_element() {
        let mask = mask_from_ascii(&[".....", ".....", "..#..", ".....", "....."]);
        let four = binary_dilate(&mask, &StructuringElement::cross());
        let eight = binary_dilate(&mask, &StructuringElement::square());
        assert_eq!(four.count_where(|&v| v), 5);
        assert_eq!(eight.count_where(|&v| v), 9);
        assert!(!four[(1, 1)]);
        assert!(eight[(1, 1)]);
    }

    #[test]
    fn grey_opening_removes_narrow_peaks() {
        let mut image = Buffer2::new_filled(9, 9, 1.0);
        image[(4, 4)] = 10.0;
        let opened = grey_opening(&image, &StructuringElement::ellipse(1));
        assert!(opened.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn grey_opening_keeps_plateau_core_and_rounds_corners() {
        let mut image = Buffer2::new_filled(12, 12, 0.0);
        for y in 2..9 {
            for x in 2..9 {
                image[(x, y)] = 5.0;
            }
        }
        let opened = grey_opening(&image, &StructuringElement::ellipse(2));
        assert!(opened.iter().zip(image.iter()).all(|(o, i)| o <= i));
        assert_eq!(opened[(5, 5)], 5.0);
        assert_eq!(opened[(2, 5)], 5.0);
        assert_eq!(opened[(2, 2)], 0.0);
    }
}
