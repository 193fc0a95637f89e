//! Convex hull of a binary mask, rasterized back onto the pixel grid.

use common::Buffer2;
use geo::{ConvexHull, Coord, Intersects, MultiPoint, Point};

use crate::image::BinaryMask;

/// Pixels whose centre lies inside or on the convex hull of the set pixels.
///
/// Each set pixel contributes the midpoints of its four edges, so a single
/// pixel or a one-pixel line still spans a non-degenerate hull.
pub fn convex_hull_image(mask: &BinaryMask) -> BinaryMask {
    let (width, height) = (mask.width(), mask.height());
    let mut points = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if mask[(x, y)] {
                let (cx, cy) = (x as f64, y as f64);
                points.extend([
                    Point::new(cx - 0.5, cy),
                    Point::new(cx + 0.5, cy),
                    Point::new(cx, cy - 0.5),
                    Point::new(cx, cy + 0.5),
                ]);
            }
        }
    }

    let mut hull_mask = Buffer2::new_filled(width, height, false);
    if points.is_empty() {
        return hull_mask;
    }

    let hull = MultiPoint::from(points).convex_hull();
    for y in 0..height {
        for x in 0..width {
            let centre = Coord {
                x: x as f64,
                y: y as f64,
            };
            hull_mask[(x, y)] = hull.intersects(&centre);
        }
    }
    hull_mask
}

/// Number of pixels in [`convex_hull_image`].
pub fn convex_area(mask: &BinaryMask) -> usize {
    convex_hull_image(mask).count_where(|&v| v)
}
