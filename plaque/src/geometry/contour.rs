//! Outer border following on binary masks.
//!
//! Each 8-connected component contributes one closed contour, traced from its
//! first pixel in raster order. Contours are chain-compressed: a point is kept
//! only where the chain direction changes.

use glam::IVec2;

use crate::config::Connectivity;
use crate::image::BinaryMask;
use crate::labeling::LabelMap;

/// Chain code steps, counter-clockwise on screen starting at "right".
const CHAIN_STEPS: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(1, -1),
    IVec2::new(0, -1),
    IVec2::new(-1, -1),
    IVec2::new(-1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, 1),
    IVec2::new(1, 1),
];

/// Direction of the left neighbour, always background at a component's first pixel.
const LEFT: usize = 4;

#[inline]
fn is_set(mask: &BinaryMask, p: IVec2) -> bool {
    p.x >= 0
        && p.y >= 0
        && (p.x as usize) < mask.width()
        && (p.y as usize) < mask.height()
        && mask[(p.x as usize, p.y as usize)]
}

/// Compressed outer contours in `(x, y)` pixel coordinates.
pub fn find_contours(mask: &BinaryMask) -> Vec<Vec<IVec2>> {
    let labels = LabelMap::from_mask(mask, Connectivity::Eight);
    let mut starts = vec![None; labels.num_labels()];
    for (idx, &label) in labels.labels().iter().enumerate() {
        if label != 0 && starts[(label - 1) as usize].is_none() {
            let (x, y) = (idx % mask.width(), idx / mask.width());
            starts[(label - 1) as usize] = Some(IVec2::new(x as i32, y as i32));
        }
    }

    starts
        .into_iter()
        .flatten()
        .map(|start| compress_chain(&trace_outer_border(mask, start)))
        .collect()
}

/// Border pixels with the chain direction leaving each one. A lone pixel
/// has no direction.
fn trace_outer_border(mask: &BinaryMask, start: IVec2) -> Vec<(IVec2, Option<usize>)> {
    // Clockwise search around the start for the last pixel of the contour.
    let mut dir = LEFT;
    let first = loop {
        dir = (dir + 7) % 8;
        let candidate = start + CHAIN_STEPS[dir];
        if is_set(mask, candidate) {
            break Some(candidate);
        }
        if dir == LEFT {
            break None;
        }
    };
    let Some(last) = first else {
        return vec![(start, None)];
    };

    let mut border = Vec::new();
    let mut current = start;
    loop {
        // Counter-clockwise search from just past the previous pixel.
        let next = loop {
            dir = (dir + 1) % 8;
            let candidate = current + CHAIN_STEPS[dir];
            if is_set(mask, candidate) {
                break candidate;
            }
        };
        border.push((current, Some(dir)));

        if next == start && current == last {
            break;
        }
        current = next;
        dir = (dir + 4) % 8;
    }
    border
}

/// Drops points whose incoming and outgoing directions match. The chain is
/// closed, so the first point's incoming direction is the last step.
fn compress_chain(chain: &[(IVec2, Option<usize>)]) -> Vec<IVec2> {
    if chain.len() < 2 {
        return chain.iter().map(|&(p, _)| p).collect();
    }
    (0..chain.len())
        .filter(|&i| {
            let prev = if i == 0 { chain.len() - 1 } else { i - 1 };
            chain[i].1 != chain[prev].1
        })
        .map(|i| chain[i].0)
        .collect()
}

/// Length of the closed polygon through `points`.
pub fn closed_length(points: &[IVec2]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| (*b - *a).as_dvec2().length())
        .sum()
}

/// Length of the longest traced outer contour, 0 for an empty mask.
pub fn contour_perimeter(mask: &BinaryMask) -> f64 {
    find_contours(mask)
        .iter()
        .map(|contour| closed_length(contour))
        .fold(0.0, f64::max)
}
