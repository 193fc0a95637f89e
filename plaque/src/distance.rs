//! Exact Euclidean distance transform.
//!
//! Separable lower-envelope algorithm: a 1D squared-distance pass over
//! columns, then over rows.

use common::Buffer2;

use crate::image::{BinaryMask, IntensityImage};

/// Stand-in for infinity that keeps the parabola intersections finite.
const FAR: f64 = 1e20;

/// Distance from every pixel to the nearest foreground pixel of `mask`.
/// Foreground pixels are at distance 0. With no foreground every distance
/// is `f64::INFINITY`.
pub fn distance_to_foreground(mask: &BinaryMask) -> IntensityImage {
    let width = mask.width();
    let height = mask.height();

    if !mask.iter().any(|&v| v) {
        return Buffer2::new_filled(width, height, f64::INFINITY);
    }

    let mut sq = mask.map(|&v| if v { 0.0 } else { FAR });

    let mut f = vec![0.0; width.max(height)];
    let mut d = vec![0.0; width.max(height)];
    let mut v = vec![0usize; width.max(height)];
    let mut z = vec![0.0; width.max(height) + 1];

    for x in 0..width {
        for y in 0..height {
            f[y] = sq[(x, y)];
        }
        squared_distance_1d(&f[..height], &mut d[..height], &mut v, &mut z);
        for y in 0..height {
            sq[(x, y)] = d[y];
        }
    }

    for y in 0..height {
        f[..width].copy_from_slice(sq.row(y));
        squared_distance_1d(&f[..width], &mut d[..width], &mut v, &mut z);
        sq.row_mut(y).copy_from_slice(&d[..width]);
    }

    sq.map(|&d2| d2.sqrt())
}

/// Pixels within `max_gap` of foreground, foreground included.
pub fn bridge_gaps(mask: &BinaryMask, max_gap: f64) -> BinaryMask {
    distance_to_foreground(mask).map(|&d| d <= max_gap)
}

/// Lower envelope of parabolas rooted at `(q, f[q])`.
fn squared_distance_1d(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }

    let mut k = 0usize;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let mut s = intersection(f, q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = intersection(f, q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        let dq = q as f64 - p as f64;
        *out = dq * dq + f[p];
    }
}

/// Abscissa where the parabolas rooted at `q` and `p` meet.
#[inline]
fn intersection(f: &[f64], q: usize, p: usize) -> f64 {
    let (qf, pf) = (q as f64, p as f64);
    ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::test_utils::mask_from_ascii;

    fn brute_force(mask: &BinaryMask) -> IntensityImage {
        let points: Vec<(usize, usize)> = mask
            .enumerate_pixels()
            .filter(|(_, _, &v)| v)
            .map(|(x, y, _)| (x, y))
            .collect();
        let mut out = Buffer2::new_filled(mask.width(), mask.height(), f64::INFINITY);
        for (x, y, _) in mask.enumerate_pixels() {
            out[(x, y)] = points
                .iter()
                .map(|&(px, py)| {
                    let dx = x as f64 - px as f64;
                    let dy = y as f64 - py as f64;
                    (dx * dx + dy * dy).sqrt()
                })
                .fold(f64::INFINITY, f64::min);
        }
        out
    }

    #[test]
    fn single_point_distances() {
        let mask = mask_from_ascii(&[".....", ".....", "..#..", ".....", "....."]);
        let dist = distance_to_foreground(&mask);
        assert_eq!(dist[(2, 2)], 0.0);
        assert_eq!(dist[(2, 0)], 2.0);
        assert!((dist[(0, 0)] - 8f64.sqrt()).abs() < 1e-12);
        assert!((dist[(3, 3)] - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_mask_is_infinitely_far() {
        let mask = Buffer2::new_filled(3, 2, false);
        assert!(distance_to_foreground(&mask).iter().all(|d| d.is_infinite()));
        assert!(bridge_gaps(&mask, 100.0).iter().all(|&v| !v));
    }

    #[test]
    fn matches_brute_force_on_random_masks() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10 {
            let pixels: Vec<bool> = (0..23 * 17).map(|_| rng.random_bool(0.05)).collect();
            let mask = Buffer2::new(23, 17, pixels);
            if !mask.iter().any(|&v| v) {
                continue;
            }
            let fast = distance_to_foreground(&mask);
            let slow = brute_force(&mask);
            for (a, b) in fast.iter().zip(slow.iter()) {
                assert!((a - b).abs() < 1e-9, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn bridge_gaps_joins_close_fragments() {
        let mask = mask_from_ascii(&["#...#......#"]);
        let bridged = bridge_gaps(&mask, 2.0);
        // Gap of three pixels is closed, gap of six is not.
        assert!(bridged.row(0)[..5].iter().all(|&v| v));
        assert!(!bridged[(8, 0)]);
    }
}
