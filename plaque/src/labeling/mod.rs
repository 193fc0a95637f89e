//! Connected component labeling using union-find.
//!
//! Run-length encoded: each row is split into horizontal runs of foreground
//! pixels, runs are merged with overlapping runs of the previous row, and
//! provisional labels are flattened to `1..=n` at the end. Label ids follow
//! the raster order of each component's first pixel.


use common::Buffer2;

use crate::config::Connectivity;
use crate::image::BinaryMask;

// ============================================================================
// Run-Length Encoding
// ============================================================================

/// A horizontal run of foreground pixels.
#[derive(Debug, Clone, Copy)]
struct Run {
    start: u32, // inclusive
    end: u32,   // exclusive
    label: u32,
}

impl Run {
    /// Columns of the previous row that may touch this run. End is exclusive.
    #[inline]
    fn search_window(&self, connectivity: Connectivity) -> (u32, u32) {
        match connectivity {
            Connectivity::Four => (self.start, self.end),
            Connectivity::Eight => (self.start.saturating_sub(1), self.end + 1),
        }
    }
}

#[inline]
fn runs_connected(prev: &Run, curr: &Run, connectivity: Connectivity) -> bool {
    match connectivity {
        Connectivity::Four => prev.start < curr.end && prev.end > curr.start,
        Connectivity::Eight => prev.start < curr.end + 1 && prev.end + 1 > curr.start,
    }
}

fn extract_runs_from_row(row: &[bool], runs: &mut Vec<Run>) {
    let mut run_start = None;
    for (x, &set) in row.iter().enumerate() {
        match (set, run_start) {
            (true, None) => run_start = Some(x as u32),
            (false, Some(start)) => {
                runs.push(Run {
                    start,
                    end: x as u32,
                    label: 0,
                });
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push(Run {
            start,
            end: row.len() as u32,
            label: 0,
        });
    }
}

/// For each run in `curr_runs`, unions it with every touching run of the
/// previous row. Runs without a neighbour get a fresh label.
fn merge_runs_with_prev(
    curr_runs: &mut [Run],
    prev_runs: &[Run],
    connectivity: Connectivity,
    uf: &mut UnionFind,
) {
    let mut prev_idx = 0;
    for run in curr_runs.iter_mut() {
        let (search_start, search_end) = run.search_window(connectivity);

        while prev_idx < prev_runs.len() && prev_runs[prev_idx].end <= search_start {
            prev_idx += 1;
        }

        let mut assigned_label = None;
        let mut check_idx = prev_idx;
        while check_idx < prev_runs.len() && prev_runs[check_idx].start < search_end {
            let prev_run = &prev_runs[check_idx];
            if runs_connected(prev_run, run, connectivity) {
                match assigned_label {
                    Some(label) if label != prev_run.label => uf.union(label, prev_run.label),
                    None => assigned_label = Some(prev_run.label),
                    _ => {}
                }
            }
            check_idx += 1;
        }

        run.label = assigned_label.unwrap_or_else(|| uf.make_set());
    }
}

// ============================================================================
// LabelMap
// ============================================================================

/// Per-pixel component ids. `0` is background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Buffer2<u32>,
    num_labels: usize,
}

impl LabelMap {
    /// Labels the foreground pixels of `mask`.
    pub fn from_mask(mask: &BinaryMask, connectivity: Connectivity) -> Self {
        let width = mask.width();
        let height = mask.height();
        let mut labels = Buffer2::new_filled(width, height, 0u32);

        if width == 0 || height == 0 {
            return Self {
                labels,
                num_labels: 0,
            };
        }

        let mut uf = UnionFind::new();
        let mut prev_runs: Vec<Run> = Vec::with_capacity(width / 4);
        let mut curr_runs: Vec<Run> = Vec::with_capacity(width / 4);

        for y in 0..height {
            curr_runs.clear();
            extract_runs_from_row(mask.row(y), &mut curr_runs);

            if curr_runs.is_empty() {
                prev_runs.clear();
                continue;
            }

            merge_runs_with_prev(&mut curr_runs, &prev_runs, connectivity, &mut uf);

            let row = labels.row_mut(y);
            for run in &curr_runs {
                row[run.start as usize..run.end as usize].fill(run.label);
            }

            std::mem::swap(&mut prev_runs, &mut curr_runs);
        }

        let num_labels = uf.flatten_labels(labels.pixels_mut());
        tracing::debug!(
            "Labeled {} components in {}x{} mask ({:?} connectivity)",
            num_labels,
            width,
            height,
            connectivity
        );

        Self { labels, num_labels }
    }

    /// Wraps an existing label buffer. Ids must lie in `0..=num_labels`.
    pub fn from_raw(labels: Buffer2<u32>, num_labels: usize) -> Self {
        debug_assert!(labels.iter().all(|&l| l as usize <= num_labels));
        Self { labels, num_labels }
    }

    /// Number of components, excluding background.
    #[inline]
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.labels.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.labels.height()
    }

    #[inline]
    pub fn labels(&self) -> &[u32] {
        self.labels.pixels()
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer2<u32> {
        &self.labels
    }

    /// Zeroes labels at pixels where `keep` is false. Ids are not renumbered,
    /// so a component may end up empty or split into disconnected pieces.
    pub fn retain_where(&mut self, keep: &BinaryMask) {
        debug_assert!(self.labels.same_size(keep));
        for (label, &k) in self.labels.iter_mut().zip(keep.iter()) {
            if !k {
                *label = 0;
            }
        }
    }

    /// Removes every component with at least one pixel on the image border,
    /// then renumbers the survivors to `1..=n` preserving their order.
    pub fn clear_border(&mut self) {
        let width = self.width();
        let height = self.height();
        if width == 0 || height == 0 {
            return;
        }

        let mut touches = vec![false; self.num_labels + 1];
        let mut mark = |label: u32| touches[label as usize] = true;
        for x in 0..width {
            mark(self.labels[(x, 0)]);
            mark(self.labels[(x, height - 1)]);
        }
        for y in 0..height {
            mark(self.labels[(0, y)]);
            mark(self.labels[(width - 1, y)]);
        }

        let mut remap = vec![0u32; self.num_labels + 1];
        let mut next = 0u32;
        for label in 1..=self.num_labels {
            if !touches[label] {
                next += 1;
                remap[label] = next;
            }
        }

        let cleared = self.num_labels - next as usize;
        for label in self.labels.iter_mut() {
            *label = remap[*label as usize];
        }
        self.num_labels = next as usize;

        if cleared > 0 {
            tracing::debug!("Cleared {} border-touching components", cleared);
        }
    }
}

impl std::ops::Index<usize> for LabelMap {
    type Output = u32;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.labels[idx]
    }
}

impl std::ops::Index<(usize, usize)> for LabelMap {
    type Output = u32;

    #[inline]
    fn index(&self, xy: (usize, usize)) -> &Self::Output {
        &self.labels[xy]
    }
}

// ============================================================================
// Union-Find
// ============================================================================

#[derive(Debug)]
struct UnionFind {
    parent: Vec<u32>,
    next_label: u32,
}

impl UnionFind {
    fn new() -> Self {
        Self {
            parent: Vec::with_capacity(256),
            next_label: 1,
        }
    }

    #[inline]
    fn make_set(&mut self) -> u32 {
        let label = self.next_label;
        self.parent.push(label);
        self.next_label += 1;
        label
    }

    /// Find root with two-pass path compression.
    fn find(&mut self, label: u32) -> u32 {
        let mut root = label;
        loop {
            let parent = self.parent[(root - 1) as usize];
            if parent == root {
                break;
            }
            root = parent;
        }

        let mut current = label;
        while current != root {
            let idx = (current - 1) as usize;
            let parent = self.parent[idx];
            self.parent[idx] = root;
            current = parent;
        }

        root
    }

    /// The smaller label becomes the root, so every root is the first
    /// provisional label of its component in raster order.
    fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (smaller, larger) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[(larger - 1) as usize] = smaller;
        }
    }

    /// Rewrites provisional labels to sequential `1..=n`.
    fn flatten_labels(&mut self, labels: &mut [u32]) -> usize {
        if self.parent.is_empty() {
            return 0;
        }

        let len = self.parent.len();
        let mut label_map = vec![0u32; len + 1];
        let mut num_labels = 0u32;

        for i in 1..=len as u32 {
            let root = self.find(i);
            if label_map[root as usize] == 0 {
                num_labels += 1;
                label_map[root as usize] = num_labels;
            }
            label_map[i as usize] = label_map[root as usize];
        }

        for l in labels.iter_mut() {
            if *l != 0 {
                *l = label_map[*l as usize];
            }
        }

        num_labels as usize
    }
}
