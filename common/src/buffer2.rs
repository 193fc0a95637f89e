use std::ops::{Index, IndexMut};
use std::slice;

/// Error raised when a 2D grid cannot be built from the supplied data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("pixel count {actual} does not match {width}x{height}")]
    LengthMismatch {
        width: usize,
        height: usize,
        actual: usize,
    },
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("crop {x}+{width}, {y}+{height} exceeds {grid_width}x{grid_height}")]
    CropOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        grid_width: usize,
        grid_height: usize,
    },
}

/// Row-major 2D grid. Pixels are addressed as `(x, y)` = `(col, row)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer2<T> {
    pixels: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2<T> {
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn try_new(width: usize, height: usize, pixels: Vec<T>) -> Result<Self, ShapeError> {
        if pixels.len() != width * height {
            return Err(ShapeError::LengthMismatch {
                width,
                height,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// Builds a grid from nested rows. All rows must have the same length.
    pub fn from_rows<R>(rows: &[R]) -> Result<Self, ShapeError>
    where
        R: AsRef<[T]>,
        T: Clone,
    {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let mut pixels = Vec::with_capacity(width * height);

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(ShapeError::RaggedRow {
                    row: y,
                    expected: width,
                    actual: row.len(),
                });
            }
            pixels.extend_from_slice(row);
        }

        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        debug_assert!(x < self.width && y < self.height);
        &self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        debug_assert!(x < self.width && y < self.height);
        &mut self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn same_size<U>(&self, other: &Buffer2<U>) -> bool {
        self.width == other.width() && self.height == other.height()
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.width;
        &mut self.pixels[start..start + self.width]
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.pixels
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.pixels.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.pixels.iter_mut()
    }

    /// Iterates `(x, y, &value)` in raster order.
    pub fn enumerate_pixels(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width.max(1);
        self.pixels
            .iter()
            .enumerate()
            .map(move |(i, v)| (i % width, i / width, v))
    }

    /// Applies `f` to every pixel, producing a grid of the same size.
    pub fn map<U, F>(&self, f: F) -> Buffer2<U>
    where
        F: FnMut(&T) -> U,
    {
        Buffer2 {
            pixels: self.pixels.iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Combines two grids of identical size pixel by pixel.
    pub fn zip_map<U, V, F>(&self, other: &Buffer2<U>, mut f: F) -> Result<Buffer2<V>, ShapeError>
    where
        F: FnMut(&T, &U) -> V,
    {
        if !self.same_size(other) {
            return Err(ShapeError::LengthMismatch {
                width: self.width,
                height: self.height,
                actual: other.len(),
            });
        }
        Ok(Buffer2 {
            pixels: self
                .pixels
                .iter()
                .zip(other.pixels())
                .map(|(a, b)| f(a, b))
                .collect(),
            width: self.width,
            height: self.height,
        })
    }

    /// Number of pixels for which `predicate` holds.
    pub fn count_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        self.pixels.iter().filter(|v| predicate(v)).count()
    }
}

impl<T: Clone> Buffer2<T> {
    pub fn new_filled(width: usize, height: usize, value: T) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.pixels.fill(value);
    }

    /// Copies the `width x height` window starting at column `x`, row `y`.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> Result<Self, ShapeError> {
        if x + width > self.width || y + height > self.height {
            return Err(ShapeError::CropOutOfBounds {
                x,
                y,
                width,
                height,
                grid_width: self.width,
                grid_height: self.height,
            });
        }

        let mut pixels = Vec::with_capacity(width * height);
        for row in y..y + height {
            let start = row * self.width + x;
            pixels.extend_from_slice(&self.pixels[start..start + width]);
        }

        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// Returns a copy surrounded by `pad` pixels of `value` on every side.
    pub fn padded(&self, pad: usize, value: T) -> Self {
        let width = self.width + 2 * pad;
        let height = self.height + 2 * pad;
        let mut out = Self::new_filled(width, height, value);
        for y in 0..self.height {
            let dst = (y + pad) * width + pad;
            out.pixels[dst..dst + self.width].clone_from_slice(self.row(y));
        }
        out
    }
}

impl<T: Default + Clone> Buffer2<T> {
    pub fn new_default(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![T::default(); width * height],
            width,
            height,
        }
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

impl<T> Index<usize> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.pixels[idx]
    }
}

impl<T> IndexMut<usize> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.pixels[idx]
    }
}
