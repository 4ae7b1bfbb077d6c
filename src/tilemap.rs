use rayon::prelude::*;

/// A 2D row-major grid with its origin at the top-left corner.
///
/// Unlike a planet map the grid does not wrap: neighbourhood reads past an
/// edge are clamped to the nearest border cell, matching how image filters
/// extend their input.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Fill the entire map with a value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> Tilemap<T> {
    /// Build a grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Build a grid by evaluating `f(x, y)` for every cell on the rayon pool.
    /// `f` only ever sees read-only captures, so every cell is independent.
    pub fn par_from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        T: Send,
        F: Fn(usize, usize) -> T + Sync + Send,
    {
        let data: Vec<T> = (0..width * height)
            .into_par_iter()
            .map(|idx| f(idx % width, idx / width))
            .collect();
        Self { width, height, data }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "({}, {}) outside {}x{}", x, y, self.width, self.height);
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Read a cell with signed coordinates, clamping to the nearest edge.
    pub fn get_clamped(&self, x: isize, y: isize) -> &T {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.get(cx, cy)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn same_size<U>(&self, other: &Tilemap<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Panic unless `other` covers exactly the same cells.
    ///
    /// Grids derived from one source image must always agree in size; a
    /// mismatch is a programming error, never something to crop or pad.
    pub fn assert_same_size<U>(&self, other: &Tilemap<U>, what: &str) {
        assert!(
            self.same_size(other),
            "dimension mismatch in {}: {}x{} vs {}x{}",
            what,
            self.width,
            self.height,
            other.width,
            other.height
        );
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| (idx % width, idx / width, val))
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| (idx % width, idx / width, val))
    }

    /// Apply `f` to every cell, producing a new grid of the same size.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Tilemap<U> {
        Tilemap {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl Tilemap<f32> {
    /// Minimum and maximum over the cells selected by `include`.
    /// Returns `None` when no cell is selected.
    pub fn range_where<F>(&self, include: F) -> Option<(f32, f32)>
    where
        F: Fn(usize) -> bool + Sync,
    {
        self.data
            .par_iter()
            .enumerate()
            .filter(|(idx, _)| include(*idx))
            .fold(
                || None,
                |acc: Option<(f32, f32)>, (_, &v)| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                },
            )
            .reduce(
                || None,
                |a, b| match (a, b) {
                    (None, r) | (r, None) => r,
                    (Some((alo, ahi)), Some((blo, bhi))) => Some((alo.min(blo), ahi.max(bhi))),
                },
            )
    }

    /// Minimum and maximum over every cell.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.range_where(|_| true)
    }

    /// Mean over every cell, 0.0 for an empty grid.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.data.par_iter().map(|&v| v as f64).sum();
        (sum / self.data.len() as f64) as f32
    }
}
