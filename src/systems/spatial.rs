/// Uniform grid over the square world. Rebuilt every tick; turns the
/// all-pairs contact check into a 3x3 neighbourhood scan per entity.
pub struct SpatialGrid {
    cell_size: f32,
    pub cols: usize,
    pub rows: usize,
    /// Flat array of cells holding indices into the caller's entity slice.
    cells: Vec<Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(world_size: f32, cell_size: f32) -> Self {
        let cols = (world_size / cell_size).ceil().max(1.0) as usize;
        Self {
            cell_size,
            cols,
            rows: cols,
            cells: vec![Vec::new(); cols * cols],
        }
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    pub fn insert(&mut self, index: usize, x: f32, y: f32) {
        let (col, row) = self.cell_coords(x, y);
        self.cells[row * self.cols + col].push(index);
    }

    pub fn rebuild(&mut self, positions: &[(f32, f32)]) {
        self.clear();
        for (index, &(x, y)) in positions.iter().enumerate() {
            self.insert(index, x, y);
        }
    }

    /// Indices in the cell containing `(x, y)` and its 8 neighbours.
    pub fn query_neighborhood(&self, x: f32, y: f32) -> Vec<usize> {
        let (cx, cy) = self.cell_coords(x, y);
        let mut results = Vec::new();
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let col = cx as i64 + dx;
                let row = cy as i64 + dy;
                if col < 0 || row < 0 || col >= self.cols as i64 || row >= self.rows as i64 {
                    continue;
                }
                results.extend_from_slice(&self.cells[row as usize * self.cols + col as usize]);
            }
        }
        results
    }

    /// Every unordered pair sharing a neighbourhood, once, as `(lo, hi)`
    /// sorted ascending. Must be called after [`SpatialGrid::rebuild`] with
    /// the same positions.
    pub fn candidate_pairs(&self, positions: &[(f32, f32)]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (index, &(x, y)) in positions.iter().enumerate() {
            for other in self.query_neighborhood(x, y) {
                if other > index {
                    pairs.push((index, other));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn cell_coords(&self, x: f32, y: f32) -> (usize, usize) {
        let clamp = |value: f32, len: usize| {
            if value.is_nan() {
                return 0;
            }
            ((value / self.cell_size).floor().max(0.0) as usize).min(len - 1)
        };
        (clamp(x, self.cols), clamp(y, self.rows))
    }
}
