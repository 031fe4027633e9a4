//! Dense elevation matrix assembly.

use serde::Serialize;
use std::ops::Index;
use terraslope_dem::{is_plausible_elevation, GridElevation};

/// Dense `rows × cols` elevation grid addressed `[row][col]`.
///
/// Cells without a resolved elevation are `None`. Serializes as nested arrays
/// with `null` holes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ElevationMatrix {
    cells: Vec<Vec<Option<f64>>>,
}

/// One matrix cell with its elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixCell {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
    /// Elevation in meters.
    pub elevation: f64,
}

impl ElevationMatrix {
    /// Matrix of the given shape with every cell `None`.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![vec![None; cols]; rows],
        }
    }

    /// Wrap nested rows. All rows must have the same length.
    pub fn from_rows(cells: Vec<Vec<Option<f64>>>) -> Self {
        debug_assert!(
            cells.windows(2).all(|w| w[0].len() == w[1].len()),
            "ragged elevation matrix"
        );
        Self { cells }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// Elevation at a cell; `None` for holes and out-of-bounds indices.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row)?.get(col).copied().flatten()
    }

    /// Elevation at a signed cell index.
    pub fn get_signed(&self, row: i64, col: i64) -> Option<f64> {
        if row < 0 || col < 0 {
            return None;
        }
        self.get(row as usize, col as usize)
    }

    /// The rows as nested vectors.
    pub fn as_rows(&self) -> &[Vec<Option<f64>>] {
        &self.cells
    }

    /// Iterate over every resolved cell in row-major order.
    pub fn resolved(&self) -> impl Iterator<Item = MatrixCell> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, e)| {
                e.map(|elevation| MatrixCell { row, col, elevation })
            })
        })
    }

    /// Number of resolved cells.
    pub fn resolved_count(&self) -> usize {
        self.resolved().count()
    }

    /// Highest and lowest plausible cells, first occurrence winning ties.
    pub fn extremes(&self) -> Option<(MatrixCell, MatrixCell)> {
        let mut plausible = self.resolved().filter(|c| is_plausible_elevation(c.elevation));
        let first = plausible.next()?;
        Some(plausible.fold((first, first), |(high, low), cell| {
            (
                if cell.elevation > high.elevation { cell } else { high },
                if cell.elevation < low.elevation { cell } else { low },
            )
        }))
    }
}

impl Index<usize> for ElevationMatrix {
    type Output = [Option<f64>];

    fn index(&self, row: usize) -> &Self::Output {
        &self.cells[row]
    }
}

/// Scatter resolved grid points into a dense matrix.
///
/// Every entry must target a distinct in-bounds cell. Violations panic in
/// debug builds; out-of-bounds entries are skipped otherwise.
pub fn build_matrix(elevations: &[GridElevation], rows: usize, cols: usize) -> ElevationMatrix {
    let mut matrix = ElevationMatrix::empty(rows, cols);
    let mut seen = vec![false; rows * cols];

    for entry in elevations {
        let (row, col) = (entry.point.row as usize, entry.point.col as usize);
        debug_assert!(
            row < rows && col < cols,
            "cell ({}, {}) outside {}x{} matrix",
            row,
            col,
            rows,
            cols
        );
        if row >= rows || col >= cols {
            continue;
        }

        let idx = row * cols + col;
        debug_assert!(!seen[idx], "duplicate entry for cell ({}, {})", row, col);
        seen[idx] = true;

        if let Some(elevation) = entry.elevation {
            matrix.cells[row][col] = Some(elevation);
        }
    }

    matrix
}
