//! 2-D cell matrix shared by worlds and patterns.
//!
//! A [`Grid`] is a fixed-size byte matrix where `0` is a dead cell and any
//! non-zero value is alive. The cellular-automaton transition rule itself is
//! out of scope here; the grid is pure data that worlds persist and patterns
//! stamp onto.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Fixed-size 2-D byte matrix of alive/dead cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl Grid {
    /// Creates an all-dead grid of the given shape.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidGridShape`] if either dimension is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self, ValidationError> {
        if rows == 0 || cols == 0 {
            return Err(ValidationError::InvalidGridShape { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        })
    }

    /// Builds a grid from row slices.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidGridShape`] for an empty or ragged input.
    pub fn from_rows(rows: &[&[u8]]) -> Result<Self, ValidationError> {
        let row_count = rows.len();
        let col_count = rows.first().map_or(0, |r| r.len());
        if row_count == 0 || col_count == 0 || rows.iter().any(|r| r.len() != col_count) {
            return Err(ValidationError::InvalidGridShape {
                rows: row_count,
                cols: col_count,
            });
        }

        let mut cells = Vec::with_capacity(row_count * col_count);
        for row in rows {
            cells.extend_from_slice(row);
        }
        Ok(Self {
            rows: row_count,
            cols: col_count,
            cells,
        })
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Cell value at `(row, col)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    /// Sets the cell at `(row, col)`. Returns false when out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: u8) -> bool {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col] = value;
            true
        } else {
            false
        }
    }

    /// Number of live cells.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// True if `other` fits entirely inside this grid when its top-left
    /// corner is placed at `(row, col)`.
    #[must_use]
    pub fn fits(&self, other: &Self, row: usize, col: usize) -> bool {
        row.checked_add(other.rows).is_some_and(|end| end <= self.rows)
            && col.checked_add(other.cols).is_some_and(|end| end <= self.cols)
    }

    /// Copies `other` onto this grid with its top-left corner at `(row, col)`.
    ///
    /// The caller must have checked [`Grid::fits`]; out-of-range cells are
    /// silently skipped otherwise.
    pub fn stamp(&mut self, other: &Self, row: usize, col: usize) {
        for r in 0..other.rows {
            for c in 0..other.cols {
                if let Some(v) = other.get(r, c) {
                    self.set(row + r, col + c, v);
                }
            }
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            for c in 0..self.cols {
                let ch = if self.get(r, c).unwrap_or(0) == 0 { '.' } else { '#' };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
