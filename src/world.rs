//! Simulation worlds.
//!
//! A world owns a fixed-size grid plus the record of which named patterns
//! were stamped where. The natural key is the world name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::grid::Grid;
use crate::pattern::Pattern;
use crate::storage::Record;

/// A named sub-pattern placed at a grid position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Name of the placed pattern.
    pub pattern: String,
    /// Top-left row of the placement.
    pub row: usize,
    /// Top-left column of the placement.
    pub col: usize,
}

/// A simulation world. The natural key is `name`; grid size is fixed per world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    /// World name.
    pub name: String,
    /// The cell grid.
    pub grid: Grid,
    /// Patterns stamped onto the grid, in placement order.
    pub placements: Vec<Placement>,
}

impl World {
    /// Builds a world after validating its name.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyKey`] when `name` is blank.
    pub fn new(name: &str, grid: Grid) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyKey { field: "name" });
        }
        Ok(Self {
            name: name.to_string(),
            grid,
            placements: Vec::new(),
        })
    }

    /// Stamps `pattern` onto the grid at `(row, col)` and records the placement.
    ///
    /// # Errors
    /// Returns [`ValidationError::PlacementOutOfBounds`] when the schema does
    /// not fit inside the grid at that position.
    pub fn place(&mut self, pattern: &Pattern, row: usize, col: usize) -> Result<(), ValidationError> {
        if !self.grid.fits(&pattern.schema, row, col) {
            return Err(ValidationError::PlacementOutOfBounds {
                pattern: pattern.name.clone(),
                row,
                col,
            });
        }
        self.grid.stamp(&pattern.schema, row, col);
        self.placements.push(Placement {
            pattern: pattern.name.clone(),
            row,
            col,
        });
        Ok(())
    }
}

impl Record for World {
    fn key(&self) -> &str {
        &self.name
    }

    fn absorb(&mut self, other: Self) {
        self.grid = other.grid;
        self.placements = other.placements;
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "World [name={}, {}x{}, alive={}, placements={}]",
            self.name,
            self.grid.rows(),
            self.grid.cols(),
            self.grid.alive_count(),
            self.placements.len()
        )
    }
}
