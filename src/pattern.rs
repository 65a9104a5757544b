//! Reusable cell patterns.
//!
//! A pattern is a named 2-D byte schema, a stamp that worlds can place onto
//! their grid at a position.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::grid::Grid;
use crate::storage::Record;

/// A named, reusable cell stamp. The natural key is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Pattern name.
    pub name: String,
    /// The cell schema.
    pub schema: Grid,
}

impl Pattern {
    /// Builds a pattern after validating its name.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyKey`] when `name` is blank.
    pub fn new(name: &str, schema: Grid) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyKey { field: "name" });
        }
        Ok(Self {
            name: name.to_string(),
            schema,
        })
    }
}

impl Record for Pattern {
    fn key(&self) -> &str {
        &self.name
    }

    fn absorb(&mut self, other: Self) {
        self.schema = other.schema;
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pattern [name={}, {}x{}, alive={}]",
            self.name,
            self.schema.rows(),
            self.schema.cols(),
            self.schema.alive_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_the_key() {
        let schema = Grid::from_rows(&[&[1, 1], &[1, 1]]).unwrap();
        let p = Pattern::new(" Block ", schema).unwrap();
        assert_eq!(p.key(), "Block");

        assert!(Pattern::new("   ", Grid::new(1, 1).unwrap()).is_err());
    }

    #[test]
    fn display_is_a_single_line() {
        let p = Pattern::new("Block", Grid::from_rows(&[&[1, 1], &[1, 1]]).unwrap()).unwrap();
        let text = p.to_string();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("name=Block"));
        assert!(text.contains("alive=4"));
    }

    #[test]
    fn absorb_replaces_schema_only() {
        let mut p = Pattern::new("Block", Grid::from_rows(&[&[1, 1], &[1, 1]]).unwrap()).unwrap();
        let q = Pattern::new("Block", Grid::from_rows(&[&[0, 1], &[1, 0]]).unwrap()).unwrap();
        p.absorb(q.clone());
        assert_eq!(p.name, "Block");
        assert_eq!(p.schema, q.schema);
    }
}
