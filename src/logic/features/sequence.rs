//! Sequence reshaper: (n, W) → (n, W, 1)

use ndarray::{Array2, Array3};

use crate::logic::error::{IdsError, Result};

#[derive(Debug, Clone, Copy)]
pub struct SequenceReshaper {
    width: usize,
}

impl SequenceReshaper {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn reshape(&self, data: &Array2<f64>) -> Result<Array3<f64>> {
        if data.ncols() != self.width {
            return Err(IdsError::SchemaMismatch {
                expected: self.width,
                actual: data.ncols(),
            });
        }
        Ok(Array3::from_shape_fn((data.nrows(), self.width, 1), |(i, t, _)| data[[i, t]]))
    }

    pub fn reshape_row(&self, row: &[f64]) -> Result<Array3<f64>> {
        if row.len() != self.width {
            return Err(IdsError::SchemaMismatch {
                expected: self.width,
                actual: row.len(),
            });
        }
        Ok(Array3::from_shape_fn((1, self.width, 1), |(_, t, _)| row[t]))
    }
}
