//! Fixed-shape resource grids
//!
//! A [`TimeSeries`] holds one value per resource dimension per future time
//! offset: rows are resource dimensions, columns are offsets, and column 0
//! is "now". Node capacity and job demand share this representation.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Amount of resource per dimension, per future offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    values: Array2<f64>,
}

impl TimeSeries {
    /// Grid of `resource_dims x horizon` zeros
    pub fn zeros(resource_dims: usize, horizon: usize) -> Self {
        TimeSeries {
            values: Array2::zeros((resource_dims, horizon)),
        }
    }

    /// Grid where row `r` holds `levels[r]` at every offset
    pub fn filled(levels: &[f64], horizon: usize) -> Self {
        TimeSeries {
            values: Array2::from_shape_fn((levels.len(), horizon), |(r, _)| levels[r]),
        }
    }

    /// Build from one row per resource dimension.
    ///
    /// Rows shorter than `horizon` are zero-padded; longer rows, ragged
    /// input, and negative or non-finite values are rejected.
    pub fn from_rows(rows: &[Vec<f64>], horizon: usize) -> Result<Self> {
        let mut values = Array2::zeros((rows.len(), horizon));
        for (r, row) in rows.iter().enumerate() {
            if row.len() > horizon {
                return Err(ClusterError::shape(
                    format!("row {r} longer than horizon"),
                    &[horizon],
                    &[row.len()],
                ));
            }
            for (t, &v) in row.iter().enumerate() {
                if !v.is_finite() || v < 0.0 {
                    return Err(ClusterError::value(format!("cell [{r}][{t}]"), v));
                }
                values[[r, t]] = v;
            }
        }
        Ok(TimeSeries { values })
    }

    pub fn resource_dims(&self) -> usize {
        self.values.nrows()
    }

    pub fn horizon(&self) -> usize {
        self.values.ncols()
    }

    /// `(resource_dims, horizon)`
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn get(&self, resource: usize, offset: usize) -> f64 {
        self.values[[resource, offset]]
    }

    /// Read-only access to the underlying array
    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    /// Row for one resource dimension, as an owned vector
    pub fn row(&self, resource: usize) -> Vec<f64> {
        self.values.row(resource).to_vec()
    }

    /// Number of columns up to and including the last non-zero one.
    ///
    /// Demand is zero-padded beyond a job's footprint, so this is its duration.
    pub fn trailing_extent(&self) -> usize {
        (0..self.horizon())
            .rev()
            .find(|&t| self.values.column(t).iter().any(|&v| v != 0.0))
            .map_or(0, |t| t + 1)
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// First cell in `[0, window)` where `self < other`, if any.
    ///
    /// Returns `(resource, offset)`. Both grids must share a shape.
    pub fn first_shortfall(&self, other: &TimeSeries, window: usize) -> Option<(usize, usize)> {
        let window = window.min(self.horizon()).min(other.horizon());
        for r in 0..self.resource_dims() {
            for t in 0..window {
                if self.values[[r, t]] < other.values[[r, t]] {
                    return Some((r, t));
                }
            }
        }
        None
    }

    /// Subtract `other` cell-wise over offsets `[0, window)`
    pub fn subtract_window(&mut self, other: &TimeSeries, window: usize) {
        let window = window.min(self.horizon()).min(other.horizon());
        for r in 0..self.resource_dims() {
            for t in 0..window {
                self.values[[r, t]] -= other.values[[r, t]];
            }
        }
    }

    /// Drop offset 0, shift every column one step earlier, and write
    /// `fill[r]` into the farthest offset of row `r`.
    pub fn roll_forward(&mut self, fill: &[f64]) {
        let horizon = self.horizon();
        if horizon == 0 {
            return;
        }
        for (mut row, &level) in self.values.rows_mut().into_iter().zip(fill) {
            for t in 1..horizon {
                row[t - 1] = row[t];
            }
            row[horizon - 1] = level;
        }
    }
}
