//! Dense row-major feature matrix used throughout the crate.
//!
//! Only row access is needed: tree splits, nearest-neighbour search and
//! encoding all walk whole rows.
pub mod matrix;

pub use matrix::{Array2, ShapeError};

/// Squared Euclidean distance between two equally sized rows.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
