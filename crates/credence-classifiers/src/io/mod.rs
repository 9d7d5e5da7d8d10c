//! Readers for training data files.
pub mod german;

pub use german::{load_german_credit, parse_german_credit, NUM_COLUMNS};
