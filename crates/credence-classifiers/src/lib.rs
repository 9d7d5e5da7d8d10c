//! credence-classifiers: credit-worthiness classification on the German
//! Credit dataset.
//!
//! Training is an offline batch job ([`trainer::train`]) that loads the
//! whitespace-delimited data file, splits it, balances the training
//! partition with SMOTE, fits a class-weighted random forest, gates on
//! held-out accuracy and golden fixtures, and produces a [`ModelArtifact`].
//! Serving goes through [`CreditScorer`], which loads an artifact once and
//! answers `predict` from any number of threads.
pub mod artifact;
pub mod balance;
pub mod config;
pub mod data_handling;
pub mod encoder;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod schema;
pub mod scorer;
pub mod stats;
pub mod trainer;

pub use artifact::ModelArtifact;
pub use config::TrainingConfig;
pub use error::{CreditError, Result};
pub use schema::{ApplicantRecord, Decision};
pub use scorer::{CreditScorer, Prediction};
pub use trainer::{train, TrainingOutcome};
