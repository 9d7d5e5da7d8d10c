//! Labelled datasets and the seeded train/test split.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::encoder::CategoryTable;
use crate::error::{CreditError, Result};
use crate::math::Array2;
use crate::schema::LabelCodec;

/// Encoded features and class codes for every row of a data file.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    /// Class codes, see [`LabelCodec`].
    pub y: Vec<u8>,
    pub feature_names: Vec<String>,
    pub categories: CategoryTable,
}

/// Count of (bad, good) class codes.
pub fn class_counts(y: &[u8]) -> (usize, usize) {
    let good = y.iter().filter(|&&c| c == LabelCodec::GOOD_CLASS).count();
    (y.len() - good, good)
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn log_input_data_summary(&self) {
        let (bad, good) = class_counts(&self.y);
        log::info!("----- Input Data Summary -----");
        log::info!("{} applicants: {} good and {} bad", self.len(), good, bad);
        log::info!(
            "{} features, {} categorical columns encoded",
            self.x.ncols(),
            self.categories.columns.len()
        );
        log::info!("-------------------------------");
    }

    /// Shuffle with `seed` and hold out `ceil(n * test_size)` rows.
    ///
    /// With `stratify` the hold-out is drawn per class so both partitions keep
    /// the dataset's class ratio.
    pub fn train_test_split(
        &self,
        test_size: f64,
        seed: u64,
        stratify: bool,
    ) -> Result<TrainingSplit> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(CreditError::InvalidConfig(format!(
                "test_size must be in (0, 1), got {}",
                test_size
            )));
        }
        let n = self.len();
        if n < 2 {
            return Err(CreditError::InsufficientData(format!(
                "need at least 2 rows to split, got {}",
                n
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let (train_idx, test_idx) = if stratify {
            let mut train = Vec::new();
            let mut test = Vec::new();
            for class in LabelCodec::CLASSES {
                let mut members: Vec<usize> = (0..n).filter(|&i| self.y[i] == class).collect();
                members.shuffle(&mut rng);
                let n_test = (members.len() as f64 * test_size).round() as usize;
                test.extend_from_slice(&members[..n_test]);
                train.extend_from_slice(&members[n_test..]);
            }
            (train, test)
        } else {
            let mut indices: Vec<usize> = (0..n).collect();
            indices.shuffle(&mut rng);
            let n_test = ((n as f64 * test_size).ceil() as usize).min(n - 1);
            let train = indices.split_off(n_test);
            (train, indices)
        };

        Ok(TrainingSplit {
            x_train: self.x.select_rows(&train_idx),
            y_train: train_idx.iter().map(|&i| self.y[i]).collect(),
            x_test: self.x.select_rows(&test_idx),
            y_test: test_idx.iter().map(|&i| self.y[i]).collect(),
        })
    }
}

/// Train and held-out partitions. Only `x_train`/`y_train` are ever
/// resampled.
#[derive(Debug, Clone)]
pub struct TrainingSplit {
    pub x_train: Array2<f64>,
    pub y_train: Vec<u8>,
    pub x_test: Array2<f64>,
    pub y_test: Vec<u8>,
}

impl TrainingSplit {
    /// Both classes must be present in the train partition and the test
    /// partition must not be empty.
    pub fn check_sufficient(&self) -> Result<()> {
        let (bad, good) = class_counts(&self.y_train);
        if bad == 0 || good == 0 {
            return Err(CreditError::InsufficientData(format!(
                "train split has {} good and {} bad samples; both classes are required",
                good, bad
            )));
        }
        if self.y_test.is_empty() {
            return Err(CreditError::InsufficientData(
                "test split is empty".to_string(),
            ));
        }
        Ok(())
    }
}
