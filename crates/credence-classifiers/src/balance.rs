//! Synthetic minority oversampling (SMOTE) for the training partition.
//!
//! Each synthetic sample lies on the segment between a randomly picked
//! minority sample and one of its `k` nearest minority neighbours. Samples
//! are generated until both classes have the same count.
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data_handling::class_counts;
use crate::error::{CreditError, Result};
use crate::math::{squared_distance, Array2};
use crate::schema::LabelCodec;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoteConfig {
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Default for SmoteConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Smote {
    config: SmoteConfig,
}

impl Smote {
    pub fn new(config: SmoteConfig) -> Self {
        Self { config }
    }

    /// Return a balanced copy of `(x, y)`. Original rows come first, in their
    /// original order, followed by the synthetic minority rows.
    pub fn fit_resample(&self, x: &Array2<f64>, y: &[u8]) -> Result<(Array2<f64>, Vec<u8>)> {
        if x.nrows() != y.len() {
            return Err(CreditError::InvalidConfig(format!(
                "feature rows ({}) and labels ({}) differ in length",
                x.nrows(),
                y.len()
            )));
        }
        if self.config.k_neighbors == 0 {
            return Err(CreditError::InvalidConfig(
                "k_neighbors must be at least 1".to_string(),
            ));
        }

        let (bad, good) = class_counts(y);
        if bad == 0 || good == 0 {
            return Err(CreditError::InsufficientData(format!(
                "oversampling needs both classes, got {} good and {} bad",
                good, bad
            )));
        }

        let mut x_out = x.clone();
        let mut y_out = y.to_vec();
        if bad == good {
            log::debug!("Classes already balanced ({} each); no oversampling", good);
            return Ok((x_out, y_out));
        }

        let (minority, n_synthetic) = if bad < good {
            (LabelCodec::BAD_CLASS, good - bad)
        } else {
            (LabelCodec::GOOD_CLASS, bad - good)
        };
        let members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == minority).collect();
        let minority_x = x.select_rows(&members);
        let k = self.config.k_neighbors.min(members.len() - 1);

        log::debug!(
            "SMOTE: minority class {} has {} samples, generating {} with k = {}",
            minority,
            members.len(),
            n_synthetic,
            k
        );

        let neighbours = nearest_neighbours(&minority_x, k);
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut synthetic = vec![0.0f64; x.ncols()];

        for _ in 0..n_synthetic {
            let base = rng.gen_range(0..minority_x.nrows());
            let origin = minority_x.row_slice(base);
            if k == 0 {
                synthetic.copy_from_slice(origin);
            } else {
                let neighbour = neighbours[base][rng.gen_range(0..k)];
                let target = minority_x.row_slice(neighbour);
                let gap: f64 = rng.gen();
                for (out, (a, b)) in synthetic.iter_mut().zip(origin.iter().zip(target.iter())) {
                    *out = a + gap * (b - a);
                }
            }
            x_out
                .push_row(&synthetic)
                .map_err(|e| CreditError::InvalidConfig(e.to_string()))?;
            y_out.push(minority);
        }

        Ok((x_out, y_out))
    }
}

/// For every row, the indices of its `k` nearest other rows (ascending
/// distance, ties broken by index).
fn nearest_neighbours(x: &Array2<f64>, k: usize) -> Vec<Vec<usize>> {
    let n = x.nrows();
    (0..n)
        .map(|i| {
            let row = x.row_slice(i);
            let mut dists: Vec<(f64, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (squared_distance(row, x.row_slice(j)), j))
                .collect();
            dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            dists.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced() -> (Array2<f64>, Vec<u8>) {
        let mut x = Array2::with_columns(2);
        let mut y = Vec::new();
        for i in 0..12 {
            x.push_row(&[i as f64, (i % 3) as f64]).unwrap();
            y.push(1);
        }
        for i in 0..4 {
            x.push_row(&[100.0 + i as f64, 50.0]).unwrap();
            y.push(0);
        }
        (x, y)
    }

    #[test]
    fn resampled_classes_are_equal() {
        let (x, y) = imbalanced();
        let (xr, yr) = Smote::new(SmoteConfig::default()).fit_resample(&x, &y).unwrap();
        assert_eq!(class_counts(&yr), (12, 12));
        assert_eq!(xr.nrows(), 24);
        // originals untouched and first
        assert_eq!(xr.select_rows(&(0..16).collect::<Vec<_>>()), x);
    }

    #[test]
    fn synthetic_rows_lie_between_minority_samples() {
        let (x, y) = imbalanced();
        let (xr, _) = Smote::new(SmoteConfig::default()).fit_resample(&x, &y).unwrap();
        for r in 16..xr.nrows() {
            let row = xr.row_slice(r);
            assert!(row[0] >= 100.0 && row[0] <= 103.0, "row {:?}", row);
            assert_eq!(row[1], 50.0);
        }
    }

    #[test]
    fn same_seed_same_output() {
        let (x, y) = imbalanced();
        let smote = Smote::new(SmoteConfig { k_neighbors: 3, seed: 9 });
        assert_eq!(smote.fit_resample(&x, &y).unwrap(), smote.fit_resample(&x, &y).unwrap());
    }

    #[test]
    fn single_minority_sample_is_duplicated() {
        let mut x = Array2::with_columns(1);
        x.push_row(&[1.0]).unwrap();
        x.push_row(&[2.0]).unwrap();
        x.push_row(&[9.0]).unwrap();
        let y = vec![1, 1, 0];
        let (xr, yr) = Smote::new(SmoteConfig::default()).fit_resample(&x, &y).unwrap();
        assert_eq!(yr, vec![1, 1, 0, 0]);
        assert_eq!(xr.row_slice(3), &[9.0]);
    }

    #[test]
    fn missing_class_is_insufficient() {
        let mut x = Array2::with_columns(1);
        x.push_row(&[1.0]).unwrap();
        let y = vec![1];
        assert!(matches!(
            Smote::new(SmoteConfig::default()).fit_resample(&x, &y),
            Err(CreditError::InsufficientData(_))
        ));
    }
}
