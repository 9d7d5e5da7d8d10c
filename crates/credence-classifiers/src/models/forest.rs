use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ClassWeight, ForestConfig};
use crate::data_handling::class_counts;
use crate::error::{CreditError, Result};
use crate::math::Array2;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::tree::{DecisionTree, TreeParams};
use crate::schema::LabelCodec;

/// Bagged ensemble of randomized CART trees.
///
/// Each tree gets its own seed drawn from the forest seed before any tree is
/// grown, so fitting in parallel gives the same forest as fitting serially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    classes: Vec<u8>,
    n_features: usize,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        RandomForest {
            config,
            classes: LabelCodec::CLASSES.to_vec(),
            n_features: 0,
            trees: Vec::new(),
            importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Check a deserialised forest for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(CreditError::ArtifactMismatch(
                "classifier has no trees".to_string(),
            ));
        }
        if self.classes != LabelCodec::CLASSES {
            return Err(CreditError::ArtifactMismatch(format!(
                "classifier classes {:?} differ from the pinned codes {:?}",
                self.classes,
                LabelCodec::CLASSES
            )));
        }
        if self.importances.len() != self.n_features {
            return Err(CreditError::ArtifactMismatch(format!(
                "{} importances for {} features",
                self.importances.len(),
                self.n_features
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_features() != self.n_features || !tree.is_well_formed() {
                return Err(CreditError::ArtifactMismatch(format!(
                    "tree {} is malformed",
                    i
                )));
            }
        }
        Ok(())
    }

    fn check_row(&self, row: &[f64]) -> Result<()> {
        if !self.is_fitted() {
            return Err(CreditError::ModelNotLoaded);
        }
        if row.len() != self.n_features {
            return Err(CreditError::SchemaMismatch(format!(
                "classifier expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        Ok(())
    }

    fn sample_class_weights(&self, y: &[u8]) -> [f64; 2] {
        match self.config.class_weight {
            ClassWeight::None => [1.0, 1.0],
            ClassWeight::Balanced => {
                let (bad, good) = class_counts(y);
                let n = y.len() as f64;
                [n / (2.0 * bad as f64), n / (2.0 * good as f64)]
            }
        }
    }
}

impl ClassifierModel for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(CreditError::InvalidConfig(format!(
                "feature rows ({}) and labels ({}) differ in length",
                x.nrows(),
                y.len()
            )));
        }
        if self.config.n_trees == 0 {
            return Err(CreditError::InvalidConfig(
                "n_trees must be at least 1".to_string(),
            ));
        }
        if let Some(bad) = y.iter().find(|&&c| !LabelCodec::CLASSES.contains(&c)) {
            return Err(CreditError::UnknownClassCode(*bad));
        }
        let (bad, good) = class_counts(y);
        if bad == 0 || good == 0 {
            return Err(CreditError::InsufficientData(format!(
                "forest needs both classes, got {} good and {} bad",
                good, bad
            )));
        }

        let n = x.nrows();
        let class_w = self.sample_class_weights(y);
        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split.max(2),
            min_samples_leaf: self.config.min_samples_leaf.max(1),
            max_features: self.config.max_features.resolve(x.ncols()),
        };
        let bootstrap = self.config.bootstrap;

        let mut seeder = StdRng::seed_from_u64(self.config.seed);
        let seeds: Vec<u64> = (0..self.config.n_trees).map(|_| seeder.gen()).collect();

        log::debug!(
            "Fitting {} trees on {} rows (max_features = {}, class weights = {:?})",
            seeds.len(),
            n,
            params.max_features,
            class_w
        );

        let fitted: Vec<(DecisionTree, Vec<f64>)> = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut weights = vec![0.0f64; n];
                if bootstrap {
                    for _ in 0..n {
                        weights[rng.gen_range(0..n)] += 1.0;
                    }
                } else {
                    weights.iter_mut().for_each(|w| *w = 1.0);
                }
                for (w, &c) in weights.iter_mut().zip(y.iter()) {
                    *w *= class_w[c as usize];
                }
                DecisionTree::fit(x, y, &weights, params, &mut rng)
            })
            .collect();

        let mut importances = vec![0.0f64; x.ncols()];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, raw) in fitted {
            let total: f64 = raw.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(raw.iter()) {
                    *acc += v / total;
                }
            }
            trees.push(tree);
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            importances.iter_mut().for_each(|v| *v /= sum);
        }

        self.n_features = x.ncols();
        self.trees = trees;
        self.importances = importances;
        Ok(())
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_row(row)?;
        let mut acc = [0.0f64; 2];
        for tree in &self.trees {
            let d = tree.leaf_distribution(row);
            acc[0] += d[0];
            acc[1] += d[1];
        }
        let n = self.trees.len() as f64;
        Ok(vec![acc[0] / n, acc[1] / n])
    }

    fn classes(&self) -> &[u8] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Array2<f64>, Vec<u8>) {
        let mut x = Array2::with_columns(3);
        let mut y = Vec::new();
        for i in 0..40 {
            let jitter = (i % 7) as f64 * 0.1;
            // feature 2 is noise shared by both classes
            x.push_row(&[1.0 + jitter, 5.0 - jitter, (i % 5) as f64]).unwrap();
            y.push(1);
            if i % 2 == 0 {
                x.push_row(&[-1.0 - jitter, 8.0 + jitter, (i % 5) as f64]).unwrap();
                y.push(0);
            }
        }
        (x, y)
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 15,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn forest_separates_blobs() {
        let (x, y) = two_blobs();
        let mut forest = RandomForest::new(small_config());
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.n_trees(), 15);
        assert_eq!(forest.predict(&[1.2, 4.9, 0.0]).unwrap(), 1);
        assert_eq!(forest.predict(&[-1.3, 8.1, 3.0]).unwrap(), 0);
        let proba = forest.predict_proba(&[1.2, 4.9, 0.0]).unwrap();
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-9);
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn fitting_is_reproducible() {
        let (x, y) = two_blobs();
        let mut a = RandomForest::new(small_config());
        let mut b = RandomForest::new(small_config());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn importances_are_normalised_and_favour_signal() {
        let (x, y) = two_blobs();
        let mut forest = RandomForest::new(small_config());
        forest.fit(&x, &y).unwrap();
        let imp = forest.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[2] < imp[0] + imp[1]);
    }

    #[test]
    fn wrong_row_width_is_schema_mismatch() {
        let (x, y) = two_blobs();
        let mut forest = RandomForest::new(small_config());
        forest.fit(&x, &y).unwrap();
        assert!(matches!(
            forest.predict_proba(&[1.0, 2.0]),
            Err(CreditError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn unfitted_forest_reports_not_loaded() {
        let forest = RandomForest::new(small_config());
        assert!(matches!(
            forest.predict(&[0.0, 0.0, 0.0]),
            Err(CreditError::ModelNotLoaded)
        ));
    }

    #[test]
    fn single_class_is_rejected() {
        let x = Array2::from_shape_vec((2, 1), vec![0.0, 1.0]).unwrap();
        let mut forest = RandomForest::new(small_config());
        assert!(matches!(
            forest.fit(&x, &[1, 1]),
            Err(CreditError::InsufficientData(_))
        ));
    }
}
