use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::balance::SmoteConfig;
use crate::schema::Decision;

/// How many features each split may look at.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
    Fixed(usize),
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve against the number of features; always at least 1.
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fixed(k) => k,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
        };
        n.clamp(1, n_features.max(1))
    }
}

/// Per-class sample weighting applied on top of the bootstrap counts.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    None,
    /// `n_samples / (n_classes * n_samples_in_class)`, computed on the set the
    /// forest is fitted on.
    Balanced,
}

impl FromStr for ClassWeight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ClassWeight::None),
            "balanced" => Ok(ClassWeight::Balanced),
            _ => Err(format!("Unknown class weight: {}. Use 'none' or 'balanced'", s)),
        }
    }
}

/// Random forest hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        }
    }
}

/// An applicant whose decision is checked at training time and replayed
/// when the artifact is loaded.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FixtureSpec {
    pub name: String,
    pub features: Vec<i64>,
    /// When set, training fails unless the model agrees.
    pub expected: Option<Decision>,
}

pub fn default_fixtures() -> Vec<FixtureSpec> {
    vec![
        FixtureSpec {
            name: "worked_example_good_customer".to_string(),
            features: vec![2, 24, 1, 3, 1500, 4, 3, 4, 2, 0, 3, 2, 35, 0, 1, 1, 2, 1, 1, 1],
            expected: Some(Decision::Approved),
        },
        FixtureSpec {
            name: "young_applicant_no_savings".to_string(),
            features: vec![0, 4, 0, 4, 200, 0, 0, 1, 3, 1, 1, 0, 18, 2, 0, 1, 3, 2, 0, 0],
            expected: None,
        },
    ]
}

/// Everything the offline training run needs.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TrainingConfig {
    pub train_data: String,
    pub output_dir: String,
    pub test_size: f64,
    pub split_seed: u64,
    pub stratify: bool,
    pub smote: SmoteConfig,
    pub forest: ForestConfig,
    /// Held-out accuracy must be strictly greater than this.
    pub min_accuracy: f64,
    pub fixtures: Vec<FixtureSpec>,
    pub write_report: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_data: String::from("german.data"),
            output_dir: String::from("credence_model"),
            test_size: 0.2,
            split_seed: 42,
            stratify: false,
            smote: SmoteConfig::default(),
            forest: ForestConfig::default(),
            min_accuracy: 0.65,
            fixtures: default_fixtures(),
            write_report: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(20), 4);
        assert_eq!(MaxFeatures::Log2.resolve(20), 4);
        assert_eq!(MaxFeatures::All.resolve(20), 20);
        assert_eq!(MaxFeatures::Fixed(50).resolve(20), 20);
        assert_eq!(MaxFeatures::Fraction(0.01).resolve(20), 1);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: TrainingConfig =
            serde_json::from_str(r#"{ "forest": { "n_trees": 10 }, "stratify": true }"#).unwrap();
        assert_eq!(cfg.forest.n_trees, 10);
        assert_eq!(cfg.forest.class_weight, ClassWeight::Balanced);
        assert!(cfg.stratify);
        assert_eq!(cfg.smote.k_neighbors, 5);
        assert_eq!(cfg.fixtures.len(), 2);
    }

    #[test]
    fn class_weight_from_str() {
        assert_eq!("Balanced".parse::<ClassWeight>().unwrap(), ClassWeight::Balanced);
        assert!("heavy".parse::<ClassWeight>().is_err());
    }
}
