//! Held-out evaluation: accuracy, confusion matrix and per-class scores.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CreditError, Result};
use crate::math::Array2;
use crate::models::ClassifierModel;
use crate::schema::LabelCodec;

/// Rows are true classes, columns predicted classes, both indexed by class
/// code (0 = bad, 1 = good).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &[u8], predicted: &[u8]) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(CreditError::InvalidConfig(format!(
                "{} labels but {} predictions",
                truth.len(),
                predicted.len()
            )));
        }
        let mut counts = [[0usize; 2]; 2];
        for (&t, &p) in truth.iter().zip(predicted.iter()) {
            if t > 1 {
                return Err(CreditError::UnknownClassCode(t));
            }
            if p > 1 {
                return Err(CreditError::UnknownClassCode(p));
            }
            counts[t as usize][p as usize] += 1;
        }
        Ok(Self { counts })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.counts[0][0] + self.counts[1][1]) as f64 / total as f64
    }

    pub fn class_metrics(&self, class: usize) -> ClassMetrics {
        let tp = self.counts[class][class];
        let support = self.counts[class][0] + self.counts[class][1];
        let predicted = self.counts[0][class] + self.counts[1][class];
        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            class: class as u8,
            precision,
            recall,
            f1,
            support,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Everything computed on the untouched test partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
}

impl Evaluation {
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let per_class: Vec<ClassMetrics> = LabelCodec::CLASSES
            .iter()
            .map(|&c| confusion.class_metrics(c as usize))
            .collect();
        let k = per_class.len() as f64;
        let macro_avg = AveragedMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / k,
            recall: per_class.iter().map(|m| m.recall).sum::<f64>() / k,
            f1: per_class.iter().map(|m| m.f1).sum::<f64>() / k,
        };
        let total = confusion.total().max(1) as f64;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            per_class.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total
        };
        let weighted_avg = AveragedMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
        };
        Evaluation {
            accuracy: confusion.accuracy(),
            confusion,
            per_class,
            macro_avg,
            weighted_avg,
        }
    }

    /// Log the report line by line at info level.
    pub fn log_report(&self) {
        for line in self.to_string().lines() {
            log::info!("{}", line);
        }
    }
}

fn class_label(code: u8) -> &'static str {
    if code == LabelCodec::GOOD_CLASS {
        "good"
    } else {
        "bad"
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy: {:.4}", self.accuracy)?;
        writeln!(f, "Confusion matrix (rows = true, cols = predicted; bad, good):")?;
        for row in &self.confusion.counts {
            writeln!(f, "  [{:>5} {:>5}]", row[0], row[1])?;
        }
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class_label(m.class),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        let total = self.confusion.total();
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, total
            )?;
        }
        Ok(())
    }
}

/// Predict every row of `x` and score against `y`.
pub fn evaluate(model: &dyn ClassifierModel, x: &Array2<f64>, y: &[u8]) -> Result<Evaluation> {
    let predicted = x
        .rows()
        .map(|row| model.predict(row))
        .collect::<Result<Vec<u8>>>()?;
    let confusion = ConfusionMatrix::from_predictions(y, &predicted)?;
    Ok(Evaluation::from_confusion(confusion))
}

/// Importance scores paired with feature names, highest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFeature {
    pub name: String,
    pub importance: f64,
}

pub fn rank_features(names: &[String], importances: &[f64]) -> Vec<RankedFeature> {
    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(importances.iter())
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance).then_with(|| a.name.cmp(&b.name)));
    ranked
}
