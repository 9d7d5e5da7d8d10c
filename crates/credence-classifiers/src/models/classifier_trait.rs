use crate::error::Result;
use crate::math::Array2;

/// Contract between the trainer/scorer and a binary classifier.
///
/// Labels and outputs use class codes (see `LabelCodec`): 0 = bad, 1 = good.
pub trait ClassifierModel: Send + Sync {
    /// Fit the model on `x` (rows are samples) and class codes `y`.
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()>;

    /// Class probabilities for one feature vector, ordered as `classes()`.
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>>;

    /// Most probable class code for one feature vector.
    fn predict(&self, row: &[f64]) -> Result<u8> {
        let proba = self.predict_proba(row)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(self.classes()[best])
    }

    /// Class codes the probabilities refer to.
    fn classes(&self) -> &[u8];

    /// Number of features the model expects per row.
    fn n_features(&self) -> usize;

    /// Normalised per-feature importance; empty before fitting.
    fn feature_importances(&self) -> &[f64];

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
