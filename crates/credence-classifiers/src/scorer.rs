//! Inference service over a loaded, immutable artifact.
use std::path::Path;
use std::sync::OnceLock;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::artifact::ModelArtifact;
use crate::encoder::{FeatureEncoder, RawApplicant};
use crate::error::{CreditError, Result};
use crate::models::ClassifierModel;
use crate::schema::{ApplicantRecord, Decision, LabelCodec};

/// Largest drift tolerated between a fixture's stored and replayed
/// probability.
const FIXTURE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub decision: Decision,
    pub probability_good: f64,
    pub applicant: ApplicantRecord,
}

#[derive(Debug)]
struct LoadedModel {
    artifact: ModelArtifact,
    encoder: FeatureEncoder,
}

impl LoadedModel {
    /// Typed records are laid out in the artifact's stored column order.
    fn encode(&self, applicant: &ApplicantRecord) -> Result<Vec<f64>> {
        self.encoder.encode_for(self.artifact.feature_names(), applicant)
    }
}

/// Loads an artifact once and answers `predict` from any thread.
///
/// Share it behind an `Arc`; every method takes `&self`.
#[derive(Debug, Default)]
pub struct CreditScorer {
    model: OnceLock<LoadedModel>,
}

impl CreditScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for `new` followed by `load`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let scorer = Self::new();
        scorer.load(path)?;
        Ok(scorer)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    pub fn artifact(&self) -> Result<&ModelArtifact> {
        self.loaded().map(|m| &m.artifact)
    }

    /// Read, validate and install the artifact in `path`. Fails if an
    /// artifact is already installed.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if self.is_loaded() {
            return Err(CreditError::AlreadyLoaded);
        }
        let artifact = ModelArtifact::load(path.as_ref())?;
        let encoder = artifact.encoder()?;
        let model = LoadedModel { artifact, encoder };
        replay_fixtures(&model)?;

        let n_trees = model.artifact.classifier.n_trees();
        self.model
            .set(model)
            .map_err(|_| CreditError::AlreadyLoaded)?;
        log::info!(
            "Loaded credit model from {} ({} trees)",
            path.as_ref().display(),
            n_trees
        );
        Ok(())
    }

    pub fn predict(&self, applicant: &ApplicantRecord) -> Result<Prediction> {
        let model = self.loaded()?;
        let row = model.encode(applicant)?;
        score(model, &row, *applicant)
    }

    /// Score named raw fields, resolving categorical tokens through the
    /// artifact's category table.
    pub fn predict_raw(&self, raw: &RawApplicant) -> Result<Prediction> {
        let model = self.loaded()?;
        let row = model.encoder.encode_raw(raw)?;
        let values: Vec<i64> = row.iter().map(|&v| v as i64).collect();
        let applicant = ApplicantRecord::from_values(&values)?;
        score(model, &row, applicant)
    }

    /// Score many applicants in parallel. A failing record does not affect
    /// the others.
    pub fn predict_batch(&self, applicants: &[ApplicantRecord]) -> Vec<Result<Prediction>> {
        applicants.par_iter().map(|a| self.predict(a)).collect()
    }

    fn loaded(&self) -> Result<&LoadedModel> {
        self.model.get().ok_or(CreditError::ModelNotLoaded)
    }
}

fn score(model: &LoadedModel, row: &[f64], applicant: ApplicantRecord) -> Result<Prediction> {
    let classifier = &model.artifact.classifier;
    let decision = Decision::from_class_code(classifier.predict(row)?)?;
    let probability_good = classifier.predict_proba(row)?[LabelCodec::GOOD_CLASS as usize];
    Ok(Prediction {
        decision,
        probability_good,
        applicant,
    })
}

/// Re-score every fixture captured at training time and insist on the same
/// answer.
fn replay_fixtures(model: &LoadedModel) -> Result<()> {
    for fixture in &model.artifact.schema.fixtures {
        let applicant = ApplicantRecord::from_values(&fixture.features)?;
        let row = model.encode(&applicant)?;
        let prediction = score(model, &row, applicant)?;
        if prediction.decision != fixture.decision {
            return Err(CreditError::FixtureMismatch {
                name: fixture.name.clone(),
                expected: fixture.decision,
                actual: prediction.decision,
            });
        }
        if (prediction.probability_good - fixture.probability_good).abs() > FIXTURE_TOLERANCE {
            return Err(CreditError::ArtifactMismatch(format!(
                "fixture '{}' scored p_good = {} at load but {} at training",
                fixture.name, prediction.probability_good, fixture.probability_good
            )));
        }
        log::debug!("Fixture '{}' replayed: {}", fixture.name, prediction.decision);
    }
    Ok(())
}
