//! Offline training pipeline: load → split → balance → fit → evaluate →
//! gate → fixtures → artifact.
//!
//! The run either produces a complete artifact or fails; nothing is written
//! to disk until every check has passed.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifact::{CapturedFixture, ModelArtifact};
use crate::balance::Smote;
use crate::config::TrainingConfig;
use crate::data_handling::{class_counts, Dataset};
use crate::encoder::FeatureEncoder;
use crate::error::{CreditError, Result};
use crate::io::load_german_credit;
use crate::models::{ClassifierModel, RandomForest};
use crate::report::TrainingReport;
use crate::schema::{ApplicantRecord, Decision, LabelCodec};
use crate::stats::{evaluate, rank_features, Evaluation, RankedFeature};

/// Row and class counts at each stage of the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub train_rows: usize,
    pub train_good: usize,
    pub train_bad: usize,
    pub test_rows: usize,
    pub test_good: usize,
    pub test_bad: usize,
    pub resampled_rows: usize,
    pub resampled_good: usize,
    pub resampled_bad: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub evaluation: Evaluation,
    pub importances: Vec<RankedFeature>,
    pub split: SplitSummary,
}

/// Load `config.train_data` and train.
pub fn train(config: &TrainingConfig) -> Result<TrainingOutcome> {
    let data = load_german_credit(&config.train_data)?;
    train_on_dataset(&data, config)
}

pub fn train_on_dataset(data: &Dataset, config: &TrainingConfig) -> Result<TrainingOutcome> {
    data.log_input_data_summary();

    let split = data.train_test_split(config.test_size, config.split_seed, config.stratify)?;
    split.check_sufficient()?;

    let (train_bad, train_good) = class_counts(&split.y_train);
    let (test_bad, test_good) = class_counts(&split.y_test);
    log::info!(
        "Split: {} train ({} good / {} bad), {} test ({} good / {} bad)",
        split.y_train.len(),
        train_good,
        train_bad,
        split.y_test.len(),
        test_good,
        test_bad
    );

    let (x_balanced, y_balanced) =
        Smote::new(config.smote.clone()).fit_resample(&split.x_train, &split.y_train)?;
    let (res_bad, res_good) = class_counts(&y_balanced);
    log::info!(
        "SMOTE: train partition resampled to {} rows ({} good / {} bad)",
        y_balanced.len(),
        res_good,
        res_bad
    );

    let start_time = std::time::Instant::now();
    let mut forest = RandomForest::new(config.forest.clone());
    forest.fit(&x_balanced, &y_balanced)?;
    log::info!(
        "Fitted {} with {} trees in {:?}",
        forest.name(),
        forest.n_trees(),
        start_time.elapsed()
    );

    let evaluation = evaluate(&forest, &split.x_test, &split.y_test)?;
    evaluation.log_report();

    let importances = rank_features(&data.feature_names, forest.feature_importances());
    log::info!("Feature importances:");
    for feature in &importances {
        log::info!("  {:<26} {:.4}", feature.name, feature.importance);
    }

    if evaluation.accuracy <= config.min_accuracy {
        return Err(CreditError::AccuracyBelowFloor {
            accuracy: evaluation.accuracy,
            floor: config.min_accuracy,
        });
    }

    let encoder = FeatureEncoder::new(data.feature_names.clone(), data.categories.clone())?;
    let fixtures = capture_fixtures(&forest, &encoder, config)?;

    let artifact = ModelArtifact::new(
        forest,
        data.feature_names.clone(),
        data.categories.clone(),
        fixtures,
    )?;

    Ok(TrainingOutcome {
        artifact,
        evaluation,
        importances,
        split: SplitSummary {
            train_rows: split.y_train.len(),
            train_good,
            train_bad,
            test_rows: split.y_test.len(),
            test_good,
            test_bad,
            resampled_rows: y_balanced.len(),
            resampled_good: res_good,
            resampled_bad: res_bad,
        },
    })
}

fn capture_fixtures(
    forest: &RandomForest,
    encoder: &FeatureEncoder,
    config: &TrainingConfig,
) -> Result<Vec<CapturedFixture>> {
    let mut captured = Vec::with_capacity(config.fixtures.len());
    for fixture in &config.fixtures {
        let record = ApplicantRecord::from_values(&fixture.features)?;
        let row = encoder.encode(&record)?;
        let decision = Decision::from_class_code(forest.predict(&row)?)?;
        let probability_good = forest.predict_proba(&row)?[LabelCodec::GOOD_CLASS as usize];
        log::info!(
            "Fixture '{}': {} (p_good = {:.3})",
            fixture.name,
            decision,
            probability_good
        );
        if let Some(expected) = fixture.expected {
            if expected != decision {
                return Err(CreditError::FixtureMismatch {
                    name: fixture.name.clone(),
                    expected,
                    actual: decision,
                });
            }
        }
        captured.push(CapturedFixture {
            name: fixture.name.clone(),
            features: fixture.features.clone(),
            decision,
            probability_good,
        });
    }
    Ok(captured)
}

/// Write the artifact and, when enabled, the diagnostic reports into `dir`.
///
/// Everything is staged in a sibling directory and renamed over `dir` at the
/// end, so `dir` either holds the previous contents or the complete new ones.
pub fn persist<P: AsRef<Path>>(
    outcome: &TrainingOutcome,
    config: &TrainingConfig,
    dir: P,
) -> Result<()> {
    persist_with(outcome, config, dir, |_| Ok(()))
}

/// Like [`persist`], with `extra` writing further files into the staging
/// directory before it is moved into place.
pub fn persist_with<P, F>(
    outcome: &TrainingOutcome,
    config: &TrainingConfig,
    dir: P,
    extra: F,
) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&Path) -> Result<()>,
{
    let dir = dir.as_ref();
    let parent = match dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".credence-staging")
        .tempdir_in(parent)?;

    outcome.artifact.save(staging.path())?;
    if config.write_report {
        let report = TrainingReport::from_outcome(outcome, config);
        report.save_json(staging.path().join("report.json"))?;
        report.save_html(staging.path().join("report.html"))?;
    }
    extra(staging.path())?;

    replace_dir(staging.path(), dir, parent)?;
    log::info!("Model artifact written to {}", dir.display());
    if config.write_report {
        log::info!("Training report written to {}", dir.join("report.html").display());
    }
    Ok(())
}

/// Move `staged` to `dir`. An existing `dir` is set aside first and restored
/// if the final rename fails.
fn replace_dir(staged: &Path, dir: &Path, parent: &Path) -> Result<()> {
    if fs::symlink_metadata(dir).is_err() {
        fs::rename(staged, dir)?;
        return Ok(());
    }
    let previous = tempfile::Builder::new()
        .prefix(".credence-previous")
        .tempdir_in(parent)?;
    let set_aside = previous.path().join("contents");
    fs::rename(dir, &set_aside)?;
    if let Err(e) = fs::rename(staged, dir) {
        if let Err(restore) = fs::rename(&set_aside, dir) {
            log::error!(
                "Could not restore {} from {}: {}",
                dir.display(),
                set_aside.display(),
                restore
            );
            // leave the set-aside copy on disk
            std::mem::forget(previous);
        }
        return Err(e.into());
    }
    Ok(())
}
