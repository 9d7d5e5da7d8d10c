mod common;

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::thread;

use credence_classifiers::encoder::{RawApplicant, RawValue};
use credence_classifiers::schema::FEATURE_NAMES;
use credence_classifiers::io::parse_german_credit;
use credence_classifiers::models::ClassifierModel;
use credence_classifiers::trainer::{persist, train_on_dataset};
use credence_classifiers::{ApplicantRecord, CreditError, CreditScorer, Decision};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use tempfile::TempDir;

use common::{german_credit_table, quick_config, random_record, WORKED_EXAMPLE, YOUNG_APPLICANT};

/// One trained artifact shared by every test in this binary.
fn artifact_dir() -> &'static Path {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        common::init_logging();
        let dir = tempfile::tempdir().unwrap();
        let data = parse_german_credit(german_credit_table(1000, 7).as_bytes()).unwrap();
        let cfg = quick_config(&dir.path().join("german.data"), dir.path());
        let outcome = train_on_dataset(&data, &cfg).unwrap();
        persist(&outcome, &cfg, dir.path()).unwrap();
        dir
    })
    .path()
}

fn loaded() -> &'static CreditScorer {
    static SCORER: OnceLock<CreditScorer> = OnceLock::new();
    SCORER.get_or_init(|| CreditScorer::from_path(artifact_dir()).unwrap())
}

/// Copy the shared artifact into a fresh directory for tampering.
fn copy_artifact() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in ["classifier.json", "schema.json"] {
        std::fs::copy(artifact_dir().join(file), dir.path().join(file)).unwrap();
    }
    dir
}

fn edit_schema(dir: &Path, edit: impl FnOnce(&mut Value)) {
    let path = dir.join("schema.json");
    let mut schema: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    edit(&mut schema);
    std::fs::write(&path, serde_json::to_string_pretty(&schema).unwrap()).unwrap();
}

fn record(values: &[i64]) -> ApplicantRecord {
    ApplicantRecord::from_values(values).unwrap()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn predict_before_load_is_an_error() {
    let scorer = CreditScorer::new();
    assert!(!scorer.is_loaded());
    assert!(matches!(
        scorer.predict(&record(&WORKED_EXAMPLE)),
        Err(CreditError::ModelNotLoaded)
    ));
}

#[test]
fn second_load_is_rejected() {
    let scorer = CreditScorer::from_path(artifact_dir()).unwrap();
    assert!(matches!(
        scorer.load(artifact_dir()),
        Err(CreditError::AlreadyLoaded)
    ));
    assert!(scorer.is_loaded());
}

#[test]
fn reordered_feature_names_fail_load() {
    let dir = copy_artifact();
    edit_schema(dir.path(), |schema| {
        let names = schema["feature_names"].as_array_mut().unwrap();
        names.swap(0, 1);
    });
    assert!(matches!(
        CreditScorer::from_path(dir.path()),
        Err(CreditError::ArtifactMismatch(_))
    ));
}

#[test]
fn unsupported_format_version_fails_load() {
    let dir = copy_artifact();
    edit_schema(dir.path(), |schema| schema["format_version"] = Value::from(99));
    assert!(matches!(
        CreditScorer::from_path(dir.path()),
        Err(CreditError::ArtifactMismatch(_))
    ));
}

#[test]
fn altered_label_codec_fails_load() {
    let dir = copy_artifact();
    edit_schema(dir.path(), |schema| schema["label_codec"]["good_class"] = Value::from(0));
    assert!(matches!(
        CreditScorer::from_path(dir.path()),
        Err(CreditError::ArtifactMismatch(_))
    ));
}

#[test]
fn diverging_fixture_fails_load() {
    let dir = copy_artifact();
    edit_schema(dir.path(), |schema| {
        let fixture = &mut schema["fixtures"][0];
        let flipped = if fixture["decision"] == "approved" { "rejected" } else { "approved" };
        fixture["decision"] = Value::from(flipped);
    });
    assert!(matches!(
        CreditScorer::from_path(dir.path()),
        Err(CreditError::FixtureMismatch { .. })
    ));
}

#[test]
fn missing_classifier_blob_fails_load() {
    let dir = copy_artifact();
    std::fs::remove_file(dir.path().join("classifier.json")).unwrap();
    assert!(matches!(
        CreditScorer::from_path(dir.path()),
        Err(CreditError::ArtifactMismatch(_))
    ));
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

#[test]
fn worked_example_is_approved() {
    let prediction = loaded().predict(&record(&WORKED_EXAMPLE)).unwrap();
    assert_eq!(prediction.decision, Decision::Approved);
    assert!(prediction.probability_good > 0.5);
    assert_eq!(prediction.applicant, record(&WORKED_EXAMPLE));
}

#[test]
fn predict_encodes_in_stored_column_order() {
    let scorer = loaded();
    let artifact = scorer.artifact().unwrap();
    assert!(artifact
        .feature_names()
        .iter()
        .map(String::as_str)
        .eq(FEATURE_NAMES.iter().copied()));

    let applicant = record(&WORKED_EXAMPLE);
    let row = artifact
        .encoder()
        .unwrap()
        .encode_for(artifact.feature_names(), &applicant)
        .unwrap();
    let expected = artifact.classifier.predict_proba(&row).unwrap()[1];
    assert_eq!(scorer.predict(&applicant).unwrap().probability_good, expected);
}

#[test]
fn young_applicant_matches_captured_decision() {
    let scorer = loaded();
    let captured = &scorer.artifact().unwrap().schema.fixtures[1];
    assert_eq!(captured.features, YOUNG_APPLICANT.to_vec());
    let prediction = scorer.predict(&record(&YOUNG_APPLICANT)).unwrap();
    assert_eq!(prediction.decision, captured.decision);
    assert_eq!(prediction.probability_good, captured.probability_good);
}

#[test]
fn out_of_domain_value_is_schema_mismatch() {
    let mut values = WORKED_EXAMPLE;
    values[0] = 9;
    assert!(matches!(
        loaded().predict(&record(&values)),
        Err(CreditError::SchemaMismatch(_))
    ));

    let mut values = WORKED_EXAMPLE;
    values[12] = 17;
    assert!(matches!(
        loaded().predict(&record(&values)),
        Err(CreditError::SchemaMismatch(_))
    ));
}

#[test]
fn every_in_domain_record_gets_one_decision() {
    let scorer = loaded();
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..300 {
        let prediction = scorer.predict(&random_record(&mut rng)).unwrap();
        assert!(matches!(prediction.decision, Decision::Approved | Decision::Rejected));
        assert!((0.0..=1.0).contains(&prediction.probability_good));
    }
}

#[test]
fn batch_failures_are_isolated() {
    let mut bad = WORKED_EXAMPLE;
    bad[19] = 5;
    let batch = vec![record(&WORKED_EXAMPLE), record(&bad), record(&YOUNG_APPLICANT)];
    let results = loaded().predict_batch(&batch);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().decision, Decision::Approved);
    assert!(matches!(results[1], Err(CreditError::SchemaMismatch(_))));
    assert!(results[2].is_ok());
}

#[test]
fn raw_tokens_score_like_encoded_values() {
    let mut raw = RawApplicant::default();
    for (idx, name) in FEATURE_NAMES.iter().enumerate() {
        let value = if idx == 0 {
            RawValue::Token("A13".to_string())
        } else {
            RawValue::Number(WORKED_EXAMPLE[idx] as f64)
        };
        raw.push(name, value);
    }
    let from_raw = loaded().predict_raw(&raw).unwrap();
    let from_record = loaded().predict(&record(&WORKED_EXAMPLE)).unwrap();
    assert_eq!(from_raw, from_record);

    raw.fields[0].1 = RawValue::Token("A19".to_string());
    assert!(matches!(
        loaded().predict_raw(&raw),
        Err(CreditError::SchemaMismatch(_))
    ));
}

#[test]
fn scorer_is_shared_across_threads() {
    let scorer = Arc::new(CreditScorer::from_path(artifact_dir()).unwrap());
    let expected = scorer.predict(&record(&WORKED_EXAMPLE)).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let scorer = Arc::clone(&scorer);
            thread::spawn(move || {
                (0..50)
                    .map(|_| scorer.predict(&record(&WORKED_EXAMPLE)).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for prediction in handle.join().unwrap() {
            assert_eq!(prediction, expected);
        }
    }
}
