//! Deterministic German-credit-shaped data for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use credence_classifiers::config::{ForestConfig, TrainingConfig};
use credence_classifiers::schema::ApplicantRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const WORKED_EXAMPLE: [i64; 20] = [2, 24, 1, 3, 1500, 4, 3, 4, 2, 0, 3, 2, 35, 0, 1, 1, 2, 1, 1, 1];
pub const YOUNG_APPLICANT: [i64; 20] = [0, 4, 0, 4, 200, 0, 0, 1, 3, 1, 1, 0, 18, 2, 0, 1, 3, 2, 0, 0];

/// One random in-domain applicant.
pub fn random_applicant<R: Rng>(rng: &mut R) -> [i64; 20] {
    [
        rng.gen_range(0..=3),
        rng.gen_range(4..=72),
        rng.gen_range(0..=4),
        rng.gen_range(0..=9),
        rng.gen_range(250..=15000),
        rng.gen_range(0..=4),
        rng.gen_range(0..=4),
        rng.gen_range(1..=4),
        rng.gen_range(0..=4),
        rng.gen_range(0..=2),
        rng.gen_range(1..=4),
        rng.gen_range(0..=3),
        rng.gen_range(19..=75),
        rng.gen_range(0..=2),
        rng.gen_range(0..=2),
        rng.gen_range(1..=4),
        rng.gen_range(0..=3),
        rng.gen_range(1..=2),
        rng.gen_range(0..=1),
        rng.gen_range(0..=1),
    ]
}

pub fn random_record<R: Rng>(rng: &mut R) -> ApplicantRecord {
    ApplicantRecord::from_values(&random_applicant(rng)).unwrap()
}

/// Latent creditworthiness: better checking, savings and employment help;
/// long and large loans hurt.
fn latent_score(v: &[i64; 20]) -> f64 {
    1.2 * v[0] as f64 + 0.8 * v[5] as f64 + 0.5 * v[6] as f64 - 0.05 * v[1] as f64
        - 0.0002 * v[4] as f64
        + 0.03 * (v[12] - 18) as f64
}

/// `n` rows in the whitespace layout of `german.data`. The checking account
/// column is written as `A11`..`A14` tokens, everything else numerically.
/// Roughly 70% of the rows are labelled good (`1`).
pub fn german_credit_table(n: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::new();
    for _ in 0..n {
        let values = random_applicant(&mut rng);
        let noise: f64 = (0..3).map(|_| rng.gen_range(-0.5f64..0.5)).sum();
        let good = latent_score(&values) + noise > 0.6;

        let mut tokens = vec![format!("A1{}", values[0] + 1)];
        tokens.extend(values[1..].iter().map(|v| v.to_string()));
        tokens.push(if good { "1" } else { "2" }.to_string());
        out.push_str(&tokens.join(" "));
        out.push('\n');
    }
    out
}

pub fn write_german_credit(dir: &Path, n: usize, seed: u64) -> PathBuf {
    let path = dir.join("german.data");
    fs::write(&path, german_credit_table(n, seed)).unwrap();
    path
}

/// Route library logs through the test harness; repeated calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Default configuration with a smaller forest so tests stay quick.
pub fn quick_config(train_data: &Path, output_dir: &Path) -> TrainingConfig {
    TrainingConfig {
        train_data: train_data.to_string_lossy().into_owned(),
        output_dir: output_dir.to_string_lossy().into_owned(),
        forest: ForestConfig {
            n_trees: 30,
            ..ForestConfig::default()
        },
        ..TrainingConfig::default()
    }
}
