use anyhow::{Context, Result};
use std::path::Path;

use credence_classifiers::config::TrainingConfig;
use credence_classifiers::trainer::{persist_with, train};

use crate::util::write_bytes_to_file;

pub const CONFIG_FILE: &str = "credence_train_config.json";

/// Train, gate and write the artifact to `config.output_dir`.
pub fn run_training(config: &TrainingConfig) -> Result<()> {
    log::info!("Training on {}", config.train_data);
    let start_time = std::time::Instant::now();

    let outcome = train(config).context("Training pipeline failed")?;

    let out_dir = Path::new(&config.output_dir);
    let bytes = serde_json::to_vec_pretty(config)?;
    persist_with(&outcome, config, out_dir, |staging| {
        write_bytes_to_file(staging.join(CONFIG_FILE), &bytes)?;
        Ok(())
    })
    .with_context(|| format!("Failed to write model artifact to {:?}", out_dir))?;

    log::info!(
        "Model with test accuracy {:.4} written to {} in {:?}",
        outcome.evaluation.accuracy,
        config.output_dir,
        start_time.elapsed()
    );
    Ok(())
}
