use anyhow::{Context, Result};

use credence_classifiers::{CreditScorer, Decision};

use crate::predict::input::{read_applicants, PredictConfig};
use crate::predict::output::write_predictions;

/// Load the artifact, score every applicant in the input file and write the
/// results.
pub fn run_predict(config: &PredictConfig) -> Result<()> {
    let scorer = CreditScorer::from_path(&config.artifact)
        .with_context(|| format!("Failed to load model artifact from {}", config.artifact))?;

    let applicants = read_applicants(&config.input)?;
    log::info!("Loaded {} applicants from {}", applicants.len(), config.input);

    let results = scorer.predict_batch(&applicants);

    let approved = results
        .iter()
        .filter(|r| matches!(r, Ok(p) if p.decision == Decision::Approved))
        .count();
    let failed: Vec<(usize, String)> = results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e.to_string())))
        .collect();
    for (i, e) in &failed {
        log::warn!("Applicant {} is unscorable: {}", i, e);
    }
    log::info!(
        "{} approved, {} rejected, {} unscorable",
        approved,
        results.len() - approved - failed.len(),
        failed.len()
    );

    write_predictions(&applicants, &results, &config.output)?;
    log::info!("Predictions written to {}", config.output);
    Ok(())
}
