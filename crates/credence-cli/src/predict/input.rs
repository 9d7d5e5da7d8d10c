use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use credence_classifiers::ApplicantRecord;

use crate::util::{validate_artifact_dir, validate_input_file};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PredictConfig {
    pub version: String,
    pub artifact: String,
    pub input: String,
    pub output: String,
}

impl Default for PredictConfig {
    fn default() -> Self {
        PredictConfig {
            version: clap::crate_version!().to_string(),
            artifact: String::from("credence_model"),
            input: String::new(),
            output: String::from("credence_predictions.csv"),
        }
    }
}

impl PredictConfig {
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let mut config = PredictConfig::default();

        if let Some(artifact) = matches.get_one::<String>("artifact") {
            config.artifact = artifact.clone();
        }
        if let Some(input) = matches.get_one::<String>("input") {
            config.input = input.clone();
        }
        if let Some(output) = matches.get_one::<String>("output") {
            config.output = output.clone();
        }

        validate_artifact_dir(&config.artifact)?;
        validate_input_file(&config.input)?;
        Ok(config)
    }
}

/// Read applicants from a JSON array or from JSON lines (one object per
/// line, blank lines ignored).
pub fn read_applicants<P: AsRef<Path>>(path: P) -> Result<Vec<ApplicantRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read applicants file: {:?}", path))?;
    parse_applicants(&text).with_context(|| format!("Invalid applicants file: {:?}", path))
}

pub fn parse_applicants(text: &str) -> Result<Vec<ApplicantRecord>> {
    if text.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(text)?);
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Line {} is not a valid applicant record", idx + 1))
        })
        .collect()
}
