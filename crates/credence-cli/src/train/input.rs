use anyhow::{Context, Result};
use clap::ArgMatches;
use std::fs;
use std::path::PathBuf;

use credence_classifiers::config::TrainingConfig;

use crate::util::validate_input_file;

/// Build the training configuration from a JSON file plus command line
/// overrides. Fields that are missing or malformed in the file keep their
/// defaults.
pub fn load_training_config(config_path: &PathBuf, matches: &ArgMatches) -> Result<TrainingConfig> {
    let config_json = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

    let partial: serde_json::Value = serde_json::from_str(&config_json)
        .with_context(|| format!("Config file is not valid JSON: {:?}", config_path))?;
    let mut config = TrainingConfig::default();

    macro_rules! load_or_default {
        ($field:ident) => {
            if let Some(val) = partial.get(stringify!($field)) {
                if let Ok(parsed) = serde_json::from_value(val.clone()) {
                    config.$field = parsed;
                } else {
                    log::warn!(
                        "Config Invalid value for '{}', using default: {:?}",
                        stringify!($field),
                        config.$field
                    );
                }
            } else {
                log::warn!(
                    "Config Missing field '{}', using default: {:?}",
                    stringify!($field),
                    config.$field
                );
            }
        };
    }

    load_or_default!(train_data);
    load_or_default!(output_dir);
    load_or_default!(test_size);
    load_or_default!(split_seed);
    load_or_default!(stratify);
    load_or_default!(smote);
    load_or_default!(forest);
    load_or_default!(min_accuracy);
    load_or_default!(fixtures);
    load_or_default!(write_report);

    apply_overrides(&mut config, matches);
    validate_input_file(&config.train_data)?;
    Ok(config)
}

/// Apply command line overrides on top of an already loaded configuration.
pub fn apply_overrides(config: &mut TrainingConfig, matches: &ArgMatches) {
    if let Some(train_data) = matches.get_one::<String>("train_data") {
        config.train_data = train_data.clone();
    }
    if let Some(output_dir) = matches.get_one::<String>("output_dir") {
        config.output_dir = output_dir.clone();
    }
    if let Some(&n_trees) = matches.get_one::<usize>("n_trees") {
        config.forest.n_trees = n_trees;
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        config.split_seed = seed;
        config.smote.seed = seed;
        config.forest.seed = seed;
    }
}
