use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use credence_classifiers::config::TrainingConfig;
use credence_cli::predict::input::PredictConfig;
use credence_cli::predict::predict::run_predict;
use credence_cli::train::input::{apply_overrides, load_training_config};
use credence_cli::train::trainer::run_training;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("CREDENCE_LOG", "error,credence=info"))
        .init();

    let matches = Command::new("credence")
        .version(clap::crate_version!())
        .author("Credence developers")
        .about("\u{1F4B3} Credence CLI - Credit-worthiness classification for the German Credit dataset")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train, evaluate and persist a random-forest credit model")
                .arg(
                    Arg::new("config")
                        .help("Path to training configuration file. Prints a template when omitted.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .short('d')
                        .long("train_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to the whitespace-delimited German Credit table. \
                             Overrides the training data file specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output_dir")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Directory the model artifact and reports are written to. \
                             Overrides the directory specified in the configuration file.",
                        )
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("n_trees")
                        .long("n_trees")
                        .value_parser(clap::value_parser!(usize))
                        .help("Number of trees in the forest. Overrides the configuration file."),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(clap::value_parser!(u64))
                        .help("Seed for the split, SMOTE and the forest. Overrides the configuration file."),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Score applicants with a trained model artifact")
                .arg(
                    Arg::new("artifact")
                        .short('m')
                        .long("model")
                        .visible_alias("artifact")
                        .help("Path to the model artifact directory")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("Applicants as a JSON array or JSON lines")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Path to the output file for predictions (*.tsv or *.csv)")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let Some(config_path) = matches.get_one::<PathBuf>("config") else {
        let mut template = TrainingConfig::default();
        apply_overrides(&mut template, matches);
        eprintln!("[Credence::Train] No config file provided; printing a template configuration.");
        println!("{}", serde_json::to_string_pretty(&template)?);
        return Ok(());
    };
    log::info!("[Credence::Train] Training from config: {:?}", config_path);

    let config = match load_training_config(config_path, matches) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid training configuration: {:#}", e);
            std::process::exit(1)
        }
    };

    match run_training(&config) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let config = match PredictConfig::from_arguments(matches) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid prediction arguments: {:#}", e);
            std::process::exit(1)
        }
    };
    log::info!("[Credence::Predict] Scoring {} with {}", config.input, config.artifact);

    match run_predict(&config) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
