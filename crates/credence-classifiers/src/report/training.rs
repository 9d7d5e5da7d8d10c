//! Diagnostics written next to the artifact after a successful run.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use maud::html;
use serde::{Deserialize, Serialize};

use crate::artifact::CapturedFixture;
use crate::config::TrainingConfig;
use crate::error::Result;
use crate::report::plots::{plot_confusion, plot_feature_importances};
use crate::report::{Report, ReportSection};
use crate::stats::{Evaluation, RankedFeature};
use crate::trainer::{SplitSummary, TrainingOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub config: TrainingConfig,
    pub split: SplitSummary,
    pub evaluation: Evaluation,
    pub importances: Vec<RankedFeature>,
    pub fixtures: Vec<CapturedFixture>,
}

impl TrainingReport {
    pub fn from_outcome(outcome: &TrainingOutcome, config: &TrainingConfig) -> Self {
        TrainingReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: outcome.artifact.schema.trained_at,
            config: config.clone(),
            split: outcome.split,
            evaluation: outcome.evaluation.clone(),
            importances: outcome.importances.clone(),
            fixtures: outcome.artifact.schema.fixtures.clone(),
        }
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_report(&self) -> Result<Report> {
        let mut report = Report::new("credence", &self.version, "Credence Training Report");

        /* Section 1: Overview */
        {
            let mut overview = ReportSection::new("Overview");
            let split = &self.split;
            overview.add_content(html! {
                p { "Trained " (self.trained_at.format("%Y-%m-%d %H:%M:%S UTC")) " on "
                    (split.train_rows + split.test_rows) " applicants." }
                table {
                    tr { th { "" } th { "rows" } th { "good" } th { "bad" } }
                    tr { th { "train" } td { (split.train_rows) } td { (split.train_good) } td { (split.train_bad) } }
                    tr { th { "train (resampled)" } td { (split.resampled_rows) } td { (split.resampled_good) } td { (split.resampled_bad) } }
                    tr { th { "test" } td { (split.test_rows) } td { (split.test_good) } td { (split.test_bad) } }
                }
            });
            report.add_section(overview);
        }

        /* Section 2: Held-out evaluation */
        {
            let mut evaluation = ReportSection::new("Held-out evaluation");
            evaluation.add_content(html! {
                p { "Accuracy: " (format!("{:.4}", self.evaluation.accuracy))
                    " (floor " (format!("{:.2}", self.config.min_accuracy)) ")" }
                pre { (self.evaluation.to_string()) }
            });
            evaluation.add_plot(plot_confusion(&self.evaluation.confusion, "Confusion matrix"));
            report.add_section(evaluation);
        }

        /* Section 3: Feature importances */
        {
            let mut features = ReportSection::new("Feature importances");
            features.add_plot(plot_feature_importances(
                &self.importances,
                "Mean decrease in impurity",
            ));
            report.add_section(features);
        }

        /* Section 4: Fixtures */
        {
            let mut fixtures = ReportSection::new("Fixtures");
            fixtures.add_content(html! {
                table {
                    tr { th { "name" } th { "decision" } th { "p(good)" } }
                    @for fixture in &self.fixtures {
                        tr {
                            td { (fixture.name) }
                            td { (fixture.decision) }
                            td { (format!("{:.3}", fixture.probability_good)) }
                        }
                    }
                }
            });
            report.add_section(fixtures);
        }

        /* Section 5: Configuration */
        {
            let mut config_section = ReportSection::new("Configuration");
            config_section.add_content(html! {
                pre {
                    code { (serde_json::to_string_pretty(&self.config)?) }
                }
            });
            report.add_section(config_section);
        }

        Ok(report)
    }

    pub fn save_html<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_report()?.save_to_file(path)?;
        Ok(())
    }
}
