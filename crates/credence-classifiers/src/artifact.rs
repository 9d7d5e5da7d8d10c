//! The persisted model: a classifier blob and a schema blob in one directory.
//!
//! ```text
//! <dir>/classifier.json   { format_version, classifier }
//! <dir>/schema.json       { format_version, feature_names, categories,
//!                           label_codec, fixtures, trained_at }
//! ```
//!
//! Both files are always written and read together. An artifact is never
//! modified after it is written; retraining replaces the directory contents.
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::encoder::{CategoryTable, FeatureEncoder, CATEGORY_TABLE_VERSION};
use crate::error::{CreditError, Result};
use crate::models::{ClassifierModel, RandomForest};
use crate::schema::{check_feature_order, Decision, LabelCodec};

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;
pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCHEMA_FILE: &str = "schema.json";

/// A fixture decision captured when the model was trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedFixture {
    pub name: String,
    pub features: Vec<i64>,
    pub decision: Decision,
    pub probability_good: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierBlob {
    pub format_version: u32,
    pub classifier: RandomForest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaBlob {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub categories: CategoryTable,
    pub label_codec: LabelCodec,
    pub fixtures: Vec<CapturedFixture>,
    pub trained_at: DateTime<Utc>,
}

/// Trained classifier plus everything needed to feed it correctly.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub classifier: RandomForest,
    pub schema: SchemaBlob,
}

impl ModelArtifact {
    pub fn new(
        classifier: RandomForest,
        feature_names: Vec<String>,
        categories: CategoryTable,
        fixtures: Vec<CapturedFixture>,
    ) -> Result<Self> {
        let artifact = ModelArtifact {
            classifier,
            schema: SchemaBlob {
                format_version: ARTIFACT_FORMAT_VERSION,
                feature_names,
                categories,
                label_codec: LabelCodec::PINNED,
                fixtures,
                trained_at: Utc::now(),
            },
        };
        artifact.validate(ARTIFACT_FORMAT_VERSION)?;
        Ok(artifact)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.schema.feature_names
    }

    pub fn encoder(&self) -> Result<FeatureEncoder> {
        FeatureEncoder::new(self.schema.feature_names.clone(), self.schema.categories.clone())
    }

    /// Write both blobs into `dir`, creating it if needed.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        write_json(
            &dir.join(CLASSIFIER_FILE),
            &ClassifierBlob {
                format_version: ARTIFACT_FORMAT_VERSION,
                classifier: self.classifier.clone(),
            },
        )?;
        write_json(&dir.join(SCHEMA_FILE), &self.schema)?;
        log::debug!("Model artifact written to {}", dir.display());
        Ok(())
    }

    /// Read both blobs from `dir` and check that they belong together.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let classifier: ClassifierBlob = read_json(&dir.join(CLASSIFIER_FILE))?;
        let schema: SchemaBlob = read_json(&dir.join(SCHEMA_FILE))?;
        let artifact = ModelArtifact {
            classifier: classifier.classifier,
            schema,
        };
        artifact.validate(classifier.format_version)?;
        log::debug!(
            "Loaded artifact from {} (trained {}, {} trees)",
            dir.display(),
            artifact.schema.trained_at,
            artifact.classifier.n_trees()
        );
        Ok(artifact)
    }

    fn validate(&self, classifier_version: u32) -> Result<()> {
        if classifier_version != ARTIFACT_FORMAT_VERSION
            || self.schema.format_version != ARTIFACT_FORMAT_VERSION
        {
            return Err(CreditError::ArtifactMismatch(format!(
                "format versions classifier = {}, schema = {}, supported = {}",
                classifier_version, self.schema.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        check_feature_order(&self.schema.feature_names)
            .map_err(|e| CreditError::ArtifactMismatch(e.to_string()))?;
        if self.classifier.n_features() != self.schema.feature_names.len() {
            return Err(CreditError::ArtifactMismatch(format!(
                "classifier expects {} features but the schema lists {}",
                self.classifier.n_features(),
                self.schema.feature_names.len()
            )));
        }
        if self.schema.label_codec != LabelCodec::PINNED {
            return Err(CreditError::ArtifactMismatch(format!(
                "label codec {:?} differs from {:?}",
                self.schema.label_codec,
                LabelCodec::PINNED
            )));
        }
        if self.schema.categories.version != CATEGORY_TABLE_VERSION {
            return Err(CreditError::ArtifactMismatch(format!(
                "category table version {} is not {}",
                self.schema.categories.version, CATEGORY_TABLE_VERSION
            )));
        }
        self.classifier.validate()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| {
        CreditError::ArtifactMismatch(format!("cannot open {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
