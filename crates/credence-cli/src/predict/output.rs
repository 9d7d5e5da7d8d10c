use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use credence_classifiers::schema::FEATURE_NAMES;
use credence_classifiers::{ApplicantRecord, Prediction};

pub const UNSCORABLE: &str = "unscorable";

/// Write one row per applicant to a CSV or TSV file, chosen by extension.
///
/// Columns are `decision`, `probability_good`, `error`, then the 20 input
/// features echoed back. Failed records keep their input and carry the
/// error message.
pub fn write_predictions<P: AsRef<Path>>(
    applicants: &[ApplicantRecord],
    results: &[credence_classifiers::Result<Prediction>],
    output_path: P,
) -> Result<()> {
    let path = output_path.as_ref();
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("csv");
    let delimiter = match extension {
        "tsv" => b'\t',
        _ => b',',
    };

    let file = File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(BufWriter::new(file));

    let mut header = vec!["decision", "probability_good", "error"];
    header.extend_from_slice(&FEATURE_NAMES);
    writer.write_record(&header)?;

    for (applicant, result) in applicants.iter().zip(results) {
        let (decision, probability, error) = match result {
            Ok(prediction) => (
                prediction.decision.as_str().to_string(),
                format!("{:.4}", prediction.probability_good),
                String::new(),
            ),
            Err(e) => (UNSCORABLE.to_string(), String::new(), e.to_string()),
        };
        let mut record = vec![decision, probability, error];
        record.extend(applicant.values().iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
