//! German Credit whitespace table reader.
//!
//! 21 columns per row, no header: the 20 applicant features in schema order
//! followed by `Creditability` (1 = good, 2 = bad).
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::data_handling::Dataset;
use crate::encoder::CategoryTable;
use crate::error::{CreditError, Result};
use crate::math::Array2;
use crate::schema::{check_domain, feature_names, LabelCodec, FEATURE_NAMES, NUM_FEATURES};

pub const NUM_COLUMNS: usize = NUM_FEATURES + 1;

/// Load and encode a German Credit data file.
pub fn load_german_credit<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let file = File::open(path.as_ref())?;
    log::debug!("Reading training table {}", path.as_ref().display());
    parse_german_credit(BufReader::new(file))
}

/// Parse the table from any buffered reader.
///
/// A column is categorical when any of its values is not a number; its
/// tokens are coded in sorted order. Every encoded row must satisfy the
/// schema domains.
pub fn parse_german_credit<R: BufRead>(reader: R) -> Result<Dataset> {
    let mut rows: Vec<(usize, Vec<String>)> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != NUM_COLUMNS {
            return Err(CreditError::malformed(
                line_no,
                format!("expected {} columns, found {}", NUM_COLUMNS, tokens.len()),
            ));
        }
        rows.push((line_no, tokens));
    }

    if rows.is_empty() {
        return Err(CreditError::InsufficientData(
            "training table has no rows".to_string(),
        ));
    }

    let categories = infer_categories(&rows);
    for (column, tokens) in &categories.columns {
        log::debug!("Categorical column {}: {} levels {:?}", column, tokens.len(), tokens);
    }

    let codec = LabelCodec::PINNED;
    let mut x = Array2::with_columns(NUM_FEATURES);
    let mut y = Vec::with_capacity(rows.len());
    let mut encoded = [0.0f64; NUM_FEATURES];

    for (line_no, tokens) in &rows {
        for (col, token) in tokens[..NUM_FEATURES].iter().enumerate() {
            let name = FEATURE_NAMES[col];
            let value = match categories.code(name, token) {
                Some(code) => code as f64,
                None => token.parse::<f64>().map_err(|_| {
                    CreditError::malformed(
                        *line_no,
                        format!("{} = '{}' is not numeric", name, token),
                    )
                })?,
            };
            check_domain(col, value)
                .map_err(|e| CreditError::malformed(*line_no, e.to_string()))?;
            encoded[col] = value;
        }
        x.push_row(&encoded)
            .map_err(|e| CreditError::malformed(*line_no, e.to_string()))?;
        y.push(codec.class_from_raw(&tokens[NUM_FEATURES], *line_no)?);
    }

    Ok(Dataset {
        x,
        y,
        feature_names: feature_names(),
        categories,
    })
}

fn infer_categories(rows: &[(usize, Vec<String>)]) -> CategoryTable {
    let mut table = CategoryTable::new();
    for (col, name) in FEATURE_NAMES.iter().enumerate() {
        let is_categorical = rows.iter().any(|(_, t)| t[col].parse::<f64>().is_err());
        if is_categorical {
            let distinct: BTreeSet<&str> = rows.iter().map(|(_, t)| t[col].as_str()).collect();
            table.insert_column(name, distinct);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ROWS: &str = "\
A11 6 A34 A43 1169 A65 A75 4 A93 A101 4 A121 67 A143 A152 2 A173 1 A192 A201 1
A12 48 A32 A43 5951 A61 A73 2 A92 A101 2 A121 22 A143 A152 1 A173 1 A191 A201 2

A14 12 A34 A46 2096 A61 A74 2 A93 A101 3 A121 49 A143 A152 1 A172 2 A191 A201 1
A11 42 A32 A42 7882 A61 A74 2 A93 A103 4 A122 45 A143 A153 1 A173 2 A191 A201 1
";

    #[test]
    fn raw_tokens_are_encoded_in_sorted_order() {
        let data = parse_german_credit(Cursor::new(ROWS)).unwrap();
        assert_eq!(data.x.shape(), (4, NUM_FEATURES));
        // A11, A12, A14 -> 0, 1, 2
        assert_eq!(data.x[(0, 0)], 0.0);
        assert_eq!(data.x[(1, 0)], 1.0);
        assert_eq!(data.x[(2, 0)], 2.0);
        assert_eq!(data.x[(0, 1)], 6.0);
        assert_eq!(data.x[(3, 4)], 7882.0);
        assert_eq!(data.y, vec![1, 0, 1, 1]);
        assert!(data.categories.is_categorical("purpose"));
        assert!(!data.categories.is_categorical("age"));
    }

    #[test]
    fn short_row_is_malformed() {
        let err = parse_german_credit(Cursor::new("A11 6 A34\n")).unwrap_err();
        assert!(matches!(err, CreditError::MalformedRow { line: 1, .. }));
    }

    #[test]
    fn extra_column_reports_its_line() {
        let input = format!(
            "{}A11 6 A34 A43 1169 A65 A75 4 A93 A101 4 A121 67 A143 A152 2 A173 1 A192 A201 1 9\n",
            ROWS
        );
        let err = parse_german_credit(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, CreditError::MalformedRow { line: 6, .. }));
    }

    #[test]
    fn out_of_domain_value_is_malformed() {
        // installment_rate is 1..=4
        let input = ROWS.replacen("A75 4 ", "A75 9 ", 1);
        match parse_german_credit(Cursor::new(input)).unwrap_err() {
            CreditError::MalformedRow { line, reason } => {
                assert_eq!(line, 1);
                assert!(reason.contains("installment_rate"), "{}", reason);
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn unknown_label_is_malformed() {
        let input = ROWS.replacen("A201 2", "A201 3", 1);
        let err = parse_german_credit(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, CreditError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn empty_table_is_insufficient() {
        assert!(matches!(
            parse_german_credit(Cursor::new("\n\n")),
            Err(CreditError::InsufficientData(_))
        ));
    }
}
