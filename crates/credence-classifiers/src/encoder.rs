//! Feature encoding: applicant fields to the fixed-order numeric vector.
//!
//! The categorical token table is built once by the loader from the training
//! corpus and travels inside the artifact, so inference maps tokens exactly
//! the way training did.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CreditError, Result};
use crate::schema::{check_domain, check_feature_order, ApplicantRecord, NUM_FEATURES};

/// Version of the category table layout. Bump when the code assignment rule
/// changes.
pub const CATEGORY_TABLE_VERSION: u32 = 1;

/// Explicit token → integer table for the categorical columns.
///
/// Each column's tokens are stored in code order: the token at position `i`
/// encodes to `i`. Codes are assigned in sorted token order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTable {
    pub version: u32,
    pub columns: BTreeMap<String, Vec<String>>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self {
            version: CATEGORY_TABLE_VERSION,
            columns: BTreeMap::new(),
        }
    }

    /// Register a categorical column from its observed tokens.
    pub fn insert_column<'a, I>(&mut self, column: &str, tokens: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sorted: Vec<String> = tokens.into_iter().map(str::to_string).collect();
        sorted.sort();
        sorted.dedup();
        self.columns.insert(column.to_string(), sorted);
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn code(&self, column: &str, token: &str) -> Option<usize> {
        self.columns
            .get(column)
            .and_then(|tokens| tokens.binary_search_by(|t| t.as_str().cmp(token)).ok())
    }
}

/// A single raw field value as it may arrive from a form or a data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Token(String),
}

/// Named raw fields in the order the caller supplies them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawApplicant {
    pub fields: Vec<(String, RawValue)>,
}

impl RawApplicant {
    pub fn push(&mut self, name: &str, value: RawValue) {
        self.fields.push((name.to_string(), value));
    }
}

#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    feature_names: Vec<String>,
    categories: CategoryTable,
}

impl FeatureEncoder {
    /// `feature_names` is the artifact's stored order; it must be the
    /// canonical schema order.
    pub fn new(feature_names: Vec<String>, categories: CategoryTable) -> Result<Self> {
        check_feature_order(&feature_names)?;
        if let Some(unknown) = categories
            .columns
            .keys()
            .find(|c| !feature_names.iter().any(|n| n == *c))
        {
            return Err(CreditError::SchemaMismatch(format!(
                "category table references unknown column '{}'",
                unknown
            )));
        }
        Ok(Self {
            feature_names,
            categories,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    /// Encode a typed record. Every value is domain-checked.
    pub fn encode(&self, record: &ApplicantRecord) -> Result<Vec<f64>> {
        record
            .values()
            .iter()
            .enumerate()
            .map(|(idx, &v)| check_domain(idx, v as f64).map(|v| v as f64))
            .collect()
    }

    /// Encode a typed record after checking the caller's expected column
    /// order against the encoder's.
    pub fn encode_for(&self, names: &[String], record: &ApplicantRecord) -> Result<Vec<f64>> {
        self.check_names(names.iter().map(String::as_str))?;
        self.encode(record)
    }

    /// Encode raw named fields. Names must appear in exactly the stored
    /// order; tokens go through the category table.
    pub fn encode_raw(&self, raw: &RawApplicant) -> Result<Vec<f64>> {
        self.check_names(raw.fields.iter().map(|(n, _)| n.as_str()))?;

        let mut out = Vec::with_capacity(NUM_FEATURES);
        for (idx, (name, value)) in raw.fields.iter().enumerate() {
            let numeric = match value {
                RawValue::Number(v) => *v,
                RawValue::Token(token) => self.token_code(name, token)? as f64,
            };
            out.push(check_domain(idx, numeric)? as f64);
        }
        Ok(out)
    }

    fn token_code(&self, column: &str, token: &str) -> Result<usize> {
        if !self.categories.is_categorical(column) {
            // Numeric column given as text: parse, never guess.
            return token
                .trim()
                .parse::<f64>()
                .map_err(|_| {
                    CreditError::SchemaMismatch(format!(
                        "{} expects a number, got '{}'",
                        column, token
                    ))
                })
                .and_then(|v| {
                    if v >= 0.0 && v.fract() == 0.0 {
                        Ok(v as usize)
                    } else {
                        Err(CreditError::SchemaMismatch(format!(
                            "{} = {} is not a non-negative integer",
                            column, token
                        )))
                    }
                });
        }
        self.categories.code(column, token).ok_or_else(|| {
            CreditError::SchemaMismatch(format!(
                "unknown token '{}' for categorical column {}",
                token, column
            ))
        })
    }

    fn check_names<'a, I>(&self, names: I) -> Result<()>
    where
        I: Iterator<Item = &'a str>,
    {
        let names: Vec<&str> = names.collect();
        if names.len() != self.feature_names.len() {
            return Err(CreditError::SchemaMismatch(format!(
                "expected {} fields, got {}",
                self.feature_names.len(),
                names.len()
            )));
        }
        for (pos, (got, want)) in names.iter().zip(self.feature_names.iter()).enumerate() {
            if *got != want.as_str() {
                return Err(CreditError::SchemaMismatch(format!(
                    "field {} is '{}', expected '{}'",
                    pos, got, want
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{feature_names, FEATURE_NAMES};

    fn encoder() -> FeatureEncoder {
        let mut categories = CategoryTable::new();
        categories.insert_column("checking_account_status", ["A14", "A11", "A13", "A12", "A11"]);
        FeatureEncoder::new(feature_names(), categories).unwrap()
    }

    fn worked_example() -> ApplicantRecord {
        ApplicantRecord::from_values(&[2, 24, 1, 3, 1500, 4, 3, 4, 2, 0, 3, 2, 35, 0, 1, 1, 2, 1, 1, 1])
            .unwrap()
    }

    #[test]
    fn tokens_are_coded_in_sorted_order() {
        let enc = encoder();
        let tokens = &enc.categories().columns["checking_account_status"];
        assert_eq!(tokens, &["A11", "A12", "A13", "A14"]);
        assert_eq!(enc.categories().code("checking_account_status", "A13"), Some(2));
        assert_eq!(enc.categories().code("checking_account_status", "A19"), None);
    }

    #[test]
    fn encode_is_deterministic() {
        let enc = encoder();
        let a = enc.encode(&worked_example()).unwrap();
        let b = enc.encode(&worked_example()).unwrap();
        assert_eq!(a.len(), NUM_FEATURES);
        let bits_a: Vec<u64> = a.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u64> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
        assert_eq!(a[4], 1500.0);
    }

    #[test]
    fn out_of_domain_value_is_schema_mismatch() {
        let mut record = worked_example();
        record.checking_account_status = 9;
        assert!(matches!(
            encoder().encode(&record),
            Err(CreditError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn reordered_names_are_rejected() {
        let enc = encoder();
        let mut names = feature_names();
        names.swap(3, 4);
        assert!(matches!(
            enc.encode_for(&names, &worked_example()),
            Err(CreditError::SchemaMismatch(_))
        ));
        assert!(enc.encode_for(&feature_names(), &worked_example()).is_ok());
    }

    #[test]
    fn encoder_refuses_non_canonical_name_list() {
        let mut names = feature_names();
        names.reverse();
        assert!(FeatureEncoder::new(names, CategoryTable::new()).is_err());
    }

    #[test]
    fn raw_tokens_go_through_the_table() {
        let enc = encoder();
        let values = worked_example().values();
        let mut raw = RawApplicant::default();
        for (idx, name) in FEATURE_NAMES.iter().enumerate() {
            if idx == 0 {
                raw.push(name, RawValue::Token("A13".to_string()));
            } else {
                raw.push(name, RawValue::Number(values[idx] as f64));
            }
        }
        assert_eq!(enc.encode_raw(&raw).unwrap(), enc.encode(&worked_example()).unwrap());

        raw.fields[0].1 = RawValue::Token("A99".to_string());
        assert!(enc.encode_raw(&raw).is_err());
    }

    #[test]
    fn raw_fields_out_of_order_are_rejected() {
        let enc = encoder();
        let values = worked_example().values();
        let mut raw = RawApplicant::default();
        for (idx, name) in FEATURE_NAMES.iter().enumerate().rev() {
            raw.push(name, RawValue::Number(values[idx] as f64));
        }
        assert!(matches!(enc.encode_raw(&raw), Err(CreditError::SchemaMismatch(_))));
    }
}
