//! The fixed 20-feature applicant schema, the pinned label codec, and the
//! decision type handed to callers.
//!
//! Column order here is the order of the German Credit data file and the
//! order every feature vector uses. The artifact stores a copy of these
//! names and inference refuses to score when the two disagree.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CreditError, Result};

pub const NUM_FEATURES: usize = 20;

/// Canonical feature order.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "checking_account_status",
    "duration_months",
    "credit_history",
    "purpose",
    "credit_amount",
    "savings_account",
    "employment_since",
    "installment_rate",
    "personal_status_sex",
    "other_debtors",
    "residence_since",
    "property_type",
    "age",
    "other_installment_plans",
    "housing",
    "number_credits",
    "job",
    "people_liable",
    "telephone",
    "foreign_worker",
];

/// Inclusive integer domain of a feature. `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDomain {
    pub min: i64,
    pub max: Option<i64>,
}

impl FeatureDomain {
    const fn codes(min: i64, max: i64) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    const fn at_least(min: i64) -> Self {
        Self { min, max: None }
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }
}

impl fmt::Display for FeatureDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..={}", self.min, max),
            None => write!(f, ">={}", self.min),
        }
    }
}

/// Domains aligned with `FEATURE_NAMES`.
pub const FEATURE_DOMAINS: [FeatureDomain; NUM_FEATURES] = [
    FeatureDomain::codes(0, 3),   // checking_account_status
    FeatureDomain::at_least(1),   // duration_months
    FeatureDomain::codes(0, 4),   // credit_history
    FeatureDomain::codes(0, 9),   // purpose
    FeatureDomain::at_least(1),   // credit_amount
    FeatureDomain::codes(0, 4),   // savings_account
    FeatureDomain::codes(0, 4),   // employment_since
    FeatureDomain::codes(1, 4),   // installment_rate
    FeatureDomain::codes(0, 4),   // personal_status_sex
    FeatureDomain::codes(0, 2),   // other_debtors
    FeatureDomain::codes(1, 4),   // residence_since
    FeatureDomain::codes(0, 3),   // property_type
    FeatureDomain::codes(18, 100), // age
    FeatureDomain::codes(0, 2),   // other_installment_plans
    FeatureDomain::codes(0, 2),   // housing
    FeatureDomain::codes(1, 4),   // number_credits
    FeatureDomain::codes(0, 3),   // job
    FeatureDomain::codes(1, 2),   // people_liable
    FeatureDomain::codes(0, 1),   // telephone
    FeatureDomain::codes(0, 1),   // foreign_worker
];

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Check a single value against the domain of feature `idx`.
///
/// Non-integral and non-finite values are rejected; nothing is rounded or
/// clamped.
pub fn check_domain(idx: usize, value: f64) -> Result<i64> {
    let name = FEATURE_NAMES[idx];
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(CreditError::SchemaMismatch(format!(
            "{} = {} is not an integer",
            name, value
        )));
    }
    let v = value as i64;
    let domain = FEATURE_DOMAINS[idx];
    if !domain.contains(v) {
        return Err(CreditError::SchemaMismatch(format!(
            "{} = {} is outside its domain {}",
            name, v, domain
        )));
    }
    Ok(v)
}

/// Verify that a stored name list is exactly the canonical order.
pub fn check_feature_order(names: &[String]) -> Result<()> {
    if names.len() != NUM_FEATURES {
        return Err(CreditError::SchemaMismatch(format!(
            "expected {} feature names, got {}",
            NUM_FEATURES,
            names.len()
        )));
    }
    for (pos, (got, want)) in names.iter().zip(FEATURE_NAMES.iter()).enumerate() {
        if got != want {
            return Err(CreditError::SchemaMismatch(format!(
                "feature {} is '{}', expected '{}'",
                pos, got, want
            )));
        }
    }
    Ok(())
}

/// One applicant's 20 feature values, already in their numeric domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicantRecord {
    pub checking_account_status: i64,
    pub duration_months: i64,
    pub credit_history: i64,
    pub purpose: i64,
    pub credit_amount: i64,
    pub savings_account: i64,
    pub employment_since: i64,
    pub installment_rate: i64,
    pub personal_status_sex: i64,
    pub other_debtors: i64,
    pub residence_since: i64,
    pub property_type: i64,
    pub age: i64,
    pub other_installment_plans: i64,
    pub housing: i64,
    pub number_credits: i64,
    pub job: i64,
    pub people_liable: i64,
    pub telephone: i64,
    pub foreign_worker: i64,
}

impl ApplicantRecord {
    /// Build a record from values in canonical order.
    pub fn from_values(values: &[i64]) -> Result<Self> {
        if values.len() != NUM_FEATURES {
            return Err(CreditError::SchemaMismatch(format!(
                "expected {} values, got {}",
                NUM_FEATURES,
                values.len()
            )));
        }
        Ok(Self {
            checking_account_status: values[0],
            duration_months: values[1],
            credit_history: values[2],
            purpose: values[3],
            credit_amount: values[4],
            savings_account: values[5],
            employment_since: values[6],
            installment_rate: values[7],
            personal_status_sex: values[8],
            other_debtors: values[9],
            residence_since: values[10],
            property_type: values[11],
            age: values[12],
            other_installment_plans: values[13],
            housing: values[14],
            number_credits: values[15],
            job: values[16],
            people_liable: values[17],
            telephone: values[18],
            foreign_worker: values[19],
        })
    }

    /// Values in canonical order.
    pub fn values(&self) -> [i64; NUM_FEATURES] {
        [
            self.checking_account_status,
            self.duration_months,
            self.credit_history,
            self.purpose,
            self.credit_amount,
            self.savings_account,
            self.employment_since,
            self.installment_rate,
            self.personal_status_sex,
            self.other_debtors,
            self.residence_since,
            self.property_type,
            self.age,
            self.other_installment_plans,
            self.housing,
            self.number_credits,
            self.job,
            self.people_liable,
            self.telephone,
            self.foreign_worker,
        ]
    }
}

/// Credit decision returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    /// Interpret a classifier output code. See [`LabelCodec`].
    pub fn from_class_code(code: u8) -> Result<Self> {
        match code {
            LabelCodec::GOOD_CLASS => Ok(Decision::Approved),
            LabelCodec::BAD_CLASS | LabelCodec::RAW_BAD => Ok(Decision::Rejected),
            other => Err(CreditError::UnknownClassCode(other)),
        }
    }

    pub fn class_code(&self) -> u8 {
        match self {
            Decision::Approved => LabelCodec::GOOD_CLASS,
            Decision::Rejected => LabelCodec::BAD_CLASS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping between the raw data file's `Creditability` codes and the
/// classifier's class codes.
///
/// The data file encodes good = 1 and bad = 2. The classifier is trained on
/// class codes good = 1 and bad = 0. At inference a class code of 1 is
/// approved; 0 and the raw bad code 2 are rejected; anything else is an
/// error. The codec is written into every artifact and checked on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCodec {
    pub raw_good: u8,
    pub raw_bad: u8,
    pub good_class: u8,
    pub bad_class: u8,
}

impl LabelCodec {
    pub const RAW_GOOD: u8 = 1;
    pub const RAW_BAD: u8 = 2;
    pub const GOOD_CLASS: u8 = 1;
    pub const BAD_CLASS: u8 = 0;

    pub const PINNED: LabelCodec = LabelCodec {
        raw_good: Self::RAW_GOOD,
        raw_bad: Self::RAW_BAD,
        good_class: Self::GOOD_CLASS,
        bad_class: Self::BAD_CLASS,
    };

    /// Class codes in the order the classifier reports probabilities.
    pub const CLASSES: [u8; 2] = [Self::BAD_CLASS, Self::GOOD_CLASS];

    /// Map a raw `Creditability` token to a class code.
    pub fn class_from_raw(&self, token: &str, line: usize) -> Result<u8> {
        match token.parse::<u8>() {
            Ok(v) if v == self.raw_good => Ok(self.good_class),
            Ok(v) if v == self.raw_bad => Ok(self.bad_class),
            _ => Err(CreditError::malformed(
                line,
                format!(
                    "label '{}' is not {} (good) or {} (bad)",
                    token, self.raw_good, self.raw_bad
                ),
            )),
        }
    }
}

impl Default for LabelCodec {
    fn default() -> Self {
        Self::PINNED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_code_mapping_is_pinned() {
        assert_eq!(Decision::from_class_code(1).unwrap(), Decision::Approved);
        assert_eq!(Decision::from_class_code(0).unwrap(), Decision::Rejected);
        assert_eq!(Decision::from_class_code(2).unwrap(), Decision::Rejected);
        assert!(matches!(
            Decision::from_class_code(3),
            Err(CreditError::UnknownClassCode(3))
        ));
        assert_eq!(Decision::Approved.class_code(), 1);
        assert_eq!(Decision::Rejected.class_code(), 0);
    }

    #[test]
    fn raw_labels_map_to_classes() {
        let codec = LabelCodec::PINNED;
        assert_eq!(codec.class_from_raw("1", 1).unwrap(), 1);
        assert_eq!(codec.class_from_raw("2", 1).unwrap(), 0);
        assert!(codec.class_from_raw("0", 7).is_err());
        assert!(codec.class_from_raw("good", 7).is_err());
    }

    #[test]
    fn domain_check_rejects_out_of_range_and_fractions() {
        assert_eq!(check_domain(0, 3.0).unwrap(), 3);
        assert!(check_domain(0, 9.0).is_err());
        assert!(check_domain(0, 1.5).is_err());
        assert!(check_domain(12, 17.0).is_err());
        assert!(check_domain(4, 0.0).is_err());
        assert!(check_domain(4, f64::NAN).is_err());
        assert_eq!(check_domain(4, 18424.0).unwrap(), 18424);
    }

    #[test]
    fn feature_order_must_match_exactly() {
        let mut names = feature_names();
        assert!(check_feature_order(&names).is_ok());
        names.swap(0, 1);
        assert!(check_feature_order(&names).is_err());
        names.swap(0, 1);
        names.pop();
        assert!(check_feature_order(&names).is_err());
    }

    #[test]
    fn record_values_round_trip_in_order() {
        let values = [2, 24, 1, 3, 1500, 4, 3, 4, 2, 0, 3, 2, 35, 0, 1, 1, 2, 1, 1, 1];
        let record = ApplicantRecord::from_values(&values).unwrap();
        assert_eq!(record.credit_amount, 1500);
        assert_eq!(record.age, 35);
        assert_eq!(record.values(), values);
        assert!(ApplicantRecord::from_values(&values[..19]).is_err());
    }
}
