//! Inference-time feature reconciliation.
//!
//! Turns one [`RawRecord`] into the exact feature vector the classifier was
//! fit on, replaying the frozen [`PreprocessingDescriptor`]:
//!
//! | Column encoding | Contribution                                              |
//! |-----------------|-----------------------------------------------------------|
//! | `numeric`       | the value itself (numeric text accepted)                  |
//! | `label`         | dense code, or the encoder fallback for unseen categories |
//! | `one_hot`       | `{column}_{category} = 1`; reference/unseen add nothing   |
//!
//! Only descriptor columns derive values; record fields the descriptor does
//! not declare are ignored, even when they share a name with a feature.
//! Every feature name with no derived value is zero, and the result follows
//! `feature_names` order exactly.
//!
//! A declared column whose key is absent from the record is a client error;
//! only unseen *categories* of present fields fall back to a default.

use loanrisk_core::{
    ColumnEncoding, FieldViolation, LoanRiskError, PreprocessingDescriptor, RawRecord, Result,
};
use std::collections::HashMap;

/// Reconcile `record` against `descriptor`.
///
/// Returns a vector of length `descriptor.feature_count()`.
///
/// # Errors
///
/// * [`LoanRiskError::MissingField`] when a descriptor column is absent.
/// * [`LoanRiskError::Validation`] when a numeric column holds non-numeric text.
pub fn reconcile(record: &RawRecord, descriptor: &PreprocessingDescriptor) -> Result<Vec<f64>> {
    let mut derived: HashMap<String, f64> = HashMap::with_capacity(descriptor.feature_count());
    let mut violations = Vec::new();

    for column in &descriptor.columns {
        let value = record
            .get(&column.name)
            .ok_or_else(|| LoanRiskError::MissingField {
                field: column.name.clone(),
            })?;

        match &column.encoding {
            ColumnEncoding::Numeric => match value.as_f64() {
                Some(v) => {
                    derived.insert(column.name.clone(), v);
                }
                None => violations.push(FieldViolation::new(
                    &column.name,
                    format!("expected a numeric value, got {} '{}'", value.kind(), value),
                )),
            },
            ColumnEncoding::Label(encoder) => {
                let code = encoder.encode(&value.as_category());
                derived.insert(column.name.clone(), code as f64);
            }
            ColumnEncoding::OneHot(encoder) => {
                if let Some(indicator) = encoder.indicator_for(&column.name, &value.as_category()) {
                    derived.insert(indicator, 1.0);
                }
            }
        }
    }

    if !violations.is_empty() {
        return Err(LoanRiskError::Validation(violations));
    }

    Ok(descriptor
        .feature_names
        .iter()
        .map(|name| derived.get(name).copied().unwrap_or(0.0))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use loanrisk_core::{ColumnSpec, LabelEncoder, OneHotEncoder};

    fn descriptor() -> PreprocessingDescriptor {
        PreprocessingDescriptor::from_columns(vec![
            ColumnSpec::numeric("CreditScore"),
            ColumnSpec::numeric("LTV"),
            ColumnSpec::one_hot("PropertyState", OneHotEncoder::fit(["AZ", "CA", "FL", "TX"])),
            ColumnSpec::label("SellerName", LabelEncoder::fit(["BOFA", "CHASE", "WELLS"])),
            ColumnSpec::one_hot("Occupancy", OneHotEncoder::fit(["I", "O", "S"])),
        ])
    }

    fn record(state: &str) -> RawRecord {
        RawRecord::new()
            .with("CreditScore", 750)
            .with("LTV", 80)
            .with("PropertyState", state)
            .with("SellerName", "WELLS")
            .with("Occupancy", "O")
    }

    #[test]
    fn test_known_categories_layout() {
        let desc = descriptor();
        let v = reconcile(&record("CA"), &desc).unwrap();
        // CreditScore, LTV, PropertyState_CA, _FL, _TX, SellerName, Occupancy_O, _S
        assert_eq!(v, vec![750.0, 80.0, 1.0, 0.0, 0.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let desc = descriptor();
        let a = reconcile(&record("CA"), &desc).unwrap();
        let b = reconcile(&record("CA"), &desc).unwrap();
        let bits_a: Vec<u64> = a.iter().map(|x| x.to_bits()).collect();
        let bits_b: Vec<u64> = b.iter().map(|x| x.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_unseen_category_matches_reference_category() {
        let desc = descriptor();
        let unseen = reconcile(&record("ZZ"), &desc).unwrap();
        let reference = reconcile(&record("AZ"), &desc).unwrap();
        assert_eq!(unseen, reference);
        assert_eq!(unseen.len(), desc.feature_count());
    }

    #[test]
    fn test_unseen_label_uses_fallback() {
        let mut desc = descriptor();
        let v = reconcile(&record("CA").with("SellerName", "NOBODY"), &desc).unwrap();
        assert_eq!(v[5], 0.0);

        for col in &mut desc.columns {
            if let ColumnEncoding::Label(enc) = &mut col.encoding {
                enc.fallback = -1;
            }
        }
        let v = reconcile(&record("CA").with("SellerName", "NOBODY"), &desc).unwrap();
        assert_eq!(v[5], -1.0);
    }

    #[test]
    fn test_missing_key_is_rejected_not_zeroed() {
        let desc = descriptor();
        let mut rec = record("CA");
        rec.remove("LTV");
        match reconcile(&rec, &desc) {
            Err(LoanRiskError::MissingField { field }) => assert_eq!(field, "LTV"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_fields_are_dropped() {
        let desc = descriptor();
        let rec = record("TX").with("Unused", 42).with("Note", "hello");
        let v = reconcile(&rec, &desc).unwrap();
        assert_eq!(v.len(), desc.feature_count());
        assert_eq!(v[4], 1.0);
    }

    #[test]
    fn test_numeric_text_is_accepted() {
        let desc = descriptor();
        let v = reconcile(&record("CA").with("LTV", "95"), &desc).unwrap();
        assert_eq!(v[1], 95.0);
    }

    #[test]
    fn test_non_numeric_text_in_numeric_column_is_validation_error() {
        let desc = descriptor();
        let err = reconcile(&record("CA").with("LTV", "high"), &desc).unwrap_err();
        assert!(matches!(err, LoanRiskError::Validation(ref v) if v[0].field == "LTV"));
    }

    #[test]
    fn test_integer_categories_match_text_categories() {
        let desc = PreprocessingDescriptor::from_columns(vec![ColumnSpec::label(
            "MSA",
            LabelEncoder::fit(["10180", "31080"]),
        )]);
        let from_int = reconcile(&RawRecord::new().with("MSA", 31080), &desc).unwrap();
        let from_text = reconcile(&RawRecord::new().with("MSA", "31080"), &desc).unwrap();
        assert_eq!(from_int, vec![1.0]);
        assert_eq!(from_int, from_text);
    }

    #[test]
    fn test_request_cannot_set_indicator_columns() {
        let desc = descriptor();
        let reference = reconcile(&record("AZ"), &desc).unwrap();
        let forged = record("ZZ")
            .with("PropertyState_FL", 42)
            .with("Occupancy_S", 1);
        assert_eq!(reconcile(&forged, &desc).unwrap(), reference);
    }

    #[test]
    fn test_undeclared_feature_names_stay_zero() {
        let desc = PreprocessingDescriptor {
            columns: vec![ColumnSpec::numeric("age")],
            feature_names: vec!["age".into(), "bonus".into()],
            target: None,
            trained_at: None,
            training: None,
        };
        let rec = RawRecord::new().with("age", 35).with("bonus", 5000);
        assert_eq!(reconcile(&rec, &desc).unwrap(), vec![35.0, 0.0]);
    }
}
