//! Declared field constraints checked before reconciliation.
//!
//! A [`RecordSchema`] collects every violation in a record (missing required
//! fields, wrong types, out-of-range values) rather than stopping at the
//! first one, and fills declared defaults for absent optional fields.

use loanrisk_core::{FieldViolation, LoanRiskError, RawRecord, Result, Scalar, SchemaPreset};

/// Type and range constraint for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Whole number within `[min, max]`.
    Integer {
        /// Inclusive lower bound.
        min: Option<i64>,
        /// Inclusive upper bound.
        max: Option<i64>,
    },
    /// Any number within the bounds.
    Number {
        /// Lower bound.
        min: Option<f64>,
        /// Inclusive upper bound.
        max: Option<f64>,
        /// Treat `min` as exclusive.
        exclusive_min: bool,
    },
    /// String with a length window (in characters).
    Text {
        /// Minimum length.
        min_len: Option<usize>,
        /// Maximum length.
        max_len: Option<usize>,
    },
}

/// One declared input field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Type constraint.
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
    /// Value filled in when an optional field is absent.
    pub default: Option<Scalar>,
}

impl FieldSpec {
    /// Required integer field.
    pub fn integer(name: &str, min: Option<i64>, max: Option<i64>) -> Self {
        Self::required(name, FieldKind::Integer { min, max })
    }

    /// Required number field with inclusive bounds.
    pub fn number(name: &str, min: Option<f64>, max: Option<f64>) -> Self {
        Self::required(
            name,
            FieldKind::Number {
                min,
                max,
                exclusive_min: false,
            },
        )
    }

    /// Required number field with an exclusive lower bound.
    pub fn positive_number(name: &str, max: Option<f64>) -> Self {
        Self::required(
            name,
            FieldKind::Number {
                min: Some(0.0),
                max,
                exclusive_min: true,
            },
        )
    }

    /// Required text field.
    pub fn text(name: &str) -> Self {
        Self::required(
            name,
            FieldKind::Text {
                min_len: None,
                max_len: None,
            },
        )
    }

    /// Required text field of exactly `len` characters.
    pub fn fixed_text(name: &str, len: usize) -> Self {
        Self::required(
            name,
            FieldKind::Text {
                min_len: Some(len),
                max_len: Some(len),
            },
        )
    }

    fn required(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            default: None,
        }
    }

    /// Make the field optional, filled with `default` when absent.
    #[must_use]
    pub fn optional(mut self, default: impl Into<Scalar>) -> Self {
        self.required = false;
        self.default = Some(default.into());
        self
    }

    fn check(&self, value: &Scalar) -> Option<String> {
        match &self.kind {
            FieldKind::Integer { min, max } => {
                let v = match value {
                    Scalar::Integer(v) => *v,
                    Scalar::Float(f) if f.fract() == 0.0 && f.is_finite() => *f as i64,
                    other => return Some(format!("expected an integer, got {}", other.kind())),
                };
                if let Some(min) = min {
                    if v < *min {
                        return Some(format!("must be at least {min}, got {v}"));
                    }
                }
                if let Some(max) = max {
                    if v > *max {
                        return Some(format!("must be at most {max}, got {v}"));
                    }
                }
                None
            }
            FieldKind::Number {
                min,
                max,
                exclusive_min,
            } => {
                let v = match value {
                    Scalar::Integer(v) => *v as f64,
                    Scalar::Float(f) => *f,
                    other => return Some(format!("expected a number, got {}", other.kind())),
                };
                if let Some(min) = min {
                    if *exclusive_min && v <= *min {
                        return Some(format!("must be greater than {min}, got {v}"));
                    }
                    if !*exclusive_min && v < *min {
                        return Some(format!("must be at least {min}, got {v}"));
                    }
                }
                if let Some(max) = max {
                    if v > *max {
                        return Some(format!("must be at most {max}, got {v}"));
                    }
                }
                None
            }
            FieldKind::Text { min_len, max_len } => {
                let Scalar::Text(s) = value else {
                    return Some(format!("expected a string, got {}", value.kind()));
                };
                let len = s.chars().count();
                if let Some(min) = min_len {
                    if len < *min {
                        return Some(format!("must be at least {min} characters, got {len}"));
                    }
                }
                if let Some(max) = max_len {
                    if len > *max {
                        return Some(format!("must be at most {max} characters, got {len}"));
                    }
                }
                None
            }
        }
    }
}

/// Ordered set of declared fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSchema {
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Schema from explicit field specs.
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Schema for a built-in preset.
    pub fn from_preset(preset: SchemaPreset) -> Self {
        match preset {
            SchemaPreset::Mortgage => Self::mortgage(),
            SchemaPreset::Sample => Self::sample(),
            SchemaPreset::None => Self::default(),
        }
    }

    /// Loan-level mortgage application fields.
    pub fn mortgage() -> Self {
        Self::new(vec![
            FieldSpec::integer("CreditScore", Some(300), Some(850)),
            FieldSpec::positive_number("OrigUPB", None),
            FieldSpec::positive_number("OrigInterestRate", Some(20.0)),
            FieldSpec::integer("OrigLoanTerm", Some(60), Some(480)),
            FieldSpec::integer("DTI", Some(0), Some(100)),
            FieldSpec::integer("LTV", Some(1), Some(150)),
            FieldSpec::integer("OCLTV", Some(1), Some(150)),
            FieldSpec::integer("MIP", Some(0), Some(100)),
            FieldSpec::integer("Units", Some(1), Some(4)).optional(1),
            FieldSpec::integer("NumBorrowers", Some(1), Some(8)),
            FieldSpec::fixed_text("PropertyState", 2),
            FieldSpec::text("PropertyType"),
            FieldSpec::fixed_text("PostalCode", 5),
            FieldSpec::text("MSA"),
            FieldSpec::text("FirstTimeHomebuyer"),
            FieldSpec::text("Occupancy"),
            FieldSpec::text("LoanPurpose"),
            FieldSpec::text("Channel"),
            FieldSpec::text("PPM"),
            FieldSpec::text("ProductType"),
            FieldSpec::integer("FirstPaymentDate", Some(199001), Some(209912)),
            FieldSpec::integer("MaturityDate", Some(199001), Some(209912)),
            FieldSpec::text("SellerName"),
            FieldSpec::text("ServicerName"),
            FieldSpec::integer("MonthsDelinquent", Some(0), None).optional(0),
            FieldSpec::integer("MonthsInRepayment", Some(0), None).optional(0),
        ])
    }

    /// Two-field age/salary schema.
    pub fn sample() -> Self {
        Self::new(vec![
            FieldSpec::number("age", Some(0.0), Some(120.0)),
            FieldSpec::number("salary", Some(0.0), None),
        ])
    }

    /// Declared fields.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Whether the schema declares nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check `record` and fill defaults for absent optional fields.
    ///
    /// Undeclared fields pass through untouched.
    ///
    /// # Errors
    ///
    /// [`LoanRiskError::Validation`] listing every violated constraint.
    pub fn validate(&self, mut record: RawRecord) -> Result<RawRecord> {
        let mut violations = Vec::new();

        for spec in &self.fields {
            match record.get(&spec.name) {
                Some(value) => {
                    if let Some(message) = spec.check(value) {
                        violations.push(FieldViolation::new(&spec.name, message));
                    }
                }
                None if spec.required => {
                    violations.push(FieldViolation::new(&spec.name, "field is required"));
                }
                None => {
                    if let Some(default) = &spec.default {
                        record.insert(spec.name.clone(), default.clone());
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(record)
        } else {
            Err(LoanRiskError::Validation(violations))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
