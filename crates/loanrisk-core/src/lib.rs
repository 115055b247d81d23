//! Core types, traits, and errors for loanrisk
//!
//! This crate contains the data model shared by the training step, the
//! feature reconciler and the prediction service: raw records, the frozen
//! preprocessing descriptor, the [`Classifier`] seam, configuration types and
//! the crate-wide error type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// A single typed field value in a raw record.
///
/// Dates travel as integers in `YYYYMM` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Free-form or categorical string.
    Text(String),
}

impl Scalar {
    /// Convert a JSON value into a scalar.
    ///
    /// Returns `None` for `null`, booleans, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Scalar::Integer)
                .or_else(|| n.as_f64().map(Scalar::Float)),
            serde_json::Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }

    /// Numeric view of the value. Text is accepted when it parses as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Canonical category string used by the encoders.
    ///
    /// Integral floats print without a fractional part so that `31080` and
    /// `31080.0` land on the same category.
    pub fn as_category(&self) -> String {
        match self {
            Scalar::Integer(v) => v.to_string(),
            Scalar::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                format!("{}", *v as i64)
            }
            Scalar::Float(v) => v.to_string(),
            Scalar::Text(s) => s.trim().to_string(),
        }
    }

    /// Short type label for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Integer(_) => "integer",
            Scalar::Float(_) => "number",
            Scalar::Text(_) => "string",
        }
    }

    /// Convert back into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Integer(v) => serde_json::Value::from(*v),
            Scalar::Float(v) => serde_json::Value::from(*v),
            Scalar::Text(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Integer(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Integer(i64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// One record to score: a flat mapping from field name to scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, Scalar>,
}

impl RawRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object.
    ///
    /// `null` fields are treated as absent. Booleans, arrays and nested
    /// objects are rejected, with every offending field reported.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            LoanRiskError::Validation(vec![FieldViolation::new(
                "$",
                "expected a JSON object of field values",
            )])
        })?;

        let mut record = Self::new();
        let mut violations = Vec::new();
        for (name, raw) in object {
            if raw.is_null() {
                continue;
            }
            match Scalar::from_json(raw) {
                Some(scalar) => {
                    record.fields.insert(name.clone(), scalar);
                }
                None => violations.push(FieldViolation::new(
                    name,
                    "expected a number or a string",
                )),
            }
        }

        if violations.is_empty() {
            Ok(record)
        } else {
            Err(LoanRiskError::Validation(violations))
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        self.fields.insert(name.into(), value.into())
    }

    /// Remove a field.
    pub fn remove(&mut self, name: &str) -> Option<Scalar> {
        self.fields.remove(name)
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.get(name)
    }

    /// Whether the record carries `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render the record as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Encoders
// ---------------------------------------------------------------------------

/// Frozen label encoder: sorted categories, code = position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// Observed categories, sorted ascending and de-duplicated.
    pub classes: Vec<String>,
    /// Code substituted for categories never seen during fitting.
    #[serde(default)]
    pub fallback: i64,
}

impl LabelEncoder {
    /// Fit over the given categories.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            classes: sorted_unique(values),
            fallback: 0,
        }
    }

    /// Code for a category, or `None` when it was not seen during fitting.
    pub fn transform(&self, category: &str) -> Option<i64> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
            .map(|idx| idx as i64)
    }

    /// Code for a category, substituting the fallback for unseen values.
    pub fn encode(&self, category: &str) -> i64 {
        self.transform(category).unwrap_or(self.fallback)
    }

    /// Number of known categories.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the encoder knows no categories.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Frozen one-hot encoder with drop-first semantics.
///
/// `categories[0]` is the reference category and has no indicator column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Observed categories, sorted ascending and de-duplicated.
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    /// Fit over the given categories.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            categories: sorted_unique(values),
        }
    }

    /// Name of the indicator column for `category` of `column`.
    pub fn indicator_name(column: &str, category: &str) -> String {
        format!("{column}_{category}")
    }

    /// The dropped reference category.
    pub fn reference(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Indicator columns generated at fitting time, in category order.
    pub fn indicator_names(&self, column: &str) -> Vec<String> {
        self.categories
            .iter()
            .skip(1)
            .map(|c| Self::indicator_name(column, c))
            .collect()
    }

    /// Indicator column set to one for `category`.
    ///
    /// Reference and unseen categories yield `None` (an all-zero row).
    pub fn indicator_for(&self, column: &str, category: &str) -> Option<String> {
        match self.categories.binary_search_by(|c| c.as_str().cmp(category)) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(Self::indicator_name(column, category)),
        }
    }
}

fn sorted_unique<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();
    out.sort();
    out.dedup();
    out
}

// ---------------------------------------------------------------------------
// Preprocessing descriptor
// ---------------------------------------------------------------------------

/// How one raw column is turned into features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// Numeric passthrough.
    Numeric,
    /// Dense integer code.
    Label(LabelEncoder),
    /// Indicator expansion with a dropped reference category.
    OneHot(OneHotEncoder),
}

/// A raw column known to the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Raw field name.
    pub name: String,
    /// Encoding applied to the field.
    pub encoding: ColumnEncoding,
}

impl ColumnSpec {
    /// Numeric passthrough column.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoding: ColumnEncoding::Numeric,
        }
    }

    /// Label-encoded column.
    pub fn label(name: impl Into<String>, encoder: LabelEncoder) -> Self {
        Self {
            name: name.into(),
            encoding: ColumnEncoding::Label(encoder),
        }
    }

    /// One-hot column.
    pub fn one_hot(name: impl Into<String>, encoder: OneHotEncoder) -> Self {
        Self {
            name: name.into(),
            encoding: ColumnEncoding::OneHot(encoder),
        }
    }
}

/// Summary of the fit that produced a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Rows in the training split.
    pub train_rows: usize,
    /// Rows in the held-out split.
    pub test_rows: usize,
    /// Accuracy on the training split.
    pub train_accuracy: f64,
    /// Accuracy on the held-out split.
    pub test_accuracy: f64,
    /// Held-out precision for class 1.
    pub precision: f64,
    /// Held-out recall for class 1.
    pub recall: f64,
    /// Held-out F1 for class 1.
    pub f1: f64,
}

/// Frozen schema-transformation recipe, produced at training time and
/// replayed per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingDescriptor {
    /// Raw columns consumed by the model, in dataset order.
    pub columns: Vec<ColumnSpec>,
    /// Final ordered feature list expected by the classifier.
    pub feature_names: Vec<String>,
    /// Target column the model was fit on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// When the descriptor was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
    /// Fit summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingSummary>,
}

impl PreprocessingDescriptor {
    /// Build a descriptor whose feature list is derived from `columns`.
    pub fn from_columns(columns: Vec<ColumnSpec>) -> Self {
        let feature_names = columns
            .iter()
            .flat_map(|col| match &col.encoding {
                ColumnEncoding::Numeric | ColumnEncoding::Label(_) => vec![col.name.clone()],
                ColumnEncoding::OneHot(enc) => enc.indicator_names(&col.name),
            })
            .collect();
        Self {
            columns,
            feature_names,
            target: None,
            trained_at: None,
            training: None,
        }
    }

    /// Length of the feature vector.
    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Look up a raw column.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Label-encoded columns in descriptor order.
    pub fn label_encoders(&self) -> impl Iterator<Item = (&str, &LabelEncoder)> {
        self.columns.iter().filter_map(|c| match &c.encoding {
            ColumnEncoding::Label(enc) => Some((c.name.as_str(), enc)),
            _ => None,
        })
    }

    /// One-hot columns in descriptor order.
    pub fn one_hot_columns(&self) -> impl Iterator<Item = (&str, &OneHotEncoder)> {
        self.columns.iter().filter_map(|c| match &c.encoding {
            ColumnEncoding::OneHot(enc) => Some((c.name.as_str(), enc)),
            _ => None,
        })
    }

    /// Numeric passthrough columns in descriptor order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| match c.encoding {
            ColumnEncoding::Numeric => Some(c.name.as_str()),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Classifier seam
// ---------------------------------------------------------------------------

/// An opaque binary scorer over a fixed-length feature vector.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Human-readable model type (e.g. `"LogisticRegression"`).
    fn type_name(&self) -> &'static str;

    /// Expected input dimensionality.
    fn n_features(&self) -> usize;

    /// Probability of class 1.
    fn predict_proba(&self, features: &[f64]) -> Result<f64>;

    /// Predicted class (0 or 1).
    fn predict(&self, features: &[f64]) -> Result<u8> {
        Ok(u8::from(self.predict_proba(features)? >= 0.5))
    }
}

/// Coarse risk band derived from the class-1 probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Probability at most 0.3.
    Low,
    /// Probability at most 0.7.
    Medium,
    /// Anything above.
    High,
}

impl RiskLevel {
    /// Band a probability.
    pub fn from_probability(probability: f64) -> Self {
        if probability <= 0.3 {
            RiskLevel::Low
        } else if probability <= 0.7 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// Outcome of scoring one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class, 0 or 1.
    pub class: u8,
    /// Probability of class 1.
    pub probability: f64,
}

impl Prediction {
    /// Risk band of this prediction.
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_probability(self.probability)
    }
}

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// Configuration for the prediction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address and port to bind the HTTP server to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Artifact locations.
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    /// Boundary validation applied before reconciliation.
    #[serde(default)]
    pub input_schema: SchemaPreset,
    /// Maximum records accepted by `/predict-batch`.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Include `probability` and `risk_level` in responses.
    #[serde(default = "default_true")]
    pub include_probability: bool,
    /// Echo validated input fields in `/predict` responses.
    #[serde(default)]
    pub echo_features: bool,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_max_batch_size() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            artifacts: ArtifactsConfig::default(),
            input_schema: SchemaPreset::default(),
            max_batch_size: default_max_batch_size(),
            include_probability: true,
            echo_features: false,
            logging: LoggingConfig::default(),
        }
    }
}

/// Filesystem locations of the persisted artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Serialized classifier.
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Serialized preprocessing descriptor.
    #[serde(default = "default_descriptor_path")]
    pub descriptor_path: String,
}

fn default_model_path() -> String {
    "model.json".to_string()
}

fn default_descriptor_path() -> String {
    "preprocessing.json".to_string()
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            descriptor_path: default_descriptor_path(),
        }
    }
}

/// Built-in input schemas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPreset {
    /// Loan-level mortgage application fields.
    #[default]
    Mortgage,
    /// Two-field age/salary toy schema.
    Sample,
    /// No boundary validation.
    None,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `text` (human-readable) or `json` (structured).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A single failed constraint on an input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Offending field (`$` for the record itself).
    pub field: String,
    /// What was wrong.
    pub message: String,
}

impl FieldViolation {
    /// Create a violation.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum LoanRiskError {
    /// Artifact missing, unreadable or inconsistent.
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input record violates declared field constraints.
    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// A field the descriptor requires is absent from the record.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The absent field.
        field: String,
    },

    /// Feature vector does not fit the classifier.
    #[error("Feature vector has {actual} features, classifier expects {expected}")]
    ShapeMismatch {
        /// Classifier input dimension.
        expected: usize,
        /// Reconciled vector length.
        actual: usize,
    },

    /// Training step failure.
    #[error("Training error: {0}")]
    Training(String),
}

impl LoanRiskError {
    /// Whether the error is the caller's fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LoanRiskError::Validation(_) | LoanRiskError::MissingField { .. }
        )
    }
}

/// Convenience alias for `std::result::Result<T, LoanRiskError>`.
pub type Result<T> = std::result::Result<T, LoanRiskError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_category_normalises_integral_floats() {
        assert_eq!(Scalar::Float(31080.0).as_category(), "31080");
        assert_eq!(Scalar::Integer(31080).as_category(), "31080");
        assert_eq!(Scalar::Float(3.75).as_category(), "3.75");
        assert_eq!(Scalar::from("  CA ").as_category(), "CA");
    }

    #[test]
    fn test_scalar_as_f64_parses_numeric_text() {
        assert_eq!(Scalar::from("12.5").as_f64(), Some(12.5));
        assert_eq!(Scalar::from("SF").as_f64(), None);
        assert_eq!(Scalar::Integer(7).as_f64(), Some(7.0));
    }

    #[test]
    fn test_scalar_untagged_deserialization() {
        let values: Vec<Scalar> = serde_json::from_str(r#"[1, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![Scalar::Integer(1), Scalar::Float(2.5), Scalar::from("x")]
        );
    }

    #[test]
    fn test_raw_record_from_json_skips_nulls() {
        let record = RawRecord::from_json(&json!({"a": 1, "b": null, "c": "x"})).unwrap();
        assert_eq!(record.len(), 2);
        assert!(!record.contains("b"));
        assert_eq!(record.get("c"), Some(&Scalar::from("x")));
    }

    #[test]
    fn test_raw_record_from_json_rejects_nested_values() {
        let err = RawRecord::from_json(&json!({"a": [1], "b": {"c": 1}, "d": true})).unwrap_err();
        match err {
            LoanRiskError::Validation(v) => {
                let fields: Vec<_> = v.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(fields, vec!["a", "b", "d"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_raw_record_from_json_rejects_non_object() {
        let err = RawRecord::from_json(&json!([1, 2])).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_label_encoder_fit_sorts_and_dedups() {
        let enc = LabelEncoder::fit(["WELLS", "CHASE", "WELLS", "BOFA"]);
        assert_eq!(enc.classes, vec!["BOFA", "CHASE", "WELLS"]);
        assert_eq!(enc.transform("CHASE"), Some(1));
        assert_eq!(enc.transform("OTHER"), None);
        assert_eq!(enc.encode("OTHER"), 0);
    }

    #[test]
    fn test_one_hot_encoder_drops_reference() {
        let enc = OneHotEncoder::fit(["SF", "CO", "PU", "CO"]);
        assert_eq!(enc.reference(), Some("CO"));
        assert_eq!(
            enc.indicator_names("PropertyType"),
            vec!["PropertyType_PU", "PropertyType_SF"]
        );
        assert_eq!(enc.indicator_for("PropertyType", "CO"), None);
        assert_eq!(enc.indicator_for("PropertyType", "MH"), None);
        assert_eq!(
            enc.indicator_for("PropertyType", "SF").as_deref(),
            Some("PropertyType_SF")
        );
    }

    #[test]
    fn test_descriptor_from_columns_orders_features() {
        let desc = PreprocessingDescriptor::from_columns(vec![
            ColumnSpec::numeric("CreditScore"),
            ColumnSpec::one_hot("Occupancy", OneHotEncoder::fit(["I", "O", "S"])),
            ColumnSpec::label("MSA", LabelEncoder::fit(["31080"])),
        ]);
        assert_eq!(
            desc.feature_names,
            vec!["CreditScore", "Occupancy_O", "Occupancy_S", "MSA"]
        );
        assert_eq!(desc.feature_count(), 4);
        assert_eq!(desc.label_encoders().count(), 1);
        assert_eq!(desc.one_hot_columns().count(), 1);
        assert_eq!(desc.numeric_columns().collect::<Vec<_>>(), vec!["CreditScore"]);
    }

    #[test]
    fn test_descriptor_serialization_roundtrip_keeps_encodings() {
        let desc = PreprocessingDescriptor::from_columns(vec![
            ColumnSpec::numeric("LTV"),
            ColumnSpec::label("SellerName", LabelEncoder::fit(["A", "B"])),
        ]);
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["columns"][1]["encoding"]["type"], "label");
        assert_eq!(json["columns"][0]["encoding"]["type"], "numeric");
        let back: PreprocessingDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_label_encoder_fallback_defaults_to_zero_when_absent() {
        let enc: LabelEncoder = serde_json::from_str(r#"{"classes": ["a", "b"]}"#).unwrap();
        assert_eq!(enc.fallback, 0);
    }

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_probability(0.3), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.31), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.7), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.71), RiskLevel::High);
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.input_schema, SchemaPreset::Mortgage);
        assert!(config.include_probability);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_server_config_partial_yaml_uses_defaults() {
        let config: ServerConfig = serde_yaml::from_str("input_schema: sample\n").unwrap();
        assert_eq!(config.input_schema, SchemaPreset::Sample);
        assert_eq!(config.artifacts.model_path, "model.json");
        assert_eq!(config.artifacts.descriptor_path, "preprocessing.json");
    }

    #[test]
    fn test_error_display_lists_violations() {
        let err = LoanRiskError::Validation(vec![
            FieldViolation::new("LTV", "must be at most 150"),
            FieldViolation::new("DTI", "is required"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: LTV: must be at most 150; DTI: is required"
        );
        assert!(err.is_client_error());
        assert!(!LoanRiskError::ShapeMismatch {
            expected: 2,
            actual: 3
        }
        .is_client_error());
    }
}
