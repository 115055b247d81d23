//! Fitting the preprocessing descriptor on the training split.
//!
//! Per-column rules:
//!
//! - configured label columns → [`LabelEncoder`] over training categories;
//! - configured one-hot columns → [`OneHotEncoder`] (drop-first);
//! - every other column → numeric when all its values are numeric, with
//!   missing cells imputed by the training-split median; non-numeric leftovers
//!   are dropped.
//!
//! Missing categorical cells become [`UNKNOWN_CATEGORY`]. Transformation goes
//! through [`loanrisk_model::reconcile`], so training rows and served records
//! take exactly the same path.

use crate::data::Row;
use loanrisk_core::{
    ColumnEncoding, ColumnSpec, LabelEncoder, LoanRiskError, OneHotEncoder,
    PreprocessingDescriptor, RawRecord, Result, Scalar,
};
use loanrisk_model::reconcile;
use std::collections::HashMap;
use tracing::{info, warn};

/// Category substituted for missing categorical cells.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Label-encoded columns used when none are configured.
pub const DEFAULT_LABEL_COLUMNS: [&str; 4] = ["PostalCode", "MSA", "SellerName", "ServicerName"];

/// One-hot columns used when none are configured.
pub const DEFAULT_ONE_HOT_COLUMNS: [&str; 8] = [
    "PropertyState",
    "PropertyType",
    "FirstTimeHomebuyer",
    "Occupancy",
    "LoanPurpose",
    "Channel",
    "PPM",
    "ProductType",
];

/// Which columns receive which categorical encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    /// High-cardinality columns, label encoded.
    pub label_columns: Vec<String>,
    /// Low-cardinality columns, one-hot encoded.
    pub one_hot_columns: Vec<String>,
}

impl ColumnRoles {
    /// No categorical columns; everything numeric.
    pub fn numeric_only() -> Self {
        Self {
            label_columns: Vec::new(),
            one_hot_columns: Vec::new(),
        }
    }
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            label_columns: DEFAULT_LABEL_COLUMNS.iter().map(|s| s.to_string()).collect(),
            one_hot_columns: DEFAULT_ONE_HOT_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Descriptor plus the imputation values learned alongside it.
#[derive(Debug, Clone)]
pub struct FittedPreprocessor {
    /// Frozen descriptor.
    pub descriptor: PreprocessingDescriptor,
    /// Training-split median per numeric column.
    pub medians: HashMap<String, f64>,
}

fn category_of(row: &Row, column: &str) -> String {
    row.get(column)
        .map(Scalar::as_category)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}

/// Median of `values`; the mean of the two middle values for even counts.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

impl FittedPreprocessor {
    /// Fit encoders and medians over `rows` (the training split).
    ///
    /// # Errors
    ///
    /// [`LoanRiskError::Training`] when no usable feature column remains.
    pub fn fit(columns: &[String], rows: &[&Row], roles: &ColumnRoles) -> Result<Self> {
        for configured in roles.label_columns.iter().chain(&roles.one_hot_columns) {
            if !columns.contains(configured) {
                warn!(column = %configured, "Configured categorical column not in dataset");
            }
        }

        let mut specs = Vec::new();
        let mut medians = HashMap::new();

        for column in columns {
            if roles.label_columns.contains(column) {
                let encoder = LabelEncoder::fit(rows.iter().map(|r| category_of(r, column)));
                info!(column = %column, classes = encoder.len(), "Label encoding");
                specs.push(ColumnSpec::label(column.clone(), encoder));
            } else if roles.one_hot_columns.contains(column) {
                let encoder = OneHotEncoder::fit(rows.iter().map(|r| category_of(r, column)));
                info!(
                    column = %column,
                    categories = encoder.categories.len(),
                    reference = encoder.reference().unwrap_or_default(),
                    "One-hot encoding"
                );
                specs.push(ColumnSpec::one_hot(column.clone(), encoder));
            } else {
                let present: Vec<&Scalar> = rows.iter().filter_map(|r| r.get(column)).collect();
                let mut numeric: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
                if numeric.len() != present.len() {
                    warn!(column = %column, "Dropping non-numeric column without an encoder");
                    continue;
                }
                match median(&mut numeric) {
                    Some(m) => {
                        medians.insert(column.clone(), m);
                        specs.push(ColumnSpec::numeric(column.clone()));
                    }
                    None => {
                        warn!(column = %column, "Dropping column with no values in training split");
                    }
                }
            }
        }

        let descriptor = PreprocessingDescriptor::from_columns(specs);
        if descriptor.feature_names.is_empty() {
            return Err(LoanRiskError::Training(
                "no usable feature columns after preprocessing".to_string(),
            ));
        }
        info!(
            features = descriptor.feature_count(),
            encoded = descriptor.label_encoders().count(),
            one_hot = descriptor.one_hot_columns().count(),
            "Fitted preprocessing descriptor"
        );

        Ok(Self {
            descriptor,
            medians,
        })
    }

    /// Fill missing cells of a dataset row and keep only descriptor columns.
    pub fn impute(&self, row: &Row) -> RawRecord {
        let mut record = RawRecord::new();
        for column in &self.descriptor.columns {
            let value = match &column.encoding {
                ColumnEncoding::Numeric => row
                    .get(&column.name)
                    .and_then(Scalar::as_f64)
                    .or_else(|| self.medians.get(&column.name).copied())
                    .map(Scalar::Float),
                ColumnEncoding::Label(_) | ColumnEncoding::OneHot(_) => {
                    Some(Scalar::Text(category_of(row, &column.name)))
                }
            };
            if let Some(value) = value {
                record.insert(column.name.clone(), value);
            }
        }
        record
    }

    /// Impute and reconcile one row into a feature vector.
    pub fn transform(&self, row: &Row) -> Result<Vec<f64>> {
        reconcile(&self.impute(row), &self.descriptor)
    }

    /// Transform many rows.
    pub fn transform_all(&self, rows: &[&Row]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
