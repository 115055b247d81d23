//! Dataset loading, label extraction, and stratified splitting.

use loanrisk_core::{LoanRiskError, Result, Scalar};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// One dataset row. Null cells are absent.
pub type Row = HashMap<String, Scalar>;

/// Tabular dataset with a stable column order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Column names in first-seen order.
    pub columns: Vec<String>,
    /// Rows.
    pub rows: Vec<Row>,
}

/// Rows paired with their 0/1 target.
#[derive(Debug, Clone)]
pub struct LabeledData {
    /// Feature column names in first-seen order.
    pub columns: Vec<String>,
    /// Rows without the target column.
    pub rows: Vec<Row>,
    /// Target per row.
    pub labels: Vec<u8>,
}

/// Train/test row indices.
#[derive(Debug, Clone)]
pub struct Split {
    /// Rows used for fitting.
    pub train: Vec<usize>,
    /// Held-out rows.
    pub test: Vec<usize>,
}

fn cell_from_json(column: &str, value: &serde_json::Value) -> Result<Option<Scalar>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Bool(b) => Ok(Some(Scalar::Integer(i64::from(*b)))),
        other => Scalar::from_json(other).map(Some).ok_or_else(|| {
            LoanRiskError::Training(format!(
                "column '{column}' holds a nested value; only scalars are supported"
            ))
        }),
    }
}

impl Dataset {
    /// Build a dataset from JSON objects.
    pub fn from_json_values(values: Vec<serde_json::Value>) -> Result<Self> {
        let mut dataset = Dataset::default();
        let mut known: HashSet<String> = HashSet::new();

        for (idx, value) in values.into_iter().enumerate() {
            let serde_json::Value::Object(object) = value else {
                return Err(LoanRiskError::Training(format!(
                    "row {idx} is not a JSON object"
                )));
            };
            let mut row = Row::with_capacity(object.len());
            for (column, cell) in &object {
                if known.insert(column.clone()) {
                    dataset.columns.push(column.clone());
                }
                if let Some(scalar) = cell_from_json(column, cell)? {
                    row.insert(column.clone(), scalar);
                }
            }
            dataset.rows.push(row);
        }
        Ok(dataset)
    }

    /// Load a JSON array of objects or a JSON Lines file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LoanRiskError::Training(format!("Failed to read dataset {}: {}", path.display(), e))
        })?;

        let values: Vec<serde_json::Value> = if contents.trim_start().starts_with('[') {
            serde_json::from_str(&contents)?
        } else {
            contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(serde_json::from_str::<serde_json::Value>)
                .collect::<std::result::Result<_, _>>()?
        };

        let dataset = Self::from_json_values(values)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            columns = dataset.columns.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Remove columns (e.g. identifiers) from the dataset.
    pub fn drop_columns(&mut self, names: &[String]) {
        self.columns.retain(|c| !names.contains(c));
        for row in &mut self.rows {
            for name in names {
                row.remove(name);
            }
        }
    }

    /// Separate the target column, dropping rows where it is missing.
    ///
    /// # Errors
    ///
    /// [`LoanRiskError::Training`] when the column is unknown or holds a value
    /// other than 0/1.
    pub fn into_labeled(self, target: &str) -> Result<LabeledData> {
        if !self.columns.iter().any(|c| c == target) {
            return Err(LoanRiskError::Training(format!(
                "target column '{target}' not found in dataset"
            )));
        }

        let before = self.rows.len();
        let mut rows = Vec::with_capacity(before);
        let mut labels = Vec::with_capacity(before);
        for (idx, mut row) in self.rows.into_iter().enumerate() {
            let Some(value) = row.remove(target) else {
                continue;
            };
            let label = parse_label(&value).ok_or_else(|| {
                LoanRiskError::Training(format!(
                    "row {idx}: target '{target}' must be 0 or 1, got '{value}'"
                ))
            })?;
            rows.push(row);
            labels.push(label);
        }

        if rows.len() < before {
            info!(
                dropped = before - rows.len(),
                remaining = rows.len(),
                "Dropped rows with missing target"
            );
        }

        Ok(LabeledData {
            columns: self.columns.into_iter().filter(|c| c != target).collect(),
            rows,
            labels,
        })
    }
}

fn parse_label(value: &Scalar) -> Option<u8> {
    match value {
        Scalar::Integer(0) => Some(0),
        Scalar::Integer(1) => Some(1),
        Scalar::Float(f) if *f == 0.0 => Some(0),
        Scalar::Float(f) if *f == 1.0 => Some(1),
        Scalar::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "false" => Some(0),
            "1" | "true" => Some(1),
            _ => None,
        },
        _ => None,
    }
}

/// Perform a stratified train/test split preserving class ratios.
pub fn stratified_split(labels: &[u8], test_ratio: f64, seed: u64) -> Split {
    let mut class0: Vec<usize> = Vec::new();
    let mut class1: Vec<usize> = Vec::new();
    for (i, &l) in labels.iter().enumerate() {
        if l == 0 {
            class0.push(i);
        } else {
            class1.push(i);
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    class0.shuffle(&mut rng);
    class1.shuffle(&mut rng);

    let test0 = (class0.len() as f64 * test_ratio).round() as usize;
    let test1 = (class1.len() as f64 * test_ratio).round() as usize;

    let test: Vec<usize> = class0[..test0]
        .iter()
        .chain(class1[..test1].iter())
        .copied()
        .collect();
    let train: Vec<usize> = class0[test0..]
        .iter()
        .chain(class1[test1..].iter())
        .copied()
        .collect();

    info!(
        train = train.len(),
        train_negative = class0.len() - test0,
        train_positive = class1.len() - test1,
        test = test.len(),
        test_negative = test0,
        test_positive = test1,
        "Stratified split"
    );

    Split { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_from_json_values_tracks_columns_and_nulls() {
        let ds = Dataset::from_json_values(vec![
            json!({"a": 1, "b": null}),
            json!({"a": 2, "c": "x"}),
        ])
        .unwrap();
        assert_eq!(ds.columns, vec!["a", "b", "c"]);
        assert_eq!(ds.len(), 2);
        assert!(!ds.rows[0].contains_key("b"));
    }

    #[test]
    fn test_nested_cells_are_rejected() {
        let err = Dataset::from_json_values(vec![json!({"a": [1, 2]})]).unwrap_err();
        assert!(err.to_string().contains("column 'a'"));
    }

    #[test]
    fn test_load_json_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"x": 1, "y": 0}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"x": 2, "y": 1}}"#).unwrap();
        let ds = Dataset::load(f.path()).unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_load_json_array() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"[{{"x": 1, "y": true}}, {{"x": 2, "y": false}}]"#).unwrap();
        let labeled = Dataset::load(f.path()).unwrap().into_labeled("y").unwrap();
        assert_eq!(labeled.labels, vec![1, 0]);
        assert_eq!(labeled.columns, vec!["x"]);
    }

    #[test]
    fn test_into_labeled_drops_missing_targets() {
        let ds = Dataset::from_json_values(vec![
            json!({"x": 1, "y": 1}),
            json!({"x": 2, "y": null}),
            json!({"x": 3, "y": "0"}),
        ])
        .unwrap();
        let labeled = ds.into_labeled("y").unwrap();
        assert_eq!(labeled.rows.len(), 2);
        assert_eq!(labeled.labels, vec![1, 0]);
        assert!(!labeled.rows[0].contains_key("y"));
    }

    #[test]
    fn test_into_labeled_rejects_bad_labels() {
        let ds = Dataset::from_json_values(vec![json!({"y": 2})]).unwrap();
        assert!(ds.into_labeled("y").is_err());
        let ds = Dataset::from_json_values(vec![json!({"x": 1})]).unwrap();
        assert!(ds.into_labeled("y").is_err());
    }

    #[test]
    fn test_drop_columns() {
        let mut ds =
            Dataset::from_json_values(vec![json!({"LoanSeqNum": "F1", "x": 1})]).unwrap();
        ds.drop_columns(&["LoanSeqNum".to_string()]);
        assert_eq!(ds.columns, vec!["x"]);
        assert!(!ds.rows[0].contains_key("LoanSeqNum"));
    }

    #[test]
    fn test_stratified_split_preserves_ratio() {
        // 8 negative (0), 2 positive (1)
        let labels = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        let split = stratified_split(&labels, 0.5, 42);
        let test_pos = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_pos, 1);
        assert_eq!(split.test.len(), 5);
        assert_eq!(split.train.len() + split.test.len(), 10);
    }

    #[test]
    fn test_stratified_split_is_seeded() {
        let labels: Vec<u8> = (0..50).map(|i| (i % 3 == 0) as u8).collect();
        let a = stratified_split(&labels, 0.2, 7);
        let b = stratified_split(&labels, 0.2, 7);
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }
}
