//! JSON persistence for the classifier and the preprocessing descriptor.

use crate::logistic::LogisticRegression;
use loanrisk_core::{
    Classifier, ColumnEncoding, LoanRiskError, PreprocessingDescriptor, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// On-disk classifier, tagged by model family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    /// Binary logistic regression.
    LogisticRegression(LogisticRegression),
}

impl ClassifierArtifact {
    /// Turn the artifact into a shareable scorer.
    pub fn into_classifier(self) -> Arc<dyn Classifier> {
        match self {
            ClassifierArtifact::LogisticRegression(model) => Arc::new(model),
        }
    }
}

impl From<LogisticRegression> for ClassifierArtifact {
    fn from(model: LogisticRegression) -> Self {
        ClassifierArtifact::LogisticRegression(model)
    }
}

fn read_artifact(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| LoanRiskError::Artifact(format!("Failed to read {}: {}", path.display(), e)))
}

fn write_artifact<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load and check a preprocessing descriptor.
///
/// # Errors
///
/// [`LoanRiskError::Artifact`] when the file is missing, is not a descriptor,
/// or violates the encoder invariants (sorted categories, unique features).
pub fn load_descriptor(path: &Path) -> Result<PreprocessingDescriptor> {
    let contents = read_artifact(path)?;
    let descriptor: PreprocessingDescriptor = serde_json::from_str(&contents).map_err(|e| {
        LoanRiskError::Artifact(format!("Invalid descriptor {}: {}", path.display(), e))
    })?;
    check_descriptor(&descriptor)?;
    Ok(descriptor)
}

/// Write a descriptor as pretty JSON, creating parent directories.
pub fn save_descriptor(descriptor: &PreprocessingDescriptor, path: &Path) -> Result<()> {
    write_artifact(descriptor, path)
}

/// Load a classifier artifact.
///
/// # Errors
///
/// [`LoanRiskError::Artifact`] when the file is missing or malformed.
pub fn load_classifier(path: &Path) -> Result<Arc<dyn Classifier>> {
    let contents = read_artifact(path)?;
    let artifact: ClassifierArtifact = serde_json::from_str(&contents).map_err(|e| {
        LoanRiskError::Artifact(format!("Invalid classifier {}: {}", path.display(), e))
    })?;
    Ok(artifact.into_classifier())
}

/// Write a classifier artifact as pretty JSON, creating parent directories.
pub fn save_classifier(artifact: &ClassifierArtifact, path: &Path) -> Result<()> {
    write_artifact(artifact, path)
}

/// Check the invariants encoders rely on.
pub fn check_descriptor(descriptor: &PreprocessingDescriptor) -> Result<()> {
    if descriptor.feature_names.is_empty() {
        return Err(LoanRiskError::Artifact(
            "descriptor has an empty feature list".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = descriptor
        .feature_names
        .iter()
        .find(|name| !seen.insert(name.as_str()))
    {
        return Err(LoanRiskError::Artifact(format!(
            "duplicate feature name '{dup}'"
        )));
    }

    for column in &descriptor.columns {
        let categories = match &column.encoding {
            ColumnEncoding::Numeric => continue,
            ColumnEncoding::Label(enc) => &enc.classes,
            ColumnEncoding::OneHot(enc) => &enc.categories,
        };
        if categories.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LoanRiskError::Artifact(format!(
                "categories for column '{}' must be sorted and unique",
                column.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanrisk_core::{ColumnSpec, LabelEncoder, OneHotEncoder};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_tmp(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_descriptor_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preprocessing.json");
        let desc = PreprocessingDescriptor::from_columns(vec![
            ColumnSpec::numeric("LTV"),
            ColumnSpec::one_hot("PPM", OneHotEncoder::fit(["N", "Y"])),
        ]);
        save_descriptor(&desc, &path).unwrap();
        assert_eq!(load_descriptor(&path).unwrap(), desc);
    }

    #[test]
    fn test_classifier_artifact_is_tagged() {
        let artifact = ClassifierArtifact::from(LogisticRegression::new(vec![0.5, -0.25], 0.1));
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["kind"], "logistic_regression");
        assert_eq!(json["coefficients"][1], -0.25);
    }

    #[test]
    fn test_load_classifier() {
        let f = write_tmp(
            r#"{"kind": "logistic_regression", "coefficients": [1.0, 2.0], "intercept": 0.0}"#,
        );
        let clf = load_classifier(f.path()).unwrap();
        assert_eq!(clf.type_name(), "LogisticRegression");
        assert_eq!(clf.n_features(), 2);
        assert!(format!("{clf:?}").contains("coefficients"));
    }

    #[test]
    fn test_missing_file_is_artifact_error() {
        let err = load_classifier(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, LoanRiskError::Artifact(_)));
        let err = load_descriptor(Path::new("/nonexistent/preprocessing.json")).unwrap_err();
        assert!(matches!(err, LoanRiskError::Artifact(_)));
    }

    #[test]
    fn test_corrupt_file_is_artifact_error() {
        let f = write_tmp("not json at all");
        assert!(matches!(
            load_descriptor(f.path()).unwrap_err(),
            LoanRiskError::Artifact(_)
        ));
        let f = write_tmp(r#"{"kind": "random_forest", "trees": []}"#);
        assert!(matches!(
            load_classifier(f.path()).unwrap_err(),
            LoanRiskError::Artifact(_)
        ));
    }

    #[test]
    fn test_unsorted_categories_are_rejected() {
        let mut desc = PreprocessingDescriptor::from_columns(vec![ColumnSpec::label(
            "MSA",
            LabelEncoder::fit(["1", "2"]),
        )]);
        if let ColumnEncoding::Label(enc) = &mut desc.columns[0].encoding {
            enc.classes.reverse();
        }
        assert!(check_descriptor(&desc).is_err());
    }

    #[test]
    fn test_duplicate_features_are_rejected() {
        let mut desc = PreprocessingDescriptor::from_columns(vec![ColumnSpec::numeric("LTV")]);
        desc.feature_names.push("LTV".into());
        assert!(check_descriptor(&desc).is_err());
    }
}
