//! Shared application state and startup artifact loading.

use loanrisk_core::{RawRecord, Result, ServerConfig};
use loanrisk_model::{load_classifier, load_descriptor, RecordSchema, ScoringContext};
use std::path::Path;
use tracing::{info, warn};

/// Whether the service can score.
#[derive(Debug, Clone)]
pub enum ModelState {
    /// Both artifacts loaded.
    Ready(ScoringContext),
    /// Startup load failed; the process stays up but refuses to score.
    Degraded {
        reason: String,
        model_loaded: bool,
        preprocessing_loaded: bool,
    },
}

impl ModelState {
    /// Load both artifacts, degrading instead of failing.
    pub fn load(model_path: &Path, descriptor_path: &Path) -> Self {
        let classifier = load_classifier(model_path);
        let descriptor = load_descriptor(descriptor_path);

        match (classifier, descriptor) {
            (Ok(classifier), Ok(descriptor)) => {
                if classifier.n_features() != descriptor.feature_count() {
                    warn!(
                        classifier_features = classifier.n_features(),
                        descriptor_features = descriptor.feature_count(),
                        "Classifier and descriptor disagree on feature count; scoring will fail"
                    );
                }
                info!(
                    model_type = classifier.type_name(),
                    features = descriptor.feature_count(),
                    "Model and preprocessing descriptor loaded"
                );
                ModelState::Ready(ScoringContext::new(descriptor, classifier))
            }
            (classifier, descriptor) => {
                let reason = [
                    classifier.as_ref().err().map(|e| format!("model: {e}")),
                    descriptor.as_ref().err().map(|e| format!("preprocessing: {e}")),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join("; ");
                warn!(%reason, "Starting in degraded mode");
                ModelState::Degraded {
                    reason,
                    model_loaded: classifier.is_ok(),
                    preprocessing_loaded: descriptor.is_ok(),
                }
            }
        }
    }

    /// The scoring context when ready.
    pub fn context(&self) -> Option<&ScoringContext> {
        match self {
            ModelState::Ready(ctx) => Some(ctx),
            ModelState::Degraded { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }
}

/// Immutable state shared by every handler via `Arc`.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub schema: RecordSchema,
    pub model: ModelState,
}

impl AppState {
    /// Assemble state from an already-resolved model.
    pub fn new(config: ServerConfig, model: ModelState) -> Self {
        let schema = RecordSchema::from_preset(config.input_schema);
        Self {
            config,
            schema,
            model,
        }
    }

    /// Load artifacts from the configured paths.
    pub fn load(config: ServerConfig) -> Self {
        info!(
            model_path = %config.artifacts.model_path,
            descriptor_path = %config.artifacts.descriptor_path,
            "Loading artifacts"
        );
        let model = ModelState::load(
            Path::new(&config.artifacts.model_path),
            Path::new(&config.artifacts.descriptor_path),
        );
        Self::new(config, model)
    }

    /// Parse a JSON body into a record and apply boundary validation.
    pub fn prepare(&self, body: &serde_json::Value) -> Result<RawRecord> {
        let record = RawRecord::from_json(body)?;
        self.schema.validate(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanrisk_core::{ColumnSpec, PreprocessingDescriptor, SchemaPreset};
    use loanrisk_model::{save_classifier, save_descriptor, ClassifierArtifact, LogisticRegression};
    use serde_json::json;

    #[test]
    fn test_missing_artifacts_degrade() {
        let dir = tempfile::tempdir().unwrap();
        let state = ModelState::load(&dir.path().join("m.json"), &dir.path().join("p.json"));
        match state {
            ModelState::Degraded {
                reason,
                model_loaded,
                preprocessing_loaded,
            } => {
                assert!(!model_loaded);
                assert!(!preprocessing_loaded);
                assert!(reason.contains("model:"));
                assert!(reason.contains("preprocessing:"));
            }
            ModelState::Ready(_) => panic!("expected degraded"),
        }
    }

    #[test]
    fn test_partial_load_reports_which_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor_path = dir.path().join("p.json");
        let descriptor = PreprocessingDescriptor::from_columns(vec![ColumnSpec::numeric("age")]);
        save_descriptor(&descriptor, &descriptor_path).unwrap();

        let state = ModelState::load(&dir.path().join("m.json"), &descriptor_path);
        assert!(matches!(
            state,
            ModelState::Degraded {
                model_loaded: false,
                preprocessing_loaded: true,
                ..
            }
        ));
    }

    #[test]
    fn test_load_ready() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("m.json");
        let descriptor_path = dir.path().join("p.json");
        save_classifier(
            &ClassifierArtifact::from(LogisticRegression::new(vec![0.1], 0.0)),
            &model_path,
        )
        .unwrap();
        save_descriptor(
            &PreprocessingDescriptor::from_columns(vec![ColumnSpec::numeric("age")]),
            &descriptor_path,
        )
        .unwrap();

        let state = ModelState::load(&model_path, &descriptor_path);
        assert!(state.is_ready());
        assert_eq!(state.context().unwrap().descriptor().feature_count(), 1);
    }

    #[test]
    fn test_prepare_applies_schema() {
        let config = ServerConfig {
            input_schema: SchemaPreset::Sample,
            ..ServerConfig::default()
        };
        let state = AppState::new(
            config,
            ModelState::Degraded {
                reason: "test".into(),
                model_loaded: false,
                preprocessing_loaded: false,
            },
        );
        assert!(state.prepare(&json!({"age": 30, "salary": 50000})).is_ok());
        assert!(state.prepare(&json!({"age": 300, "salary": 50000})).is_err());
        assert!(state.prepare(&json!([1, 2])).is_err());
    }
}
