//! Descriptor + classifier pair used to score records.

use crate::artifacts::{load_classifier, load_descriptor};
use crate::reconcile::reconcile;
use loanrisk_core::{
    Classifier, LoanRiskError, PreprocessingDescriptor, Prediction, RawRecord, Result,
};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Read-only scoring state: the frozen descriptor and the classifier it feeds.
#[derive(Clone)]
pub struct ScoringContext {
    descriptor: PreprocessingDescriptor,
    classifier: Arc<dyn Classifier>,
}

impl ScoringContext {
    /// Pair a descriptor with a classifier.
    ///
    /// The feature count is not compared with the classifier dimension here;
    /// a mismatch surfaces per request as [`LoanRiskError::ShapeMismatch`].
    pub fn new(descriptor: PreprocessingDescriptor, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            descriptor,
            classifier,
        }
    }

    /// Load both artifacts from disk.
    pub fn load(model_path: &Path, descriptor_path: &Path) -> Result<Self> {
        let classifier = load_classifier(model_path)?;
        let descriptor = load_descriptor(descriptor_path)?;
        Ok(Self::new(descriptor, classifier))
    }

    /// The preprocessing descriptor.
    pub fn descriptor(&self) -> &PreprocessingDescriptor {
        &self.descriptor
    }

    /// The classifier.
    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Reconcile a record into this context's feature vector.
    pub fn features(&self, record: &RawRecord) -> Result<Vec<f64>> {
        reconcile(record, &self.descriptor)
    }

    /// Reconcile and score one record.
    ///
    /// # Errors
    ///
    /// Reconciliation errors, or [`LoanRiskError::ShapeMismatch`] when the
    /// vector does not fit the classifier.
    pub fn score(&self, record: &RawRecord) -> Result<Prediction> {
        let features = self.features(record)?;
        let expected = self.classifier.n_features();
        if features.len() != expected {
            return Err(LoanRiskError::ShapeMismatch {
                expected,
                actual: features.len(),
            });
        }

        let probability = self.classifier.predict_proba(&features)?;
        let class = self.classifier.predict(&features)?;
        debug!(class, probability, "Scored record");
        Ok(Prediction { class, probability })
    }
}

impl fmt::Debug for ScoringContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringContext")
            .field("classifier", &self.classifier.type_name())
            .field("features", &self.descriptor.feature_count())
            .finish()
    }
}
