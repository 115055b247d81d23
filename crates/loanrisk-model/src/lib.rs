//! Scoring building blocks for loanrisk.
//!
//! - [`reconcile`] replays a frozen [`PreprocessingDescriptor`] over one raw
//!   record to produce the classifier's feature vector.
//! - [`RecordSchema`] checks declared field constraints at the boundary.
//! - [`LogisticRegression`] is the shipped [`Classifier`].
//! - [`ScoringContext`] pairs a descriptor with a classifier.
//!
//! [`PreprocessingDescriptor`]: loanrisk_core::PreprocessingDescriptor
//! [`Classifier`]: loanrisk_core::Classifier

pub mod artifacts;
pub mod logistic;
pub mod reconcile;
pub mod schema;
pub mod scoring;

pub use artifacts::{
    load_classifier, load_descriptor, save_classifier, save_descriptor, ClassifierArtifact,
};
pub use logistic::{sigmoid, LogisticRegression};
pub use reconcile::reconcile;
pub use schema::{FieldKind, FieldSpec, RecordSchema};
pub use scoring::ScoringContext;
