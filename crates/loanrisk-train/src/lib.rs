//! Training step for loanrisk.
//!
//! Loads a tabular dataset, fits the preprocessing descriptor on a stratified
//! training split, fits a logistic regression, and writes both artifacts for
//! the prediction service.

pub mod data;
pub mod metrics;
pub mod preprocess;
pub mod sample;
pub mod trainer;

pub use data::{stratified_split, Dataset, LabeledData, Row, Split};
pub use metrics::{compute_metrics, Confusion, EvaluationMetrics};
pub use preprocess::{ColumnRoles, FittedPreprocessor, UNKNOWN_CATEGORY};
pub use sample::{generate, train_sample, SampleConfig};
pub use trainer::{fit_logistic, save_outcome, train, FitOptions, TrainConfig, TrainOutcome};
