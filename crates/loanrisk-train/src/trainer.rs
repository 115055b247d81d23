//! Logistic regression fitting and the end-to-end training pipeline.

use crate::data::{stratified_split, Dataset, Row};
use crate::metrics::{compute_metrics, EvaluationMetrics};
use crate::preprocess::{ColumnRoles, FittedPreprocessor};
use chrono::Utc;
use loanrisk_core::{Classifier, LoanRiskError, PreprocessingDescriptor, Result, TrainingSummary};
use loanrisk_model::{
    save_classifier, save_descriptor, sigmoid, ClassifierArtifact, LogisticRegression,
    ScoringContext,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Train/test accuracy gap above which the fit is flagged as overfitting.
const OVERFIT_GAP: f64 = 0.05;

/// Rows scored as a post-training sanity check.
const SANITY_ROWS: usize = 3;

/// Optimiser settings for [`fit_logistic`].
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Inverse L2 regularisation strength.
    pub c: f64,
    /// Gradient descent iterations.
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this.
    pub tolerance: f64,
    /// Step size; derived from the feature count when `None`.
    pub learning_rate: Option<f64>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-6,
            learning_rate: None,
        }
    }
}

/// Training configuration.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub target: String,
    pub exclude_columns: Vec<String>,
    pub roles: ColumnRoles,
    pub test_ratio: f64,
    pub seed: u64,
    pub fit: FitOptions,
    pub model_path: PathBuf,
    pub descriptor_path: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            target: "EverDelinquent".to_string(),
            exclude_columns: vec!["LoanSeqNum".to_string()],
            roles: ColumnRoles::default(),
            test_ratio: 0.2,
            seed: 42,
            fit: FitOptions::default(),
            model_path: PathBuf::from("model.json"),
            descriptor_path: PathBuf::from("preprocessing.json"),
        }
    }
}

/// Everything produced by one training run.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: LogisticRegression,
    pub descriptor: PreprocessingDescriptor,
    pub train_metrics: EvaluationMetrics,
    pub test_metrics: EvaluationMetrics,
}

impl TrainOutcome {
    /// Whether train accuracy exceeds test accuracy by more than the allowed gap.
    pub fn overfits(&self) -> bool {
        self.train_metrics.accuracy - self.test_metrics.accuracy > OVERFIT_GAP
    }
}

/// Fit a binary logistic regression by full-batch gradient descent.
///
/// Features are standardised internally and the coefficients folded back
/// onto the raw scale. The objective is mean log-loss plus
/// `||w||² / (2 · C · n)`, matching an L2 penalty with strength `1 / C`.
///
/// # Errors
///
/// [`LoanRiskError::Training`] for empty input or ragged rows.
pub fn fit_logistic(x: &[Vec<f64>], y: &[u8], options: &FitOptions) -> Result<LogisticRegression> {
    let n = x.len();
    if n == 0 || n != y.len() {
        return Err(LoanRiskError::Training(format!(
            "need matching non-empty inputs, got {} rows and {} labels",
            n,
            y.len()
        )));
    }
    let d = x[0].len();
    if x.iter().any(|row| row.len() != d) {
        return Err(LoanRiskError::Training("ragged feature matrix".to_string()));
    }

    let nf = n as f64;
    let mut mean = vec![0.0; d];
    for row in x {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v / nf;
        }
    }
    let mut std = vec![0.0; d];
    for row in x {
        for ((s, v), m) in std.iter_mut().zip(row).zip(&mean) {
            *s += (v - m).powi(2) / nf;
        }
    }
    for s in &mut std {
        *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
    }

    let z: Vec<Vec<f64>> = x
        .iter()
        .map(|row| {
            row.iter()
                .zip(&mean)
                .zip(&std)
                .map(|((v, m), s)| (v - m) / s)
                .collect()
        })
        .collect();

    let l2 = 1.0 / (options.c * nf);
    // Standardised columns bound the Hessian's largest eigenvalue by d / 4.
    let learning_rate = options
        .learning_rate
        .unwrap_or_else(|| 1.0 / (0.25 * d.max(1) as f64 + l2));

    let mut w = vec![0.0; d];
    let mut b = 0.0;
    let mut grad_w = vec![0.0; d];
    let mut iterations = 0;

    for iter in 0..options.max_iter {
        iterations = iter + 1;
        grad_w.iter_mut().for_each(|g| *g = 0.0);
        let mut grad_b = 0.0;

        for (row, &label) in z.iter().zip(y) {
            let score = row.iter().zip(&w).map(|(v, wj)| v * wj).sum::<f64>() + b;
            let err = sigmoid(score) - f64::from(label);
            for (g, v) in grad_w.iter_mut().zip(row) {
                *g += err * v / nf;
            }
            grad_b += err / nf;
        }
        for (g, wj) in grad_w.iter_mut().zip(&w) {
            *g += l2 * wj;
        }

        let norm = (grad_w.iter().map(|g| g * g).sum::<f64>() + grad_b * grad_b).sqrt();
        if norm < options.tolerance {
            break;
        }

        for (wj, g) in w.iter_mut().zip(&grad_w) {
            *wj -= learning_rate * g;
        }
        b -= learning_rate * grad_b;
    }

    let coefficients: Vec<f64> = w.iter().zip(&std).map(|(wj, s)| wj / s).collect();
    let intercept = b - coefficients
        .iter()
        .zip(&mean)
        .map(|(c, m)| c * m)
        .sum::<f64>();

    info!(iterations, features = d, rows = n, "Fitted logistic regression");
    Ok(LogisticRegression::new(coefficients, intercept))
}

fn evaluate(model: &LogisticRegression, x: &[Vec<f64>], y: &[u8]) -> Result<EvaluationMetrics> {
    let predictions = x
        .iter()
        .map(|row| model.predict(row))
        .collect::<Result<Vec<u8>>>()?;
    Ok(compute_metrics(&predictions, y))
}

/// Run the full pipeline on an in-memory dataset.
pub fn train(mut dataset: Dataset, config: &TrainConfig) -> Result<TrainOutcome> {
    if !(0.0..1.0).contains(&config.test_ratio) {
        return Err(LoanRiskError::Training(format!(
            "test ratio must be in [0, 1), got {}",
            config.test_ratio
        )));
    }

    let excluded: Vec<String> = config
        .exclude_columns
        .iter()
        .filter(|c| dataset.columns.contains(c))
        .cloned()
        .collect();
    if !excluded.is_empty() {
        info!(columns = ?excluded, "Excluding identifier columns");
        dataset.drop_columns(&excluded);
    }

    let labeled = dataset.into_labeled(&config.target)?;
    if labeled.rows.is_empty() {
        return Err(LoanRiskError::Training("dataset has no labelled rows".to_string()));
    }
    let positives = labeled.labels.iter().filter(|&&l| l == 1).count();
    info!(
        rows = labeled.rows.len(),
        positive_rate = positives as f64 / labeled.rows.len() as f64,
        "Training data ready"
    );

    let split = stratified_split(&labeled.labels, config.test_ratio, config.seed);
    let train_rows: Vec<&Row> = split.train.iter().map(|&i| &labeled.rows[i]).collect();
    let test_rows: Vec<&Row> = split.test.iter().map(|&i| &labeled.rows[i]).collect();
    let train_labels: Vec<u8> = split.train.iter().map(|&i| labeled.labels[i]).collect();
    let test_labels: Vec<u8> = split.test.iter().map(|&i| labeled.labels[i]).collect();

    let fitted = FittedPreprocessor::fit(&labeled.columns, &train_rows, &config.roles)?;
    let x_train = fitted.transform_all(&train_rows)?;
    let x_test = fitted.transform_all(&test_rows)?;

    let model = fit_logistic(&x_train, &train_labels, &config.fit)?;
    let train_metrics = evaluate(&model, &x_train, &train_labels)?;
    let test_metrics = evaluate(&model, &x_test, &test_labels)?;
    info!(metrics = %train_metrics, "Training split");
    info!(metrics = %test_metrics, "Test split");

    let mut descriptor = fitted.descriptor.clone();
    descriptor.target = Some(config.target.clone());
    descriptor.trained_at = Some(Utc::now());
    descriptor.training = Some(TrainingSummary {
        train_rows: train_rows.len(),
        test_rows: test_rows.len(),
        train_accuracy: train_metrics.accuracy,
        test_accuracy: test_metrics.accuracy,
        precision: test_metrics.precision,
        recall: test_metrics.recall,
        f1: test_metrics.f1,
    });

    let outcome = TrainOutcome {
        model,
        descriptor,
        train_metrics,
        test_metrics,
    };
    if outcome.overfits() {
        warn!(
            train_accuracy = outcome.train_metrics.accuracy,
            test_accuracy = outcome.test_metrics.accuracy,
            "Possible overfitting"
        );
    }

    sanity_check(&outcome, &fitted, &labeled.rows);
    Ok(outcome)
}

/// Score the first few rows through the serving path and log the results.
fn sanity_check(outcome: &TrainOutcome, fitted: &FittedPreprocessor, rows: &[Row]) {
    let context = ScoringContext::new(
        outcome.descriptor.clone(),
        Arc::new(outcome.model.clone()),
    );
    for (idx, row) in rows.iter().take(SANITY_ROWS).enumerate() {
        match context.score(&fitted.impute(row)) {
            Ok(prediction) => info!(
                row = idx,
                prediction = prediction.class,
                probability = prediction.probability,
                risk = %prediction.risk_level(),
                "Sample prediction"
            ),
            Err(e) => warn!(row = idx, error = %e, "Sample prediction failed"),
        }
    }
}

/// Write the classifier and descriptor to the configured paths.
pub fn save_outcome(outcome: &TrainOutcome, config: &TrainConfig) -> Result<()> {
    save_classifier(
        &ClassifierArtifact::from(outcome.model.clone()),
        &config.model_path,
    )?;
    info!(path = %config.model_path.display(), "Model saved");
    save_descriptor(&outcome.descriptor, &config.descriptor_path)?;
    info!(path = %config.descriptor_path.display(), "Preprocessing descriptor saved");
    Ok(())
}
