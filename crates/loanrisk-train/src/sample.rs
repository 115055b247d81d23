//! Synthetic two-feature model for smoke-testing the service.
//!
//! Generates `(age, salary)` rows where the target is a noisy linear function
//! of both, fits the same logistic regression as the real pipeline, and
//! produces a descriptor with two numeric columns.

use crate::metrics::compute_metrics;
use crate::trainer::{fit_logistic, FitOptions};
use chrono::Utc;
use loanrisk_core::{
    Classifier, ColumnSpec, LoanRiskError, PreprocessingDescriptor, Result, TrainingSummary,
};
use loanrisk_model::LogisticRegression;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

const AGE_RANGE: (f64, f64) = (18.0, 65.0);
const SALARY_RANGE: (f64, f64) = (20_000.0, 150_000.0);
const NOISE_STD: f64 = 0.1;

/// Sample generation settings.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub rows: usize,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            rows: 1000,
            seed: 42,
        }
    }
}

/// One draw from N(0, 1) via the Box-Muller transform.
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Generate `(features, labels)` with features `[age, salary]`.
pub fn generate(config: &SampleConfig) -> (Vec<Vec<f64>>, Vec<u8>) {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut x = Vec::with_capacity(config.rows);
    let mut y = Vec::with_capacity(config.rows);

    for _ in 0..config.rows {
        let age = rng.gen_range(AGE_RANGE.0..AGE_RANGE.1);
        let salary = rng.gen_range(SALARY_RANGE.0..SALARY_RANGE.1);
        let prob = (age - AGE_RANGE.0) / (AGE_RANGE.1 - AGE_RANGE.0) * 0.4
            + (salary - SALARY_RANGE.0) / (SALARY_RANGE.1 - SALARY_RANGE.0) * 0.6;
        let noisy = prob + NOISE_STD * standard_normal(&mut rng);
        x.push(vec![age, salary]);
        y.push(u8::from(noisy > 0.5));
    }
    (x, y)
}

/// Fit the sample model and build its descriptor.
pub fn train_sample(config: &SampleConfig) -> Result<(LogisticRegression, PreprocessingDescriptor)> {
    if config.rows == 0 {
        return Err(LoanRiskError::Training("sample needs at least one row".to_string()));
    }
    let (x, y) = generate(config);
    let model = fit_logistic(&x, &y, &FitOptions::default())?;

    let predictions = x
        .iter()
        .map(|row| model.predict(row))
        .collect::<Result<Vec<u8>>>()?;
    let metrics = compute_metrics(&predictions, &y);
    info!(rows = config.rows, metrics = %metrics, "Sample model fitted");

    let mut descriptor = PreprocessingDescriptor::from_columns(vec![
        ColumnSpec::numeric("age"),
        ColumnSpec::numeric("salary"),
    ]);
    descriptor.target = Some("target".to_string());
    descriptor.trained_at = Some(Utc::now());
    descriptor.training = Some(TrainingSummary {
        train_rows: config.rows,
        test_rows: 0,
        train_accuracy: metrics.accuracy,
        test_accuracy: metrics.accuracy,
        precision: metrics.precision,
        recall: metrics.recall,
        f1: metrics.f1,
    });

    Ok((model, descriptor))
}
