//! Binary logistic regression scorer.
//!
//! ```text
//! p(class = 1 | x) = sigmoid(w · x + b)
//! ```
//!
//! Coefficients are stored on the raw (unscaled) feature scale, so the
//! reconciled vector is consumed as-is.

use loanrisk_core::{Classifier, LoanRiskError, Result};
use serde::{Deserialize, Serialize};

/// Default decision threshold on the class-1 probability.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Fitted logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// One weight per feature, in descriptor feature order.
    pub coefficients: Vec<f64>,
    /// Bias term.
    pub intercept: f64,
    /// Probability at or above which class 1 is predicted.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticRegression {
    /// Create a model with the default threshold.
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Raw linear score `w · x + b`.
    ///
    /// # Errors
    ///
    /// [`LoanRiskError::ShapeMismatch`] when `features` has the wrong length.
    pub fn decision_function(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(LoanRiskError::ShapeMismatch {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }
        Ok(self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept)
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticRegression {
    fn type_name(&self) -> &'static str {
        "LogisticRegression"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        Ok(sigmoid(self.decision_function(features)?))
    }

    fn predict(&self, features: &[f64]) -> Result<u8> {
        Ok(u8::from(self.predict_proba(features)? >= self.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_is_stable_at_extremes() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn test_predict_proba_and_class() {
        let model = LogisticRegression::new(vec![1.0, -2.0], 0.5);
        let p = model.predict_proba(&[2.0, 0.5]).unwrap();
        assert!((p - sigmoid(1.5)).abs() < 1e-12);
        assert_eq!(model.predict(&[2.0, 0.5]).unwrap(), 1);
        assert_eq!(model.predict(&[0.0, 2.0]).unwrap(), 0);
    }

    #[test]
    fn test_threshold_is_respected() {
        let mut model = LogisticRegression::new(vec![0.0], 0.0);
        assert_eq!(model.predict(&[1.0]).unwrap(), 1);
        model.threshold = 0.6;
        assert_eq!(model.predict(&[1.0]).unwrap(), 0);
    }

    #[test]
    fn test_shape_mismatch() {
        let model = LogisticRegression::new(vec![1.0, 1.0], 0.0);
        let err = model.predict_proba(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            LoanRiskError::ShapeMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_missing_threshold_defaults() {
        let model: LogisticRegression =
            serde_json::from_str(r#"{"coefficients": [0.1], "intercept": -1.0}"#).unwrap();
        assert_eq!(model.threshold, DEFAULT_THRESHOLD);
        assert_eq!(model.type_name(), "LogisticRegression");
        assert_eq!(model.n_features(), 1);
    }
}
