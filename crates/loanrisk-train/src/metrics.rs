//! Hold-out scoring for the fitted classifier.
//!
//! Class 1 is the delinquent (positive) class. Any non-zero label counts as
//! delinquent.

use std::fmt;

/// Outcome counts for paired predictions and labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    /// Delinquent loans flagged as delinquent.
    pub hits: usize,
    /// Repaid loans flagged as delinquent.
    pub false_alarms: usize,
    /// Repaid loans left unflagged.
    pub correct_rejections: usize,
    /// Delinquent loans left unflagged.
    pub misses: usize,
}

impl Confusion {
    /// Tally pairs. Extra elements in the longer slice are ignored.
    pub fn tally(predictions: &[u8], labels: &[u8]) -> Self {
        debug_assert_eq!(predictions.len(), labels.len());
        predictions
            .iter()
            .zip(labels)
            .fold(Self::default(), |mut c, (&p, &l)| {
                match (p != 0, l != 0) {
                    (true, true) => c.hits += 1,
                    (true, false) => c.false_alarms += 1,
                    (false, false) => c.correct_rejections += 1,
                    (false, true) => c.misses += 1,
                }
                c
            })
    }

    fn total(&self) -> usize {
        self.hits + self.false_alarms + self.correct_rejections + self.misses
    }
}

/// Summary scores derived from a [`Confusion`].
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Share of repaid loans wrongly flagged.
    pub false_positive_rate: f64,
    pub counts: Confusion,
}

impl From<Confusion> for EvaluationMetrics {
    fn from(c: Confusion) -> Self {
        let share = |part: usize, whole: usize| match whole {
            0 => 0.0,
            _ => part as f64 / whole as f64,
        };
        let precision = share(c.hits, c.hits + c.false_alarms);
        let recall = share(c.hits, c.hits + c.misses);
        let f1 = match precision + recall {
            sum if sum > 0.0 => 2.0 * precision * recall / sum,
            _ => 0.0,
        };
        Self {
            accuracy: share(c.hits + c.correct_rejections, c.total()),
            precision,
            recall,
            f1,
            false_positive_rate: share(c.false_alarms, c.false_alarms + c.correct_rejections),
            counts: c,
        }
    }
}

/// Score predictions against ground truth.
pub fn compute_metrics(predictions: &[u8], labels: &[u8]) -> EvaluationMetrics {
    Confusion::tally(predictions, labels).into()
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        write!(
            f,
            "accuracy {:.4}, precision {:.4}, recall {:.4}, f1 {:.4}, fpr {:.4} over {} loans",
            self.accuracy,
            self.precision,
            self.recall,
            self.f1,
            self.false_positive_rate,
            c.total(),
        )
    }
}
