//! Evaluation metrics and the training-time metrics history.
//!
//! Metrics never participate in backprop; the combined softmax +
//! cross-entropy derivative in the backward pass is derived analytically and
//! does not call into this module.

use serde::{Deserialize, Serialize};

use crate::Matrix;

/// Additive smoothing inside `ln` so an exactly-zero probability cannot
/// produce `-inf`.
pub const COST_EPS: f32 = 1e-8;

/// Mean categorical cross-entropy of a probability batch.
///
/// Shape contract:
/// - `probs` is `(classes, batch)` with columns summing to 1
/// - `targets` is row-major `(batch, classes)` one-hot
pub fn cross_entropy(probs: &Matrix, targets: &Matrix) -> f32 {
    assert_eq!(
        probs.cols(),
        targets.rows(),
        "probs batch {} does not match targets batch {}",
        probs.cols(),
        targets.rows()
    );
    assert_eq!(
        probs.rows(),
        targets.cols(),
        "probs classes {} do not match targets classes {}",
        probs.rows(),
        targets.cols()
    );

    let n = targets.rows();
    let true_classes = targets.row_argmax();

    let mut sum = 0.0_f32;
    for (s, &class) in true_classes.iter().enumerate() {
        sum -= (probs[(class, s)] + COST_EPS).ln();
    }
    sum / n as f32
}

/// Argmax accuracy as a percentage in [0, 100].
///
/// A sample counts as correct when the predicted column argmax equals the
/// argmax of its one-hot target row.
pub fn accuracy(probs: &Matrix, targets: &Matrix) -> f32 {
    assert_eq!(
        probs.cols(),
        targets.rows(),
        "probs batch {} does not match targets batch {}",
        probs.cols(),
        targets.rows()
    );
    assert_eq!(
        probs.rows(),
        targets.cols(),
        "probs classes {} do not match targets classes {}",
        probs.rows(),
        targets.cols()
    );

    let predicted = probs.column_argmax();
    let truth = targets.row_argmax();
    let matches = predicted
        .iter()
        .zip(&truth)
        .filter(|(p, t)| p == t)
        .count();

    matches as f32 / targets.rows() as f32 * 100.0
}

/// Periodic training metrics, appended by the training loop and read by the
/// reporting sink. Serialized alongside the model parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub steps: Vec<usize>,
    pub train_costs: Vec<f32>,
    pub val_costs: Vec<f32>,
    pub train_accs: Vec<f32>,
    pub val_accs: Vec<f32>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: usize, train_cost: f32, val_cost: f32, train_acc: f32, val_acc: f32) {
        self.steps.push(step);
        self.train_costs.push(train_cost);
        self.val_costs.push(val_cost);
        self.train_accs.push(train_acc);
        self.val_accs.push(val_acc);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
