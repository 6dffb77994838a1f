//! Activation functions.
//!
//! The network is fixed-architecture: every hidden layer applies a rectified
//! linear unit element-wise and the output layer applies a column-wise
//! softmax. Backprop needs the ReLU derivative expressed in terms of the
//! cached pre-activation `z`, so both halves live here.

use crate::Matrix;

/// Rectified linear unit: identity for non-negative inputs, zero otherwise.
#[inline]
pub fn relu(z: f32) -> f32 {
    if z >= 0.0 { z } else { 0.0 }
}

/// Derivative of [`relu`] at pre-activation `z`.
///
/// The kink at zero takes the positive branch, matching the forward
/// definition (`relu(0) == 0` but the unit is "on" at exactly zero).
#[inline]
pub fn relu_grad(z: f32) -> f32 {
    if z >= 0.0 { 1.0 } else { 0.0 }
}

/// Column-wise numerically-stabilized softmax.
///
/// Each column of `z` is a vector of class logits for one sample. The column
/// max is subtracted before exponentiating so large logits cannot overflow,
/// then each column is normalized to sum to one.
///
/// Shape contract: `out` has the same shape as `z`.
pub fn softmax_columns(z: &Matrix, out: &mut Matrix) {
    debug_assert_eq!(z.rows(), out.rows());
    debug_assert_eq!(z.cols(), out.cols());

    let rows = z.rows();
    for c in 0..z.cols() {
        let mut max = f32::NEG_INFINITY;
        for r in 0..rows {
            max = max.max(z[(r, c)]);
        }

        let mut sum = 0.0_f32;
        for r in 0..rows {
            let e = (z[(r, c)] - max).exp();
            out[(r, c)] = e;
            sum += e;
        }

        let inv_sum = 1.0 / sum;
        for r in 0..rows {
            out[(r, c)] *= inv_sum;
        }
    }
}
