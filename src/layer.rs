//! A single dense layer's parameters and the batched primitives on them.
//!
//! Weights are stored row-major with shape `(in_dim, out_dim)`, so the layer's
//! pre-activation for a feature-major batch `A` of shape `(in_dim, n)` is
//! `Z = Wᵀ·A + b` with `Z` of shape `(out_dim, n)`.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::matmul::gemm_f32;
use crate::{Error, Matrix, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    /// Row-major matrix with shape (in_dim, out_dim).
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Layer {
    /// Initialize a layer from `rng`.
    ///
    /// Weight entries are independent standard-normal draws scaled by
    /// `1/sqrt(in_dim)`, which keeps activation magnitudes stable across
    /// depth. Biases start at zero.
    pub fn new_with_rng<R: Rng + ?Sized>(in_dim: usize, out_dim: usize, rng: &mut R) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }

        let scale = 1.0 / (in_dim as f32).sqrt();
        let mut weights = Vec::with_capacity(in_dim * out_dim);
        for _ in 0..in_dim * out_dim {
            let v: f32 = rng.sample(StandardNormal);
            weights.push(v * scale);
        }
        let biases = vec![0.0; out_dim];

        Ok(Self {
            in_dim,
            out_dim,
            weights,
            biases,
        })
    }

    /// Rebuild a layer from raw parts (used when loading a persisted model).
    ///
    /// Validates buffer lengths and that every parameter is finite.
    pub fn from_parts(
        in_dim: usize,
        out_dim: usize,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        if weights.len() != in_dim * out_dim {
            return Err(Error::InvalidShape(format!(
                "weights length {} does not match in_dim * out_dim ({in_dim} * {out_dim})",
                weights.len()
            )));
        }
        if biases.len() != out_dim {
            return Err(Error::InvalidShape(format!(
                "biases length {} does not match out_dim {out_dim}",
                biases.len()
            )));
        }
        if weights.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "weights must contain only finite values".to_owned(),
            ));
        }
        if biases.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "biases must contain only finite values".to_owned(),
            ));
        }

        Ok(Self {
            in_dim,
            out_dim,
            weights,
            biases,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    #[inline]
    pub fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    /// Pre-activation for a feature-major batch: `z = Wᵀ·a_prev + b`.
    ///
    /// Shape contract:
    /// - `a_prev` is `(in_dim, n)`
    /// - `z` is `(out_dim, n)`
    pub(crate) fn affine_forward(&self, a_prev: &Matrix, z: &mut Matrix) {
        let n = a_prev.cols();
        debug_assert_eq!(a_prev.rows(), self.in_dim);
        debug_assert_eq!(z.rows(), self.out_dim);
        debug_assert_eq!(z.cols(), n);

        // Wᵀ is read out of the row-major (in_dim, out_dim) buffer by swapping
        // strides: element (o, i) lives at i * out_dim + o.
        gemm_f32(
            self.out_dim,
            n,
            self.in_dim,
            1.0,
            &self.weights,
            1,
            self.out_dim,
            a_prev.as_slice(),
            n,
            1,
            z.as_mut_slice(),
            n,
            1,
        );

        for o in 0..self.out_dim {
            let b = self.biases[o];
            for v in z.row_mut(o) {
                *v += b;
            }
        }
    }

    /// Batch-averaged weight gradient: `dw = a_prev · dzᵀ * inv_n`.
    ///
    /// Shape contract:
    /// - `a_prev` is `(in_dim, n)`, `dz` is `(out_dim, n)`
    /// - `dw` is a row-major `(in_dim, out_dim)` buffer, overwritten
    pub(crate) fn grad_weights(&self, a_prev: &Matrix, dz: &Matrix, inv_n: f32, dw: &mut [f32]) {
        let n = dz.cols();
        debug_assert_eq!(a_prev.rows(), self.in_dim);
        debug_assert_eq!(a_prev.cols(), n);
        debug_assert_eq!(dz.rows(), self.out_dim);
        debug_assert_eq!(dw.len(), self.weights.len());

        // dzᵀ element (s, o) lives at o * n + s.
        gemm_f32(
            self.in_dim,
            self.out_dim,
            n,
            inv_n,
            a_prev.as_slice(),
            n,
            1,
            dz.as_slice(),
            1,
            n,
            dw,
            self.out_dim,
            1,
        );
    }

    /// Batch-averaged bias gradient: `db = row_sum(dz) * inv_n`, overwritten.
    pub(crate) fn grad_biases(&self, dz: &Matrix, inv_n: f32, db: &mut [f32]) {
        debug_assert_eq!(dz.rows(), self.out_dim);
        debug_assert_eq!(db.len(), self.out_dim);

        for o in 0..self.out_dim {
            let mut sum = 0.0_f32;
            for &v in dz.row(o) {
                sum += v;
            }
            db[o] = sum * inv_n;
        }
    }

    /// Error signal for the upstream layer: `da = W·dz`.
    ///
    /// Shape contract:
    /// - `dz` is `(out_dim, n)`
    /// - `da` is `(in_dim, n)`, overwritten
    pub(crate) fn backprop_signal(&self, dz: &Matrix, da: &mut Matrix) {
        let n = dz.cols();
        debug_assert_eq!(dz.rows(), self.out_dim);
        debug_assert_eq!(da.rows(), self.in_dim);
        debug_assert_eq!(da.cols(), n);

        gemm_f32(
            self.in_dim,
            n,
            self.out_dim,
            1.0,
            &self.weights,
            self.out_dim,
            1,
            dz.as_slice(),
            n,
            1,
            da.as_mut_slice(),
            n,
            1,
        );
    }

    /// Apply one gradient-descent step: `param -= lr * d_param`.
    #[inline]
    pub fn sgd_step(&mut self, d_weights: &[f32], d_biases: &[f32], lr: f32) {
        debug_assert_eq!(d_weights.len(), self.weights.len());
        debug_assert_eq!(d_biases.len(), self.biases.len());

        for (w, &g) in self.weights.iter_mut().zip(d_weights) {
            *w -= lr * g;
        }
        for (b, &g) in self.biases.iter_mut().zip(d_biases) {
            *b -= lr * g;
        }
    }
}
