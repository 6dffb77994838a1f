//! The feed-forward network: parameter store, batched forward/backward
//! propagation, and the gradient-descent update step.
//!
//! Batches enter as row-major `(batch, input_dim)` matrices and are
//! transposed once into feature-major layout; every hidden layer applies
//! `relu(Wᵀ·A + b)` and the output layer a column-wise softmax. `backward_batch`
//! consumes the cache produced by `forward_batch` and emits batch-averaged
//! gradients shaped exactly like the parameters.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::activation::{relu, relu_grad, softmax_columns};
use crate::{Error, Layer, Matrix, Result};

#[derive(Debug, Clone)]
pub struct Network {
    layer_sizes: Vec<usize>,
    layers: Vec<Layer>,
}

/// Per-layer tensors captured by `forward_batch` for the backward pass.
///
/// Rebuilt on every forward call; no history is retained across batches.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    layers: Vec<LayerCache>,
}

#[derive(Debug, Clone)]
struct LayerCache {
    /// Pre-activation, shape `(out_dim, batch)`.
    z: Matrix,
    /// Post-activation, shape `(out_dim, batch)`.
    a: Matrix,
}

/// Parameter gradients for a `Network` (overwrite semantics).
#[derive(Debug, Clone)]
pub struct Gradients {
    d_weights: Vec<Vec<f32>>,
    d_biases: Vec<Vec<f32>>,
}

impl Network {
    /// Build a network with freshly initialized parameters.
    ///
    /// `sizes` lists every layer width including the input feature count at
    /// index 0 and the class count at the end. Initialization is
    /// deterministic for a given `seed`.
    pub fn new_with_seed(sizes: &[usize], seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(sizes, &mut rng)
    }

    /// Build a network drawing initial weights from the provided RNG.
    pub fn new_with_rng<R: Rng + ?Sized>(sizes: &[usize], rng: &mut R) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::InvalidConfig(
                "sizes must include input and output dims".to_owned(),
            ));
        }
        if sizes.contains(&0) {
            return Err(Error::InvalidConfig(
                "all layer sizes must be > 0".to_owned(),
            ));
        }

        let mut layers = Vec::with_capacity(sizes.len() - 1);
        for w in sizes.windows(2) {
            layers.push(Layer::new_with_rng(w[0], w[1], rng)?);
        }

        Ok(Self {
            layer_sizes: sizes.to_vec(),
            layers,
        })
    }

    /// Rebuild a network from already-validated layers.
    ///
    /// Adjacent layer dims must chain; this is checked by the caller
    /// (the persistence layer validates before constructing layers).
    pub(crate) fn from_layers(layers: Vec<Layer>) -> Self {
        debug_assert!(!layers.is_empty());
        let mut layer_sizes = Vec::with_capacity(layers.len() + 1);
        layer_sizes.push(layers[0].in_dim());
        for layer in &layers {
            layer_sizes.push(layer.out_dim());
        }
        Self {
            layer_sizes,
            layers,
        }
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layer_sizes[0]
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        *self
            .layer_sizes
            .last()
            .expect("network must have at least one layer")
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// The full layer-size sequence, input feature count first.
    #[inline]
    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        self.layers.get_mut(idx)
    }

    /// Allocate a zero-filled gradient set shaped like this network.
    pub fn gradients(&self) -> Gradients {
        Gradients::new(self)
    }

    /// Forward propagation over a batch.
    ///
    /// Shape contract: `inputs` is row-major `(batch, input_dim)` with
    /// `batch > 0`. Returns the per-layer cache; the final layer's
    /// post-activation is the `(classes, batch)` probability matrix.
    ///
    /// Pure function of `inputs` and the current parameters.
    pub fn forward_batch(&self, inputs: &Matrix) -> ForwardCache {
        assert_eq!(
            inputs.cols(),
            self.input_dim(),
            "input dim {} does not match network input_dim {}",
            inputs.cols(),
            self.input_dim()
        );
        assert!(inputs.rows() > 0, "input batch must not be empty");

        let n = inputs.rows();
        let a0 = inputs.transposed();
        let last = self.layers.len() - 1;

        let mut cache = ForwardCache {
            layers: Vec::with_capacity(self.layers.len()),
        };

        for (idx, layer) in self.layers.iter().enumerate() {
            let mut z = Matrix::zeros(layer.out_dim(), n);
            {
                let a_prev = if idx == 0 { &a0 } else { &cache.layers[idx - 1].a };
                layer.affine_forward(a_prev, &mut z);
            }

            let mut a = Matrix::zeros(layer.out_dim(), n);
            if idx == last {
                softmax_columns(&z, &mut a);
            } else {
                for (out, &v) in a.as_mut_slice().iter_mut().zip(z.as_slice()) {
                    *out = relu(v);
                }
            }

            cache.layers.push(LayerCache { z, a });
        }

        cache
    }

    /// Backward propagation over a batch.
    ///
    /// `cache` must come from a `forward_batch` call on the same `inputs`
    /// with the current parameters. `targets` is row-major
    /// `(batch, classes)` one-hot.
    ///
    /// The output-layer error starts as `probabilities - targetsᵀ` (the
    /// combined softmax + cross-entropy derivative) and is pushed back one
    /// layer at a time through the ReLU derivative. Gradients are averaged
    /// over the batch. No parameter is mutated.
    pub fn backward_batch(
        &self,
        inputs: &Matrix,
        targets: &Matrix,
        cache: &ForwardCache,
    ) -> Gradients {
        let n = inputs.rows();
        assert_eq!(
            inputs.cols(),
            self.input_dim(),
            "input dim {} does not match network input_dim {}",
            inputs.cols(),
            self.input_dim()
        );
        assert_eq!(
            targets.rows(),
            n,
            "targets batch {} does not match inputs batch {n}",
            targets.rows()
        );
        assert_eq!(
            targets.cols(),
            self.output_dim(),
            "targets dim {} does not match network output_dim {}",
            targets.cols(),
            self.output_dim()
        );
        assert_eq!(
            cache.layers.len(),
            self.layers.len(),
            "cache has {} layers, network has {}",
            cache.layers.len(),
            self.layers.len()
        );
        assert_eq!(
            cache.output().cols(),
            n,
            "cache batch {} does not match inputs batch {n}",
            cache.output().cols()
        );

        let inv_n = 1.0 / n as f32;
        let a0 = inputs.transposed();
        let mut grads = self.gradients();

        let last = self.layers.len() - 1;

        // dZ_L = A_L - Yᵀ.
        let mut dz = cache.layers[last].a.clone();
        for s in 0..n {
            let target_row = targets.row(s);
            for (c, &t) in target_row.iter().enumerate() {
                dz[(c, s)] -= t;
            }
        }

        for idx in (0..self.layers.len()).rev() {
            let layer = &self.layers[idx];
            let a_prev = if idx == 0 { &a0 } else { &cache.layers[idx - 1].a };

            layer.grad_weights(a_prev, &dz, inv_n, &mut grads.d_weights[idx]);
            layer.grad_biases(&dz, inv_n, &mut grads.d_biases[idx]);

            if idx > 0 {
                // dA_prev = W·dZ, then dZ_prev = dA_prev ⊙ relu'(Z_prev).
                let mut da = Matrix::zeros(layer.in_dim(), n);
                layer.backprop_signal(&dz, &mut da);

                let z_prev = &cache.layers[idx - 1].z;
                for (d, &z) in da.as_mut_slice().iter_mut().zip(z_prev.as_slice()) {
                    *d *= relu_grad(z);
                }
                dz = da;
            }
        }

        grads
    }

    /// Apply one gradient-descent step to every layer, in place.
    pub fn sgd_step(&mut self, grads: &Gradients, lr: f32) {
        assert!(
            lr.is_finite() && lr > 0.0,
            "learning rate must be finite and > 0"
        );
        assert_eq!(
            grads.d_weights.len(),
            self.layers.len(),
            "grads have {} layers, network has {}",
            grads.d_weights.len(),
            self.layers.len()
        );

        for i in 0..self.layers.len() {
            self.layers[i].sgd_step(&grads.d_weights[i], &grads.d_biases[i], lr);
        }
    }

    /// Class probabilities for a batch, shape `(classes, batch)`.
    pub fn predict(&self, inputs: &Matrix) -> Matrix {
        self.forward_batch(inputs).into_output()
    }

    /// Argmax accuracy against one-hot `targets`, as a percentage in [0, 100].
    pub fn evaluate(&self, inputs: &Matrix, targets: &Matrix) -> f32 {
        let cache = self.forward_batch(inputs);
        crate::metrics::accuracy(cache.output(), targets)
    }
}

impl ForwardCache {
    /// The final layer's post-activation: class probabilities `(classes, batch)`.
    #[inline]
    pub fn output(&self) -> &Matrix {
        &self
            .layers
            .last()
            .expect("cache must have at least one layer")
            .a
    }

    #[inline]
    pub fn into_output(mut self) -> Matrix {
        self.layers
            .pop()
            .expect("cache must have at least one layer")
            .a
    }

    /// Pre-activation of layer `idx`, shape `(out_dim, batch)`.
    #[inline]
    pub fn pre_activation(&self, idx: usize) -> &Matrix {
        &self.layers[idx].z
    }

    /// Post-activation of layer `idx`, shape `(out_dim, batch)`.
    #[inline]
    pub fn activation(&self, idx: usize) -> &Matrix {
        &self.layers[idx].a
    }
}

impl Gradients {
    fn new(network: &Network) -> Self {
        let mut d_weights = Vec::with_capacity(network.layers.len());
        let mut d_biases = Vec::with_capacity(network.layers.len());
        for layer in &network.layers {
            d_weights.push(vec![0.0; layer.in_dim() * layer.out_dim()]);
            d_biases.push(vec![0.0; layer.out_dim()]);
        }
        Self {
            d_weights,
            d_biases,
        }
    }

    #[inline]
    pub fn d_weights(&self, layer_idx: usize) -> &[f32] {
        &self.d_weights[layer_idx]
    }

    #[inline]
    pub fn d_biases(&self, layer_idx: usize) -> &[f32] {
        &self.d_biases[layer_idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::metrics::cross_entropy;

    fn toy_batch() -> (Matrix, Matrix) {
        let inputs = Matrix::from_rows(&[
            vec![0.3, -0.7, 0.1],
            vec![1.0, 0.2, -0.4],
            vec![-0.5, 0.9, 0.6],
            vec![0.0, 0.0, 1.0],
            vec![0.8, -0.1, -0.9],
        ])
        .unwrap();
        let targets = Matrix::from_rows(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
        ])
        .unwrap();
        (inputs, targets)
    }

    #[test]
    fn seeded_init_is_deterministic() {
        let a = Network::new_with_seed(&[4, 8, 3], 123).unwrap();
        let b = Network::new_with_seed(&[4, 8, 3], 123).unwrap();

        for idx in 0..a.num_layers() {
            assert_eq!(a.layer(idx).unwrap().weights(), b.layer(idx).unwrap().weights());
            assert_eq!(a.layer(idx).unwrap().biases(), b.layer(idx).unwrap().biases());
        }
    }

    #[test]
    fn different_seeds_produce_different_weights() {
        let a = Network::new_with_seed(&[4, 8, 3], 1).unwrap();
        let b = Network::new_with_seed(&[4, 8, 3], 2).unwrap();
        assert_ne!(a.layer(0).unwrap().weights(), b.layer(0).unwrap().weights());
    }

    #[test]
    fn rejects_degenerate_layer_sizes() {
        assert!(Network::new_with_seed(&[4], 0).is_err());
        assert!(Network::new_with_seed(&[4, 0, 2], 0).is_err());
    }

    #[test]
    fn forward_output_columns_sum_to_one() {
        let net = Network::new_with_seed(&[3, 5, 4], 9).unwrap();
        let (inputs, _) = toy_batch();
        let cache = net.forward_batch(&inputs);
        let probs = cache.output();

        assert_eq!(probs.rows(), 4);
        assert_eq!(probs.cols(), inputs.rows());
        for c in 0..probs.cols() {
            let sum: f32 = (0..probs.rows()).map(|r| probs[(r, c)]).sum();
            assert!((sum - 1.0).abs() < 1e-5, "column {c} sums to {sum}");
        }
    }

    #[test]
    fn gradient_shapes_match_parameter_shapes() {
        let net = Network::new_with_seed(&[3, 7, 5, 2], 0).unwrap();
        let (inputs, targets) = toy_batch();
        let cache = net.forward_batch(&inputs);
        let grads = net.backward_batch(&inputs, &targets, &cache);

        for idx in 0..net.num_layers() {
            let layer = net.layer(idx).unwrap();
            assert_eq!(grads.d_weights(idx).len(), layer.weights().len());
            assert_eq!(grads.d_biases(idx).len(), layer.biases().len());
        }
    }

    #[test]
    fn backward_matches_numeric_gradients() {
        let mut net = Network::new_with_seed(&[3, 4, 2], 0).unwrap();
        let (inputs, targets) = toy_batch();

        let cache = net.forward_batch(&inputs);
        let grads = net.backward_batch(&inputs, &targets, &cache);

        let eps = 1e-2_f32;
        let abs_tol = 1e-3_f32;
        let rel_tol = 1e-2_f32;

        let loss_for = |net: &Network| {
            let cache = net.forward_batch(&inputs);
            cross_entropy(cache.output(), &targets)
        };

        for layer_idx in 0..net.num_layers() {
            let w_len = net.layer(layer_idx).unwrap().weights().len();
            for p in 0..w_len {
                let orig = net.layer(layer_idx).unwrap().weights()[p];

                net.layer_mut(layer_idx).unwrap().weights_mut()[p] = orig + eps;
                let loss_plus = loss_for(&net);
                net.layer_mut(layer_idx).unwrap().weights_mut()[p] = orig - eps;
                let loss_minus = loss_for(&net);
                net.layer_mut(layer_idx).unwrap().weights_mut()[p] = orig;

                let numeric = (loss_plus - loss_minus) / (2.0 * eps);
                let analytic = grads.d_weights(layer_idx)[p];
                let diff = (analytic - numeric).abs();
                let scale = analytic.abs().max(numeric.abs()).max(1.0);
                assert!(
                    diff <= abs_tol || diff / scale <= rel_tol,
                    "layer {layer_idx} weight {p}: analytic={analytic} numeric={numeric}"
                );
            }

            let b_len = net.layer(layer_idx).unwrap().biases().len();
            for p in 0..b_len {
                let orig = net.layer(layer_idx).unwrap().biases()[p];

                net.layer_mut(layer_idx).unwrap().biases_mut()[p] = orig + eps;
                let loss_plus = loss_for(&net);
                net.layer_mut(layer_idx).unwrap().biases_mut()[p] = orig - eps;
                let loss_minus = loss_for(&net);
                net.layer_mut(layer_idx).unwrap().biases_mut()[p] = orig;

                let numeric = (loss_plus - loss_minus) / (2.0 * eps);
                let analytic = grads.d_biases(layer_idx)[p];
                let diff = (analytic - numeric).abs();
                let scale = analytic.abs().max(numeric.abs()).max(1.0);
                assert!(
                    diff <= abs_tol || diff / scale <= rel_tol,
                    "layer {layer_idx} bias {p}: analytic={analytic} numeric={numeric}"
                );
            }
        }
    }

    #[test]
    fn one_train_cycle_decreases_batch_loss() {
        let mut net = Network::new_with_seed(&[3, 4, 2], 3).unwrap();
        let (inputs, targets) = toy_batch();

        let before = {
            let cache = net.forward_batch(&inputs);
            cross_entropy(cache.output(), &targets)
        };

        let cache = net.forward_batch(&inputs);
        let grads = net.backward_batch(&inputs, &targets, &cache);
        net.sgd_step(&grads, 0.05);

        let after = {
            let cache = net.forward_batch(&inputs);
            cross_entropy(cache.output(), &targets)
        };

        assert!(after < before, "loss did not decrease: {before} -> {after}");
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn forward_panics_on_input_dim_mismatch() {
        let net = Network::new_with_seed(&[3, 4, 2], 0).unwrap();
        let bad = Matrix::zeros(2, 5);
        net.forward_batch(&bad);
    }
}
