//! The training loop.
//!
//! `Network::fit` drives mini-batch gradient descent: each iteration samples
//! a fixed-size batch uniformly at random **with replacement** from the
//! training set, runs forward/backward, and applies one fixed-rate update.
//! Every `eval_every` steps it evaluates cost and accuracy over the full
//! training and validation sets, appends to the metrics history, and emits
//! one progress line. There is no early stopping; the loop always runs its
//! configured iteration count and then persists the final parameters if a
//! model directory is configured.

use std::path::PathBuf;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Dataset, Error, History, Matrix, Network, Result, metrics};

#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Fixed learning rate for the whole run.
    pub learning_rate: f32,
    /// Mini-batch size (sampled with replacement).
    pub batch_size: usize,
    /// Total number of update steps.
    pub n_iterations: usize,
    /// Evaluate and record metrics every this many steps (step 0 included).
    pub eval_every: usize,
    /// Seed for batch sampling. Independent of the seed the network was
    /// constructed with.
    pub seed: u64,
    /// Where to persist the final model; `None` disables persistence.
    pub model_dir: Option<PathBuf>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            batch_size: 64,
            n_iterations: 2500,
            eval_every: 100,
            seed: 1,
            model_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FitReport {
    pub history: History,
}

impl Network {
    /// Train on `train`, tracking generalization on `val`.
    ///
    /// Returns the metrics history recorded at every `eval_every`-th step.
    pub fn fit(&mut self, train: &Dataset, val: &Dataset, cfg: &FitConfig) -> Result<FitReport> {
        if train.is_empty() {
            return Err(Error::InvalidData(
                "train dataset must not be empty".to_owned(),
            ));
        }
        for (name, ds) in [("train", train), ("val", val)] {
            if ds.input_dim() != self.input_dim() {
                return Err(Error::InvalidData(format!(
                    "{name} input_dim {} does not match network input_dim {}",
                    ds.input_dim(),
                    self.input_dim()
                )));
            }
            if ds.n_classes() != self.output_dim() {
                return Err(Error::InvalidData(format!(
                    "{name} has {} classes, network outputs {}",
                    ds.n_classes(),
                    self.output_dim()
                )));
            }
        }
        if val.is_empty() {
            return Err(Error::InvalidData(
                "val dataset must not be empty".to_owned(),
            ));
        }
        if cfg.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if cfg.n_iterations == 0 {
            return Err(Error::InvalidConfig("n_iterations must be > 0".to_owned()));
        }
        if cfg.eval_every == 0 {
            return Err(Error::InvalidConfig("eval_every must be > 0".to_owned()));
        }
        if !(cfg.learning_rate.is_finite() && cfg.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(
                "learning_rate must be finite and > 0".to_owned(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut history = History::new();

        // Batch buffers are allocated once and refilled each iteration.
        let mut x_batch = Matrix::zeros(cfg.batch_size, train.input_dim());
        let mut y_batch = Matrix::zeros(cfg.batch_size, train.n_classes());

        for step in 0..cfg.n_iterations {
            for r in 0..cfg.batch_size {
                let idx = rng.gen_range(0..train.len());
                x_batch.row_mut(r).copy_from_slice(train.input_row(idx));
                y_batch.row_mut(r).copy_from_slice(train.target_row(idx));
            }

            let cache = self.forward_batch(&x_batch);
            let grads = self.backward_batch(&x_batch, &y_batch, &cache);
            self.sgd_step(&grads, cfg.learning_rate);

            if step % cfg.eval_every == 0 {
                let train_cache = self.forward_batch(train.inputs());
                let train_cost = metrics::cross_entropy(train_cache.output(), train.targets());
                let train_acc = metrics::accuracy(train_cache.output(), train.targets());

                let val_cache = self.forward_batch(val.inputs());
                let val_cost = metrics::cross_entropy(val_cache.output(), val.targets());
                let val_acc = metrics::accuracy(val_cache.output(), val.targets());

                history.push(step, train_cost, val_cost, train_acc, val_acc);
                info!(
                    "step {step}: train cost {train_cost:.4}, train accuracy {train_acc:.2}%, \
                     val cost {val_cost:.4}, val accuracy {val_acc:.2}%"
                );
            }
        }

        if let Some(dir) = &cfg.model_dir {
            self.save(dir, &history)?;
            info!("model saved to {}", dir.display());
        }

        Ok(FitReport { history })
    }
}
