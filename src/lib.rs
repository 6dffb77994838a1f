//! A feed-forward neural network classifier for tabular data.
//!
//! `tabmlp` is a small, from-scratch implementation of a dense multilayer
//! perceptron trained with mini-batch gradient descent and manually derived
//! backpropagation, built for delimited-text classification problems
//! (the canonical example being voice-gender prediction from acoustic
//! features).
//!
//! # Design goals
//!
//! - Fixed architecture, explicit math: ReLU hidden layers, softmax output,
//!   plain fixed-rate gradient descent. No optimizer or activation plugins.
//! - Clear contracts: shapes are explicit and validated at the API boundary;
//!   hot paths treat mismatches as programmer error and panic via `assert!`.
//! - Explicit randomness: a seed is threaded into initialization and batch
//!   sampling, so runs are reproducible by construction.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - Datasets are row-major: inputs `(len, input_dim)`, one-hot targets
//!   `(len, classes)`.
//! - Inside the network, batches are feature-major: activations and
//!   pre-activations are `(dim, batch)`, and predictions come back as a
//!   `(classes, batch)` probability matrix whose columns each sum to 1.
//! - Layer weights are row-major with shape `(in_dim, out_dim)`.
//!
//! # Quick start
//!
//! ```rust
//! use tabmlp::dataset::one_hot;
//! use tabmlp::{Dataset, FitConfig, Matrix, Network};
//!
//! # fn main() -> tabmlp::Result<()> {
//! let inputs = Matrix::from_rows(&[
//!     vec![0.1, 0.2],
//!     vec![0.15, 0.1],
//!     vec![0.9, 0.8],
//!     vec![0.8, 0.95],
//! ])?;
//! let targets = one_hot(&[0, 0, 1, 1], 2)?;
//! let data = Dataset::from_parts(inputs, targets, vec!["low".into(), "high".into()])?;
//!
//! let mut net = Network::new_with_seed(&[2, 8, 2], 1)?;
//! let report = net.fit(
//!     &data,
//!     &data,
//!     &FitConfig {
//!         n_iterations: 200,
//!         batch_size: 4,
//!         ..FitConfig::default()
//!     },
//! )?;
//! assert_eq!(report.history.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod dataset;
pub mod error;
pub mod layer;
pub(crate) mod matmul;
pub mod matrix;
pub mod metrics;
pub mod network;
pub mod persist;
pub mod report;
pub mod train;

pub use dataset::{Dataset, Fold, MinMaxScaler};
pub use error::{Error, Result};
pub use layer::Layer;
pub use matrix::Matrix;
pub use metrics::History;
pub use network::{ForwardCache, Gradients, Network};
pub use persist::{MODEL_FILE_NAME, MODEL_FORMAT_VERSION, SavedModel};
pub use train::{FitConfig, FitReport};
