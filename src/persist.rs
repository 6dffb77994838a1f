//! Model persistence.
//!
//! One JSON file per model, holding the layer-size sequence, every layer's
//! parameters, and the metrics history of the run that produced it. The
//! on-disk structs are deliberately separate from the in-memory types so the
//! format stays stable if internals change, and deserialization validates
//! dimensions, buffer lengths, and finiteness before a `Network` is built.
//!
//! Loading restores parameters and layer sizes only; metric histories are
//! carried in the file for inspection but a fresh run starts with an empty
//! history.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, History, Layer, Network, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

/// File name used inside the model directory.
pub const MODEL_FILE_NAME: &str = "model.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    pub format_version: u32,
    /// Layer widths including the input feature count at index 0.
    pub layer_sizes: Vec<usize>,
    pub layers: Vec<SavedLayer>,
    pub history: History,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLayer {
    pub in_dim: usize,
    pub out_dim: usize,
    /// Row-major (in_dim, out_dim).
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl SavedModel {
    pub fn from_network(network: &Network, history: &History) -> Self {
        let mut layers = Vec::with_capacity(network.num_layers());
        for i in 0..network.num_layers() {
            let layer = network.layer(i).expect("layer idx must be valid");
            layers.push(SavedLayer {
                in_dim: layer.in_dim(),
                out_dim: layer.out_dim(),
                weights: layer.weights().to_vec(),
                biases: layer.biases().to_vec(),
            });
        }
        Self {
            format_version: MODEL_FORMAT_VERSION,
            layer_sizes: network.layer_sizes().to_vec(),
            layers,
            history: history.clone(),
        }
    }

    /// Check structural consistency: version, non-emptiness, and that every
    /// layer's dims chain through the declared layer-size sequence.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported model format_version {}; expected {MODEL_FORMAT_VERSION}",
                self.format_version
            )));
        }
        if self.layers.is_empty() {
            return Err(Error::InvalidData(
                "saved model must have at least one layer".to_owned(),
            ));
        }
        if self.layer_sizes.len() != self.layers.len() + 1 {
            return Err(Error::InvalidShape(format!(
                "layer_sizes has {} entries for {} layers",
                self.layer_sizes.len(),
                self.layers.len()
            )));
        }

        for (i, layer) in self.layers.iter().enumerate() {
            if layer.in_dim != self.layer_sizes[i] || layer.out_dim != self.layer_sizes[i + 1] {
                return Err(Error::InvalidShape(format!(
                    "layer {i} is ({}, {}), layer_sizes declares ({}, {})",
                    layer.in_dim,
                    layer.out_dim,
                    self.layer_sizes[i],
                    self.layer_sizes[i + 1]
                )));
            }
        }

        Ok(())
    }

    /// Validate and rebuild the network.
    pub fn into_network(self) -> Result<Network> {
        self.validate()?;

        let mut layers = Vec::with_capacity(self.layers.len());
        for (i, saved) in self.layers.into_iter().enumerate() {
            let layer = Layer::from_parts(saved.in_dim, saved.out_dim, saved.weights, saved.biases)
                .map_err(|e| Error::InvalidData(format!("layer {i} invalid: {e}")))?;
            layers.push(layer);
        }

        Ok(Network::from_layers(layers))
    }
}

impl Network {
    /// Persist this network and its training history to `model_dir`.
    ///
    /// Creates the directory if needed and writes a single pretty-printed
    /// JSON file, overwriting any previous model there.
    pub fn save<P: AsRef<Path>>(&self, model_dir: P, history: &History) -> Result<()> {
        let dir = model_dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::InvalidData(format!("failed to create {}: {e}", dir.display())))?;

        let saved = SavedModel::from_network(self, history);
        let json = serde_json::to_string_pretty(&saved)
            .map_err(|e| Error::InvalidData(format!("failed to serialize model: {e}")))?;

        let path = dir.join(MODEL_FILE_NAME);
        std::fs::write(&path, json)
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", path.display())))?;
        Ok(())
    }

    /// Load a persisted network from `model_dir`.
    ///
    /// Requesting a load without a model directory is a configuration error,
    /// surfaced immediately.
    pub fn load(model_dir: Option<&Path>) -> Result<Network> {
        let dir = model_dir.ok_or_else(|| {
            Error::InvalidConfig(
                "a model directory must be set when loading a saved model".to_owned(),
            )
        })?;

        let path = dir.join(MODEL_FILE_NAME);
        let json = std::fs::read_to_string(&path)
            .map_err(|e| Error::InvalidData(format!("failed to read {}: {e}", path.display())))?;
        let saved: SavedModel = serde_json::from_str(&json)
            .map_err(|e| Error::InvalidData(format!("failed to parse {}: {e}", path.display())))?;

        saved.into_network()
    }
}
