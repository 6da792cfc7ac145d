use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::layer::{Layer, Parameters};
use crate::linear_algebra::Tensor;

/// An ordered stack of layers. Outputs of each layer feed the next one.
#[derive(Default)]
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
}

/// The parameters of one layer, as saved by [`Network::snapshot`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LayerSnapshot {
    pub layer: String,
    pub parameters: Parameters,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, layer: impl Layer + 'static) -> Self {
        self.push(layer);
        self
    }

    pub fn push(&mut self, layer: impl Layer + 'static) {
        self.layers.push(Box::new(layer));
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Box<dyn Layer>] {
        &mut self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn forward(&mut self, inputs: &Tensor) -> Result<Tensor> {
        self.layers
            .iter_mut()
            .try_fold(inputs.clone(), |x, layer| layer.forward(&x))
    }

    /// Propagates the gradient of the loss with respect to the network's outputs back through
    /// every layer, last to first, and returns the gradient with respect to its inputs.
    pub fn backward(&mut self, output_gradients: &Tensor) -> Result<Tensor> {
        self.layers
            .iter_mut()
            .rev()
            .try_fold(output_gradients.clone(), |gradients, layer| {
                layer.backward(&gradients)
            })
    }

    /// Runs the network forward. Identical to `forward`, named for inference call sites.
    pub fn predict(&mut self, inputs: &Tensor) -> Result<Tensor> {
        self.forward(inputs)
    }

    pub fn snapshot(&self) -> Vec<LayerSnapshot> {
        self.layers
            .iter()
            .map(|layer| LayerSnapshot {
                layer: layer.name().to_owned(),
                parameters: layer.parameters().clone(),
            })
            .collect()
    }

    /// Loads parameter values saved by [`snapshot`](Self::snapshot) into a network of the same
    /// architecture. Nothing is changed unless every layer matches.
    pub fn restore(&mut self, snapshots: &[LayerSnapshot]) -> Result<()> {
        if snapshots.len() != self.layers.len() {
            return Err(Error::InvalidConfig(format!(
                "snapshot has {} layers, network has {}",
                snapshots.len(),
                self.layers.len()
            )));
        }

        for (index, (layer, snapshot)) in self.layers.iter().zip(snapshots).enumerate() {
            if layer.name() != snapshot.layer {
                return Err(Error::InvalidConfig(format!(
                    "layer {index} is {}, snapshot has {}",
                    layer.name(),
                    snapshot.layer
                )));
            }

            let parameters = layer.parameters();
            if parameters.len() != snapshot.parameters.len() {
                return Err(Error::InvalidConfig(format!(
                    "layer {index} has {} parameters, snapshot has {}",
                    parameters.len(),
                    snapshot.parameters.len()
                )));
            }

            for (name, value) in snapshot.parameters.values() {
                value.require_shape(parameters.require(name)?.shape())?;
            }
        }

        for (index, (layer, snapshot)) in self.layers.iter_mut().zip(snapshots).enumerate() {
            let parameters = layer.parameters_mut();
            for (name, value) in snapshot.parameters.values() {
                parameters.insert(name, value.clone());
            }

            debug!(index, layer = layer.name(), "Restored layer parameters.");
        }

        Ok(())
    }
}
