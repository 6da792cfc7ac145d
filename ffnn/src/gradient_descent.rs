use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::linear_algebra::{Tensor, Value};
use crate::network::Network;

/// Updates every layer's parameters from the gradients stored by the last backward pass.
///
/// Parameters without a gradient are left alone.
pub trait Optimizer {
    fn step(&mut self, network: &mut Network) -> Result<()>;
}

/// Plain gradient descent: `parameter -= learning_rate * gradient`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimpleGradientDescent {
    pub learning_rate: Value,
}

impl SimpleGradientDescent {
    pub fn new(learning_rate: Value) -> Self {
        Self { learning_rate }
    }
}

impl Default for SimpleGradientDescent {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl Optimizer for SimpleGradientDescent {
    fn step(&mut self, network: &mut Network) -> Result<()> {
        for layer in network.layers_mut() {
            for (_, value, gradient) in layer.parameters_mut().iter_mut() {
                if let Some(gradient) = gradient {
                    *value -= gradient * self.learning_rate;
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct Moments {
    momentum: Tensor,
    rms: Tensor,
}

impl Moments {
    fn zeros(like: &Tensor) -> Self {
        Self {
            momentum: Tensor::zeros(like.shape().clone()),
            rms: Tensor::zeros(like.shape().clone()),
        }
    }
}

/// Adam, keeping a momentum and RMS estimate for every parameter of every layer.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Adam {
    learning_rate: Value,
    beta1: Value,
    beta2: Value,
    epsilon: Value,
    t: usize,
    moments: Vec<BTreeMap<String, Moments>>,
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.001)
    }
}

impl Adam {
    pub fn new(learning_rate: Value) -> Self {
        Self::with_betas(learning_rate, 0.9, 0.999, 1e-8)
    }

    pub fn with_betas(learning_rate: Value, beta1: Value, beta2: Value, epsilon: Value) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            moments: Vec::new(),
        }
    }

    /// The number of steps taken so far.
    pub fn steps(&self) -> usize {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, network: &mut Network) -> Result<()> {
        self.t += 1;
        let t = i32::try_from(self.t).unwrap_or(i32::MAX);

        if self.moments.len() < network.len() {
            self.moments.resize_with(network.len(), BTreeMap::new);
        }

        for (layer, layer_moments) in network.layers_mut().iter_mut().zip(&mut self.moments) {
            for (name, value, gradient) in layer.parameters_mut().iter_mut() {
                let Some(gradient) = gradient else {
                    continue;
                };

                let moments = layer_moments
                    .entry(name.to_owned())
                    .or_insert_with(|| Moments::zeros(value));
                if moments.momentum.shape() != value.shape() {
                    *moments = Moments::zeros(value);
                }

                // Momentum update ======================

                moments.momentum *= self.beta1;
                moments.momentum += gradient * (1.0 - self.beta1);

                // RMS update ===========================

                let gradient_squared = gradient.map(|x| x * x);
                moments.rms *= self.beta2;
                moments.rms += gradient_squared * (1.0 - self.beta2);

                // Correction for bias ==================

                let momentum_c = &moments.momentum / (1.0 - self.beta1.powi(t));
                let rms_c = &moments.rms / (1.0 - self.beta2.powi(t));

                // Descend gradients ====================

                let rm = rms_c.map(Value::sqrt) + self.epsilon;
                *value -= (momentum_c / rm) * self.learning_rate;
            }
        }

        Ok(())
    }
}
