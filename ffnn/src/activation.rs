use serde::{Deserialize, Serialize};

use crate::linear_algebra::Value;

pub fn relu(x: Value) -> Value {
    x.max(0.0)
}

pub fn relu_prime(x: Value) -> Value {
    match x > 0.0 {
        true => 1.0,
        false => 0.0,
    }
}

pub fn tanh(x: Value) -> Value {
    x.tanh()
}

pub fn tanh_prime(x: Value) -> Value {
    let x_tanh = x.tanh();
    1.0 - x_tanh * x_tanh
}

/// The logistic function. Only ever exponentiates a non-positive number, so it can't overflow.
pub fn sigmoid(x: Value) -> Value {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub fn sigmoid_prime(x: Value) -> Value {
    let y = sigmoid(x);
    y * (1.0 - y)
}

/// An elementwise nonlinearity paired with its derivative.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationFunction {
    Relu,
    Sigmoid,
    Tanh,
}

impl ActivationFunction {
    pub fn apply(self, x: Value) -> Value {
        match self {
            Self::Relu => relu(x),
            Self::Sigmoid => sigmoid(x),
            Self::Tanh => tanh(x),
        }
    }

    pub fn derivative(self, x: Value) -> Value {
        match self {
            Self::Relu => relu_prime(x),
            Self::Sigmoid => sigmoid_prime(x),
            Self::Tanh => tanh_prime(x),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
        }
    }
}

impl std::str::FromStr for ActivationFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relu" => Ok(Self::Relu),
            "sigmoid" => Ok(Self::Sigmoid),
            "tanh" => Ok(Self::Tanh),
            unknown => Err(format!("unknown activation function: {unknown}")),
        }
    }
}
