use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::linear_algebra::Tensor;

/// A layer's learnable tensors and the gradients of the loss with respect to them, both keyed
/// by parameter name.
///
/// A gradient can only exist for a named parameter, and always has that parameter's shape.
/// Gradients are not serialized.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Parameters {
    values: BTreeMap<String, Tensor>,
    #[serde(skip)]
    gradients: BTreeMap<String, Tensor>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter. Any gradient stored for the old value is dropped.
    pub fn insert(&mut self, name: impl Into<String>, value: Tensor) -> Option<Tensor> {
        let name = name.into();
        self.gradients.remove(&name);
        self.values.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.values.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Tensor> {
        self.get(name)
            .ok_or_else(|| Error::MissingParameter(name.to_owned()))
    }

    pub fn gradient(&self, name: &str) -> Option<&Tensor> {
        self.gradients.get(name)
    }

    /// Stores the gradient for `name`, replacing whatever was there before.
    pub fn set_gradient(&mut self, name: &str, gradient: Tensor) -> Result<()> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_owned()))?;
        gradient.require_shape(value.shape())?;

        self.gradients.insert(name.to_owned(), gradient);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn gradients(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.gradients
            .iter()
            .map(|(name, gradient)| (name.as_str(), gradient))
    }

    /// Every parameter, mutably, alongside its most recent gradient if one has been computed.
    /// This is the view an optimizer works through.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Tensor, Option<&Tensor>)> {
        let gradients = &self.gradients;
        self.values
            .iter_mut()
            .map(move |(name, value)| (name.as_str(), value, gradients.get(name)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
