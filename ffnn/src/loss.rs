use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::linear_algebra::{Tensor, Value};

/// Scores a batch of predictions, and supplies the gradient that starts the backward pass.
pub trait Loss {
    fn loss(&self, predicted: &Tensor, actual: &Tensor) -> Result<Value>;

    /// The gradient of [`loss`](Self::loss) with respect to `predicted`.
    fn gradient(&self, predicted: &Tensor, actual: &Tensor) -> Result<Tensor>;
}

fn batch_size(tensor: &Tensor) -> Value {
    tensor.shape().leading().unwrap_or(1).max(1) as Value
}

/// Calculates the Mean Squared Error, averaged over the batch and summed over the outputs.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct Mse;

impl Loss for Mse {
    fn loss(&self, predicted: &Tensor, actual: &Tensor) -> Result<Value> {
        let squared_error = predicted.zip_map(actual, |p, a| (p - a) * (p - a))?;
        Ok(squared_error.sum() / batch_size(predicted))
    }

    fn gradient(&self, predicted: &Tensor, actual: &Tensor) -> Result<Tensor> {
        let batch_size = batch_size(predicted);
        predicted.zip_map(actual, |p, a| 2.0 * (p - a) / batch_size)
    }
}

/// The total squared error over every value in the batch.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct SumSquaredError;

impl Loss for SumSquaredError {
    fn loss(&self, predicted: &Tensor, actual: &Tensor) -> Result<Value> {
        Ok(predicted
            .zip_map(actual, |p, a| (p - a) * (p - a))?
            .sum())
    }

    fn gradient(&self, predicted: &Tensor, actual: &Tensor) -> Result<Tensor> {
        predicted.zip_map(actual, |p, a| 2.0 * (p - a))
    }
}
