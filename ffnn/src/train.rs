use std::time::Instant;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{BatchIterator, DataIterator, DataSetIterator};
use crate::error::{Error, Result};
use crate::gradient_descent::Optimizer;
use crate::linear_algebra::{Tensor, Value};
use crate::loss::Loss;
use crate::network::Network;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    /// Rows per batch. `None` trains on the whole data set at once.
    pub batch_size: Option<usize>,
    pub shuffle: bool,
    /// Log the loss every this many epochs. Zero disables epoch logging.
    pub log_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 5000,
            batch_size: Some(32),
            shuffle: true,
            log_every: 100,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == Some(0) {
            return Err(Error::InvalidConfig("batch size must be positive".to_owned()));
        }
        Ok(())
    }

    pub fn data_iterator(&self) -> Box<dyn DataIterator> {
        match self.batch_size {
            Some(batch_size) => Box::new(BatchIterator::new(batch_size, self.shuffle)),
            None => Box::new(DataSetIterator::new(self.shuffle)),
        }
    }
}

/// Trains `network` on the given data set, returning the mean batch loss of every epoch.
pub fn train<R>(
    network: &mut Network,
    inputs: &Tensor,
    targets: &Tensor,
    config: &TrainConfig,
    loss: &dyn Loss,
    optimizer: &mut dyn Optimizer,
    rng: &mut R,
) -> Result<Vec<Value>>
where
    R: RngCore,
{
    config.validate()?;
    let iterator = config.data_iterator();

    let mut epoch_losses = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        let start_time = Instant::now();

        let mut epoch_loss = 0.0;
        let mut batch_count = 0;

        for batch in iterator.batches(inputs, targets, &mut *rng)? {
            // Propagate forward ====================

            let predicted = network.forward(&batch.inputs)?;
            let batch_loss = loss.loss(&predicted, &batch.targets)?;

            // Propagate backward ===================

            let output_gradients = loss.gradient(&predicted, &batch.targets)?;
            network.backward(&output_gradients)?;

            // Descend gradients ====================

            optimizer.step(network)?;

            epoch_loss += batch_loss;
            batch_count += 1;

            debug!(epoch, batch = batch_count, loss = batch_loss, "Trained batch.");
        }

        let average_loss = if batch_count > 0 {
            epoch_loss / batch_count as Value
        } else {
            0.0
        };

        if config.log_every > 0 && epoch % config.log_every == 0 {
            info!(
                epoch,
                loss = average_loss,
                elapsed = ?start_time.elapsed(),
                "Finished epoch."
            );
        }

        epoch_losses.push(average_loss);
    }

    Ok(epoch_losses)
}
