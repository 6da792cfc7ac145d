use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use tracing::{error, info};

use ffnn::layer::{Linear, BIASES, WEIGHTS};
use ffnn::linear_algebra::{Tensor, Value};
use ffnn::loss::Mse;
use ffnn::network::Network;
use ffnn::train::{train, TrainConfig};
use ffnn::{Error, Result};

use crate::args::{FitConfig, Line};
use crate::session::{load_config, save_network, seeded_rng};

/// Draws `samples` points `(x, slope * x + intercept + noise)` with `x` uniform in [-1, 1).
fn sample_line<R: Rng>(line: Line, samples: usize, rng: &mut R) -> Result<(Tensor, Tensor)> {
    let noise = Normal::new(0.0, line.noise)
        .map_err(|err| Error::InvalidConfig(format!("invalid noise: {err}")))?;

    let xs = Uniform::new(-1.0, 1.0)
        .sample_iter(&mut *rng)
        .take(samples)
        .collect::<Vec<Value>>();
    let ys = xs
        .iter()
        .map(|x| line.slope * x + line.intercept + noise.sample(rng))
        .collect::<Vec<_>>();

    Ok((
        Tensor::from_values((samples, 1), xs)?,
        Tensor::from_values((samples, 1), ys)?,
    ))
}

pub fn run_fit(config: FitConfig) -> bool {
    if config.samples == 0 {
        error!("Need at least one sample.");
        return false;
    }

    let defaults = TrainConfig {
        epochs: 200,
        batch_size: Some(10),
        shuffle: true,
        log_every: 20,
    };
    let Some(train_config) = load_config(&config.training, defaults) else {
        return false;
    };

    let mut rng = seeded_rng(&config.training);

    let result: Result<Network> = (|| {
        let (inputs, targets) = sample_line(config.line, config.samples, &mut rng)?;

        info!(
            samples = config.samples,
            line = ?config.line,
            optimizer = ?config.training.optimizer,
            "Fitting line."
        );

        let mut network = Network::new().with(Linear::new(1, 1, &mut rng)?);
        let mut optimizer = config.training.optimizer.build();
        let losses = train(
            &mut network,
            &inputs,
            &targets,
            &train_config,
            &Mse,
            optimizer.as_mut(),
            &mut rng,
        )?;
        if let Some(loss) = losses.last() {
            info!(loss, "Finished training.");
        }

        Ok(network)
    })();

    let network = match result {
        Ok(network) => network,
        Err(err) => {
            error!(error = %err, "Training failed.");
            return false;
        }
    };

    let parameters = network.layers()[0].parameters();
    let learned = |name| {
        parameters
            .get(name)
            .and_then(|value: &Tensor| value.as_slice().first().copied())
            .unwrap_or_default()
    };
    info!(
        slope = learned(WEIGHTS),
        intercept = learned(BIASES),
        "Learned line."
    );

    save_network(&config.training, &network)
}
