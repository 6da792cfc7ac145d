use tracing::{error, info};

use ffnn::layer::{Activation, Initializer, Linear};
use ffnn::linear_algebra::Tensor;
use ffnn::loss::Mse;
use ffnn::network::Network;
use ffnn::train::{train, TrainConfig};
use ffnn::Result;

use crate::args::XorConfig;
use crate::session::{load_config, save_network, seeded_rng};

pub fn run_xor(config: XorConfig) -> bool {
    let defaults = TrainConfig {
        epochs: 3000,
        batch_size: None,
        shuffle: false,
        log_every: 500,
    };
    let Some(train_config) = load_config(&config.training, defaults) else {
        return false;
    };

    let mut rng = seeded_rng(&config.training);

    let inputs: Tensor = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]].into();
    let targets: Tensor = [[0.0], [1.0], [1.0], [0.0]].into();

    let result: Result<Network> = (|| {
        let hidden = config.net.hidden;
        let mut network = Network::new()
            .with(Linear::with_initializer(2, hidden, Initializer::Glorot, &mut rng)?)
            .with(Activation::new(config.net.activation))
            .with(Linear::with_initializer(hidden, 1, Initializer::Glorot, &mut rng)?)
            .with(Activation::sigmoid());

        info!(
            hidden,
            activation = config.net.activation.name(),
            optimizer = ?config.training.optimizer,
            "Training XOR network."
        );

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

    let mut network = match result {
        Ok(network) => network,
        Err(err) => {
            error!(error = %err, "Training failed.");
            return false;
        }
    };

    let outputs = match network.predict(&inputs) {
        Ok(outputs) => outputs,
        Err(err) => {
            error!(error = %err, "Could not evaluate network.");
            return false;
        }
    };

    println!("\n  a   b | xor  output");
    for row in 0..4 {
        let value = |tensor: &Tensor, column| tensor.get(&[row, column]).unwrap_or_default();
        println!(
            "{:>3} {:>3} | {:>3}  {:.4}",
            value(&inputs, 0),
            value(&inputs, 1),
            value(&targets, 0),
            value(&outputs, 0),
        );
    }
    println!();

    save_network(&config.training, &network)
}
