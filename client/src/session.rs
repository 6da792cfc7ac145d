use std::fs::File;
use std::io::BufWriter;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};

use ffnn::network::Network;
use ffnn::train::TrainConfig;

use crate::args::TrainingArgs;

/// Seeds the generator from `--seed`, or from entropy when none was given.
pub fn seeded_rng(args: &TrainingArgs) -> StdRng {
    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!(?seed, "Seeding random number generator.");
    StdRng::seed_from_u64(seed)
}

/// Reads the config file, if any, and applies the command line overrides on top of it.
pub fn load_config(args: &TrainingArgs, defaults: TrainConfig) -> Option<TrainConfig> {
    let mut config = match &args.config {
        Some(filename) => {
            let file = match File::open(filename) {
                Ok(file) => file,
                Err(err) => {
                    error!(error = ?err, %filename, "Could not open config file.");
                    return None;
                }
            };
            match serde_json::from_reader(file) {
                Ok(config) => config,
                Err(err) => {
                    error!(error = ?err, %filename, "Invalid config file.");
                    return None;
                }
            }
        }
        None => defaults,
    };

    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    match args.batch_size {
        Some(0) => config.batch_size = None,
        Some(batch_size) => config.batch_size = Some(batch_size),
        None => {}
    }

    if let Err(err) = config.validate() {
        error!(error = %err, "Invalid training config.");
        return None;
    }

    Some(config)
}

/// Writes the network's parameters to `--output`, if given.
pub fn save_network(args: &TrainingArgs, network: &Network) -> bool {
    let Some(filename) = &args.output else {
        return true;
    };

    let file = match File::create(filename) {
        Ok(file) => file,
        Err(err) => {
            error!(error = ?err, %filename, "Could not create output file.");
            return false;
        }
    };

    match serde_json::to_writer_pretty(BufWriter::new(file), &network.snapshot()) {
        Ok(()) => {
            info!(%filename, "Saved network parameters.");
            true
        }
        Err(err) => {
            error!(error = ?err, %filename, "Could not write network parameters.");
            false
        }
    }
}
