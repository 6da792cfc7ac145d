use std::collections::HashMap;
use std::str::FromStr;

use clap::{Args as ArgsTrait, Parser, Subcommand};

use ffnn::activation::ActivationFunction;
use ffnn::gradient_descent::{Adam, Optimizer, SimpleGradientDescent};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Trains a small network to reproduce the XOR truth table.
    Xor(XorConfig),
    /// Fits a single linear layer to noisy samples of a line.
    Fit(FitConfig),
}

#[derive(ArgsTrait, Clone, Debug)]
pub struct TrainingArgs {
    /// Optimizer options.
    ///
    /// Parameters:
    ///   type=string  - The update rule. (sgd or adam)
    ///   rate=decimal - The learning rate.
    #[arg(long, default_value = "type=adam,rate=0.05", verbatim_doc_comment)]
    pub optimizer: OptimizerOptions,

    /// The number of passes over the data set. Overrides the config file.
    #[arg(short, long, verbatim_doc_comment)]
    pub epochs: Option<usize>,

    /// Rows per batch. 0 trains on the whole data set at once. Overrides the config file.
    #[arg(short, long, verbatim_doc_comment)]
    pub batch_size: Option<usize>,

    /// A seed for parameter initialization, sampling, and shuffling. Random if not given.
    #[arg(short, long, verbatim_doc_comment)]
    pub seed: Option<u64>,

    /// A JSON file of training options. (epochs, batch_size, shuffle, log_every)
    #[arg(short, long, verbatim_doc_comment)]
    pub config: Option<String>,

    /// A file to save the trained parameters to, in JSON format.
    #[arg(short, long, verbatim_doc_comment)]
    pub output: Option<String>,
}

#[derive(ArgsTrait, Clone, Debug)]
pub struct XorConfig {
    /// Network options.
    ///
    /// Parameters:
    ///   hidden=int        - The number of hidden units.
    ///   activation=string - The hidden layer's activation function. (tanh, sigmoid, or relu)
    #[arg(short, long, default_value = "hidden=8,activation=tanh", verbatim_doc_comment)]
    pub net: Net,

    #[command(flatten)]
    pub training: TrainingArgs,
}

#[derive(ArgsTrait, Clone, Debug)]
pub struct FitConfig {
    /// The line to sample.
    ///
    /// Parameters:
    ///   slope=decimal     - The slope of the line.
    ///   intercept=decimal - The value of the line at zero.
    ///   noise=decimal     - The standard deviation of the noise added to each sample.
    #[arg(short, long, default_value = "slope=3,intercept=2,noise=0.1", verbatim_doc_comment)]
    pub line: Line,

    /// The number of samples to draw, with inputs uniform in [-1, 1).
    #[arg(long, default_value_t = 100, verbatim_doc_comment)]
    pub samples: usize,

    #[command(flatten)]
    pub training: TrainingArgs,
}

#[derive(Clone, Copy, Debug)]
pub enum OptimizerOptions {
    Sgd { rate: f64 },
    Adam { rate: f64 },
}

impl OptimizerOptions {
    pub fn build(self) -> Box<dyn Optimizer> {
        match self {
            Self::Sgd { rate } => Box::new(SimpleGradientDescent::new(rate)),
            Self::Adam { rate } => Box::new(Adam::new(rate)),
        }
    }
}

impl FromStr for OptimizerOptions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = parse_map(s)?;

        let rate = fields
            .get("rate")
            .map(|&f| {
                f.parse::<f64>()
                    .map_err(|_| format!("invalid value for rate: {f}"))
            })
            .transpose()?;
        if matches!(rate, Some(rate) if rate <= 0.0 || !rate.is_finite()) {
            return Err("rate must be a positive number".to_owned());
        }

        match fields.get("type").copied().unwrap_or("adam") {
            "sgd" => Ok(Self::Sgd {
                rate: rate.unwrap_or(0.01),
            }),
            "adam" => Ok(Self::Adam {
                rate: rate.unwrap_or(0.001),
            }),
            unknown => Err(format!("unknown optimizer type: {unknown}")),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Net {
    pub hidden: usize,
    pub activation: ActivationFunction,
}

impl FromStr for Net {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = parse_map(s)?;

        let hidden = fields
            .get("hidden")
            .map(|&f| {
                f.parse::<usize>()
                    .map_err(|_| format!("invalid value for hidden: {f}"))
            })
            .transpose()?
            .unwrap_or(8);
        if hidden == 0 {
            return Err("hidden must be at least 1".to_owned());
        }

        let activation = fields
            .get("activation")
            .map(|&f| f.parse::<ActivationFunction>())
            .transpose()?
            .unwrap_or(ActivationFunction::Tanh);

        Ok(Self { hidden, activation })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
    pub noise: f64,
}

impl FromStr for Line {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = parse_map(s)?;

        let decimal = |key: &str, default: f64| {
            fields
                .get(key)
                .map(|&f| {
                    f.parse::<f64>()
                        .map_err(|_| format!("invalid value for {key}: {f}"))
                })
                .transpose()
                .map(|value| value.unwrap_or(default))
        };

        let slope = decimal("slope", 3.0)?;
        let intercept = decimal("intercept", 2.0)?;
        let noise = decimal("noise", 0.1)?;
        if noise < 0.0 {
            return Err("noise must not be negative".to_owned());
        }

        Ok(Self {
            slope,
            intercept,
            noise,
        })
    }
}

fn parse_map(string: &str) -> Result<HashMap<&str, &str>, String> {
    string
        .split(',')
        .map(|field| field.trim())
        .map(|field| field.split('=').map(|part| part.trim()))
        .map(|mut field_part| {
            let key = field_part
                .next()
                .ok_or_else(|| "no key for field".to_owned())?;
            let value = field_part
                .next()
                .ok_or_else(|| format!("no value for key: {key}"))?;
            Ok((key, value))
        })
        .collect()
}
