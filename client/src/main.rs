use std::env;

use clap::Parser;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format;

use self::args::{Args, Command};
use self::fit::run_fit;
use self::xor::run_xor;

mod args;
mod fit;
mod session;
mod xor;

fn main() {
    let args = Args::parse();

    set_default_logging();

    let event_format = format().with_target(false).without_time();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .event_format(event_format)
        .init();

    let success = match args.command {
        Command::Xor(config) => run_xor(config),
        Command::Fit(config) => run_fit(config),
    };

    if !success {
        std::process::exit(1);
    }
}

fn set_default_logging() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
}
