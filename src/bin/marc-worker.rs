//! Parser worker: reads control messages on stdin, writes record messages to stdout.
//!
//! Usage: `marc-worker [config.toml]`. Logs go to stderr, filtered by `RUST_LOG`.

use std::{
    env,
    io::{self, BufReader},
    process,
};

use log::{error, info, LevelFilter};
use marc_stream::{
    worker::{serve, FileOpener},
    PipelineConfig, Result,
};

fn init_logger() {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.parse_default_env();
    builder.target(env_logger::Target::Stderr);
    builder.init();
}

fn run() -> Result<u64> {
    let config = match env::args().nth(1) {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    serve(
        BufReader::new(io::stdin()),
        io::stdout().lock(),
        &FileOpener,
        &config,
    )
}

fn main() {
    init_logger();
    match run() {
        Ok(jobs) => info!("worker exiting after {} jobs", jobs),
        Err(err) => {
            error!("worker failed: {}", err);
            process::exit(1);
        }
    }
}
