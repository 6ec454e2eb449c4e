//! # Regression Maker Command Line
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Initialize logging (rolling files, console fallback)
//!   ├─> Load configuration (--config, REGRESSION_MAKER_CONFIG or default path)
//!   └─> Run the command
//! ```
//!
//! ```bash
//! regression-maker inspect houses.csv
//! regression-maker train houses.csv --target price -f size -f rooms --output houses.json
//! regression-maker predict houses.json -v size=80 -v rooms=3
//! regression-maker session
//! ```

#![warn(clippy::all, rust_2018_idioms)]

mod cli;

use anyhow::Result;
use clap::Parser as _;
use regression_maker::{config, logging};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    if let Err(e) = logging::init() {
        logging::init_console_only();
        tracing::warn!("File logging unavailable, logging to console only: {e:#}");
    }

    let config = match &cli.config {
        Some(path) => config::load_app_config_from(path),
        None => config::load_app_config(),
    };

    cli::run_command(cli.command, config)
}
