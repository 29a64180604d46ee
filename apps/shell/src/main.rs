#![allow(clippy::print_stdout)]

mod args;
mod commands;

use crate::args::Cli;
use anyhow::Context;
use clap::Parser;
use fstone::kernel::config::load_platform_config;
use fstone_logger::Logger;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_platform_config(cli.config.as_deref()).context("Configuration is malformed")?;
    let _logger = Logger::from_settings(env!("CARGO_BIN_NAME"), &config.logging)?;

    let output = commands::run(cli, config).await?;
    if let Some(output) = output {
        println!("{output}");
    }
    Ok(())
}
