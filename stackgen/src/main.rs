use std::process;

use anyhow::Result;
use clap::Parser;
use stackgen::{Cli, Commands};
use tracing_log::AsTrace;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.verbose.log_level_filter().as_trace())
    .without_time()
    .with_ansi(!cli.no_color)
    // stdout carries the generated artifact; all diagnostics go to stderr
    .with_writer(std::io::stderr)
    .finish();
  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

  let result = match &cli.command {
    Commands::AmiMap(input) => input.print().await,
    Commands::DevStack(input) => input.dev_stack().await,
    Commands::Jenkins(input) => input.jenkins().await,
  };

  match result {
    Ok(_) => Ok(()),
    Err(err) => {
      eprintln!("{err:#}");
      process::exit(2);
    }
  }
}
