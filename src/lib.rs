pub mod activity;
pub mod commands;
pub mod config;
pub mod error;
pub mod fitbit;
pub mod fixup;
pub mod models;
pub mod normalize;
pub mod sheets;
pub mod store;
pub mod subjective;

mod cli;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use std::process::ExitCode;

use cli::{Cli, Commands};
use config::Paths;
use error::AppResult;

pub fn run() -> ExitCode {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let cli = Cli::parse();
  let paths = Paths::from_env();
  paths.log_config();

  let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
    Ok(runtime) => runtime,
    Err(e) => {
      eprintln!("Failed to start async runtime: {}", e);
      return ExitCode::FAILURE;
    }
  };

  match runtime.block_on(dispatch(cli.command, &paths)) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("{}", e);
      ExitCode::FAILURE
    }
  }
}

async fn dispatch(command: Commands, paths: &Paths) -> AppResult<()> {
  match command {
    Commands::Auth => commands::fitbit::auth(paths).await,
    Commands::Dump { days } => commands::fitbit::dump(paths, days).await,
    Commands::Sync { days } => {
      let summary = commands::fitbit::sync(paths, days).await?;
      log::debug!("Sync finished: {:?}", summary);
      Ok(())
    }
    Commands::Build => commands::chart::build(paths).map(|_| ()),
    Commands::Runs => commands::chart::runs(paths).map(|_| ()),
    Commands::Sheet => commands::sheet::sheet(paths).await.map(|_| ()),
    Commands::Fixup {
      date,
      start,
      end,
      comment,
    } => commands::fixup::fixup(paths, date, &start, &end, comment.as_deref()).map(|_| ()),
    Commands::Serve { port } => commands::serve::serve(paths, port).await,
  }
}
