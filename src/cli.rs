use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Sync Fitbit sleep data and build the sleep chart
#[derive(Debug, Parser)]
#[command(name = "sleep")]
#[command(version)]
#[command(about = "Sync Fitbit sleep data and build the sleep chart", long_about = None)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Authenticate with Fitbit (OAuth2 flow)
  Auth,

  /// Dump recent sleep data as JSON to stdout
  Dump {
    /// Days to look back, including today
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..))]
    days: u32,
  },

  /// Fetch sleep, activity and spreadsheet data into the data directory
  Sync {
    /// Days to look back, including today
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    days: u32,
  },

  /// Merge the synced data into docs/data.json
  Build,

  /// List runs from the synced activities
  Runs,

  /// Fetch subjective ratings from the spreadsheet
  Sheet,

  /// Add a synthetic sleep record for a night the tracker missed
  Fixup {
    /// Night of sleep (YYYY-MM-DD), i.e. the date you woke up
    date: NaiveDate,

    /// Bedtime, HH:MM
    start: String,

    /// Wake time, HH:MM
    end: String,

    /// Free-text note stored with the record
    #[arg(long)]
    comment: Option<String>,
  },

  /// Serve the docs directory locally
  Serve {
    #[arg(long, default_value_t = 8000)]
    port: u16,
  },
}
