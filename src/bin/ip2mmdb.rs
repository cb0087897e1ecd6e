mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::cmd_convert;

#[derive(Parser)]
#[command(name = "ip2mmdb")]
#[command(
    about = "Convert IP2Location LITE CSV exports to MaxMind DB files",
    long_about = "ip2mmdb - Convert IP2Location LITE CSV exports into MaxMind DB (MMDB) files\n\n\
    Takes a headerless CSV of decimal-encoded IPv4 ranges in the DB1 (country)\n\
    or DB11 (city) schema and produces a binary database readable by any\n\
    MMDB-compatible library. The schema is detected from the column count.\n\n\
    Examples:\n\
      ip2mmdb convert IP2LOCATION-LITE-DB1.csv\n\
      ip2mmdb convert IP2LOCATION-LITE-DB11.csv --verbose"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV export to <INPUT>.MMDB
    Convert {
        /// Input CSV file (4-column country or 10-column city schema)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print build statistics
        #[arg(short, long)]
        verbose: bool,

        /// Suppress the progress display
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert {
            input,
            verbose,
            quiet,
        } => cmd_convert(input, verbose, quiet),
    }
}
