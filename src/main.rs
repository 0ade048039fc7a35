use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod convert;
mod error;
mod model;
mod render;
mod stat;

use render::DivergencePolicy;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "perfstat-tab")]
#[command(about = "Turn perf stat interval logs into CSV tables", long_about = None)]
struct Cli {
    /// Log parsing progress (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one log into a CSV table.
    Convert {
        #[arg(long)]
        log: PathBuf,

        /// Defaults to `<log>.csv`.
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// What to do when a later interval shows a column the first one lacked.
        #[arg(long, value_enum, default_value_t)]
        on_divergence: DivergencePolicy,
    },

    /// Convert every log with the given extension in a directory.
    Batch {
        #[arg(long)]
        dir: PathBuf,

        #[arg(long, default_value = "prof")]
        ext: String,

        #[arg(long, value_enum, default_value_t)]
        on_divergence: DivergencePolicy,
    },

    /// Parse a log and print its run summary as JSON.
    Inspect {
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    match cli.cmd {
        Commands::Convert {
            log,
            out,
            on_divergence,
        } => {
            let out = out.unwrap_or_else(|| convert::default_output(&log));
            let summary = convert::convert_log_file(&log, &out, on_divergence)?;
            println!("Wrote {} ({} records)", out.display(), summary.records);
        }
        Commands::Batch {
            dir,
            ext,
            on_divergence,
        } => {
            for (table, summary) in convert::convert_dir(&dir, &ext, on_divergence)? {
                println!("Wrote {} ({} records)", table.display(), summary.records);
            }
        }
        Commands::Inspect { log } => {
            let summary = convert::inspect_log_file(&log)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
