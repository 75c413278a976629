//! Attest oracle CLI.
//!
//! `serve` answers request records from stdin until end-of-input; `commit`
//! folds a pending augmentation log into a compact case file; `merge`
//! unions interface-extension case files into a main file.

use attest_oracle::error::OracleError;
use attest_oracle::store::{commit_updates, merge_test_extensions, CaseSet};
use attest_oracle::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "attest-oracle")]
#[command(author, version, about = "Test-case oracle for recorded HTTP exchanges")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve request records from stdin, one JSON record per line
    Serve {
        /// Oracle configuration file
        #[arg(short, long, env = "ATTEST_CONFIG")]
        config: PathBuf,
    },
    /// Fold a pending augmentation log into a compact case file
    Commit {
        /// Pending update log
        #[arg(long)]
        update: PathBuf,
        /// Compact case file to fold into
        #[arg(long)]
        compact: PathBuf,
        /// Configuration supplying the request key fields (fingerprints
        /// depend on them)
        #[arg(short, long, env = "ATTEST_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Union extension case files into a main case file
    Merge {
        /// Main case file
        #[arg(long)]
        main: PathBuf,
        /// Extension case files, merged in order
        #[arg(long = "extension", required = true)]
        extensions: Vec<PathBuf>,
        /// Output file; defaults to rewriting the main file
        #[arg(long)]
        out: Option<PathBuf>,
        /// Configuration supplying the request key fields
        #[arg(short, long, env = "ATTEST_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn key_spec_from(config: Option<PathBuf>) -> Result<attest_oracle::key::KeySpec, OracleError> {
    match config {
        Some(path) => Ok(Config::from_file(path)?.key_spec()),
        None => Ok(attest_oracle::key::KeySpec::default()),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve { config } => {
            let config = Config::from_file(config)?;
            let set = CaseSet::load(&config)?;
            info!(cases = set.len(), "serving request records from stdin");
            attest_oracle::service::run(&set, &config, tokio::io::stdin(), tokio::io::stdout())
                .await
                .map_err(|e| anyhow::anyhow!("request stream failed: {e}"))
        }
        Command::Commit {
            update,
            compact,
            config,
        } => {
            let spec = key_spec_from(config)?;
            let outcome = commit_updates(&update, &compact, &spec)?;
            println!(
                "committed {} augmentation entries onto {} case(s) in {}",
                outcome.entries_applied,
                outcome.cases_updated,
                compact.display()
            );
            Ok(())
        }
        Command::Merge {
            main,
            extensions,
            out,
            config,
        } => {
            let spec = key_spec_from(config)?;
            let out = out.unwrap_or_else(|| main.clone());
            let outcome = merge_test_extensions(&main, &extensions, &out, &spec)?;
            println!(
                "merged {} case(s) ({} main + {} extension) into {}",
                outcome.total,
                outcome.from_main,
                outcome.from_extensions,
                out.display()
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "fatal");
            let code = err
                .downcast_ref::<OracleError>()
                .map(OracleError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
