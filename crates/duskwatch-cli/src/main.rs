//! Thin runnable entry point: wires the analysis pipeline, real-time
//! tailer, and sync codec together behind a handful of subcommands for
//! manual and integration exercise. Not a product CLI surface.

mod bootstrap;
mod commands;
mod ingest;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "duskwatch", version, about = "Air-gapped log forensic platform (core pipeline exerciser)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a log file and run an analysis session over it.
    Analyze {
        /// Plain-text log file to ingest before analyzing.
        logs: PathBuf,
        /// Directory holding the node identity file and the Model Store.
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
        /// `isolation_forest` | `one_class_svm` | `statistical`; omit for ensemble mode.
        #[arg(long)]
        algorithm: Option<String>,
        /// Overrides `AI_ANOMALY_THRESHOLD` for this run.
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long, default_value_t = 0.01)]
        contamination: f64,
        /// Blend in keyword scores in single-algorithm mode.
        #[arg(long)]
        raw_logs_flag: bool,
        #[arg(long)]
        force_retrain: bool,
        /// Flattened JSON array of `{technique_id, tactic, name}` entries.
        #[arg(long)]
        taxonomy: Option<PathBuf>,
    },
    /// Watch a set of files for appended lines and print scored events.
    Tail {
        /// Files to watch; each is seeked to EOF before watching starts.
        files: Vec<PathBuf>,
    },
    /// Ingest, analyze, and export the top anomalies as a signed `.qsp` package.
    Export {
        logs: PathBuf,
        /// Output package path, conventionally ending in `.qsp`.
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
        #[arg(long, default_value = "local-node")]
        hostname: String,
        /// PEM-encoded RSA private key to sign the package with.
        #[arg(long)]
        sign_key: Option<PathBuf>,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        algorithm: Option<String>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long, default_value_t = 0.01)]
        contamination: f64,
    },
    /// Import one or more `.qsp` packages into an ephemeral hub store and
    /// print cross-node technique correlations.
    Import {
        packages: Vec<PathBuf>,
        /// PEM-encoded RSA public key; required to accept a signed package.
        #[arg(long)]
        verify_key: Option<PathBuf>,
        #[arg(long)]
        target_node: Option<String>,
    },
    /// Print (creating on first run) this host's node identity.
    Identity {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Analyze { logs, data_dir, algorithm, threshold, contamination, raw_logs_flag, force_retrain, taxonomy } => {
            commands::handle_analyze(commands::AnalyzeArgs {
                logs,
                data_dir,
                algorithm,
                threshold,
                contamination,
                raw_logs_flag,
                force_retrain,
                taxonomy,
            })
            .await
        }
        Commands::Tail { files } => commands::handle_tail(files).await,
        Commands::Export { logs, out, data_dir, hostname, sign_key, top_k, algorithm, threshold, contamination } => {
            commands::handle_export(commands::ExportArgs {
                logs,
                out,
                data_dir,
                hostname,
                sign_key,
                top_k,
                algorithm,
                threshold,
                contamination,
            })
            .await
        }
        Commands::Import { packages, verify_key, target_node } => {
            commands::handle_import(commands::ImportArgs { packages, verify_key, target_node }).await
        }
        Commands::Identity { data_dir } => {
            bootstrap::load_node_id(&data_dir).map(|id| println!("{id}"))
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
