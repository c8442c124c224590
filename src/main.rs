//! Manual entry point for the dataset functions.
//!
//! Each subcommand invokes one function the way the workflow would, with an
//! event read from `--event` or the built-in sample event, and prints either
//! the store acknowledgement or the stage that failed.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use asteroid_app::error::HandlerError;
use asteroid_app::event::{Event, MassesDataset, RemoteDataset};
use asteroid_app::fetch::BasicClient;
use asteroid_app::handlers::{download_benner, download_exoplanets, parse_masses, run_all};
use asteroid_app::masses::MassPolicy;
use asteroid_app::store::{LocalDirStore, ObjectStore, S3Store};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "asteroid_app")]
#[command(about = "Fetches asteroid and exoplanet datasets and stores them in S3", long_about = None)]
struct Cli {
    /// JSON event to invoke with (defaults to the sample event)
    #[arg(short, long, global = true, value_name = "FILE")]
    event: Option<PathBuf>,

    /// Overrides the event's bucketName
    #[arg(short, long, global = true)]
    bucket: Option<String>,

    /// Write objects under this directory instead of uploading to S3
    #[arg(long, global = true, value_name = "DIR")]
    local_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the Benner delta-v report and store it as CSV
    Benner {
        /// Report URL, or a local file path
        #[arg(long)]
        url: Option<String>,

        /// Object key to store the CSV under
        #[arg(long)]
        filename: Option<String>,
    },
    /// Download the exoplanet catalog and store it unmodified
    Exoplanets {
        /// Catalog URL, or a local file path
        #[arg(long)]
        url: Option<String>,

        /// Object key to store the catalog under
        #[arg(long)]
        filename: Option<String>,
    },
    /// Aggregate the local mass table and store it as JSON
    Masses {
        /// Mass table to read
        #[arg(long)]
        path: Option<PathBuf>,

        /// Object key to store the JSON under
        #[arg(long)]
        filename: Option<String>,

        /// Average every observation of a body instead of keeping the first
        #[arg(long, default_value_t = false)]
        mean: bool,
    },
    /// Run every function whose dataset is in the event
    All,
}

fn init_tracing() -> Result<WorkerGuard> {
    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/asteroid_app.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("asteroid_app.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}

/// Applies command-line overrides to one remote dataset of the event.
fn override_remote(
    slot: &mut Option<RemoteDataset>,
    url: Option<String>,
    filename: Option<String>,
    default_filename: &str,
) {
    match (slot.as_mut(), url) {
        (Some(remote), url) => {
            if let Some(url) = url {
                remote.url = url;
            }
            if let Some(filename) = filename {
                remote.filename = filename;
            }
        }
        (None, Some(url)) => {
            *slot = Some(RemoteDataset {
                url,
                filename: filename.unwrap_or_else(|| default_filename.to_string()),
            });
        }
        (None, None) => {}
    }
}

fn override_masses(
    slot: &mut Option<MassesDataset>,
    path: Option<PathBuf>,
    filename: Option<String>,
    mean: bool,
) {
    let masses = slot.get_or_insert_with(|| MassesDataset {
        filename: "massd.json".to_string(),
        path: PathBuf::from(asteroid_app::event::DEFAULT_MASSES_PATH),
        policy: MassPolicy::default(),
    });
    if let Some(path) = path {
        masses.path = path;
    }
    if let Some(filename) = filename {
        masses.filename = filename;
    }
    if mean {
        masses.policy = MassPolicy::Mean;
    }
}

/// Prints the acknowledgement, or the failed stage, the way the workflow would see it.
fn report<T: Serialize>(result: Result<T, HandlerError>) -> Result<ExitCode> {
    match result {
        Ok(ack) => {
            println!("result: {}", serde_json::to_string_pretty(&ack)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(stage = %e.stage(), error = ?e, "Invocation failed");
            println!("{}", e.stage().message());
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok(); // Load .env file

    let _log_guard = init_tracing()?;

    let cli = Cli::parse();

    let mut event = match &cli.event {
        Some(path) => Event::load(path)?,
        None => Event::sample(),
    };
    if let Some(bucket) = cli.bucket {
        event.bucket_name = bucket;
    }

    let store: Box<dyn ObjectStore> = match cli.local_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Writing objects to a local directory");
            Box::new(LocalDirStore::new(dir))
        }
        None => Box::new(S3Store::from_env().await),
    };
    let client = BasicClient::new();

    match cli.command {
        Commands::Benner { url, filename } => {
            override_remote(&mut event.benner, url, filename, "benner.csv");
            report(download_benner(&event, &client, store.as_ref()).await)
        }
        Commands::Exoplanets { url, filename } => {
            override_remote(&mut event.exoplanets, url, filename, "exoplanet.csv");
            report(download_exoplanets(&event, &client, store.as_ref()).await)
        }
        Commands::Masses {
            path,
            filename,
            mean,
        } => {
            override_masses(&mut event.masses, path, filename, mean);
            report(parse_masses(&event, store.as_ref()).await)
        }
        Commands::All => report(run_all(&event, &client, store.as_ref()).await),
    }
}
