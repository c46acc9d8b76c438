// Entrypoint for the upload agent.
// - Keeps `main` small: parse flags, set up logging, build the pipeline and
//   hand it to the poll loop, which never returns.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use upload_agent::config::{Args, Config};
use upload_agent::ledger::FileLedger;
use upload_agent::scanner::{Poller, TreeWalk};
use upload_agent::uploader::Uploader;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_file);

    let config = Config::from_args(args).context("Invalid configuration")?;
    let ledger = FileLedger::new(&config.ledger_file, config.match_mode);
    let uploader = Uploader::new(config.request.clone(), config.timeout, ledger)
        .context("Failed to build HTTP client")?;

    info!(
        upload_dir = %config.upload_dir.display(),
        server_url = %config.request.server_url,
        method = %config.request.method,
        ledger = %config.ledger_file.display(),
        "Watching for new files"
    );

    let mut poller = Poller::new(TreeWalk::new(&config.upload_dir), uploader, config.interval);
    poller.run()
}

/// Log to stdout and, when it can be opened, append to `log_file` as well.
fn init_tracing(log_file: &Path) {
    let file = OpenOptions::new().create(true).append(true).open(log_file);
    let (file_layer, file_error) = match file {
        Ok(file) => (
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false)),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(e) = file_error {
        info!("Failed to log to file {}, using stdout only: {}", log_file.display(), e);
    }
}
