//! live-css - live style sheet editing server
//!
//! Entry point for the live-css server.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use live_css::bus::{EventBus, DEFAULT_CAPACITY};
use live_css::config::{load_from_dir, resolve_root, write_example, RootArg};
use live_css::registry::SessionRegistry;
use live_css::server::{init_tracing, BroadcastServer, ServerConfig, TracingConfig};
use live_css::watcher::{EngineConfig, WatchEngine};
use live_css::{Config, Error, Result};

/// live-css - push style sheet changes to the browser as you save them
#[derive(Parser, Debug)]
#[command(name = "live-css")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder containing files to monitor
    #[arg(short, long, env = "LIVE_CSS_ROOT")]
    root: Option<PathBuf>,

    /// Port number to run the live-css server on
    #[arg(short, long, env = "LIVE_CSS_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Host address to bind to
    #[arg(long, env = "LIVE_CSS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Allow symbolic links
    #[arg(long)]
    allow_symlinks: bool,

    /// List the files being monitored
    #[arg(long)]
    list_files: bool,

    /// Generate the configuration file
    #[arg(long)]
    init: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Extra logging to help in debugging live-css
    #[arg(short, long)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LIVE_CSS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "LIVE_CSS_LOG_JSON")]
    log_json: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            root: self.root.map(RootArg::Path),
            port: self.port,
            host: self.host,
            allow_symlinks: self.allow_symlinks,
            list_files: self.list_files,
            verbose: self.verbose,
            debug: self.debug,
            log_level: self.log_level,
            log_json: self.log_json,
            ..Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config =
        TracingConfig::from_flags(&cli.log_level, cli.verbose, cli.debug, cli.log_json);
    if let Err(e) = init_tracing(&tracing_config) {
        eprintln!("{e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;

    if cli.init {
        let path = write_example(&cwd)?;
        tracing::info!(
            path = %path.display(),
            "Configuration file has been written. Running live-css from this folder will now load options from it"
        );
        return Ok(());
    }

    tracing::info!(
        "live-css v{} starting. Run live-css --help to see the available options",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = cli.into_config();
    if let Some((path, file)) = load_from_dir(&cwd)? {
        tracing::info!(path = %path.display(), "Loaded configuration");
        config.merge_file(file);
    } else {
        tracing::info!(
            "Run live-css --init to generate the configuration file (recommended)"
        );
    }
    config.validate()?;

    if config.debug {
        tracing::debug!(?config, "Configuration loaded");
        tracing::debug!(rules = ?config.watch_rules, "Watch rules");
    }

    let root = resolve_root(config.root.as_ref(), config.allow_symlinks)?;

    let (bus, registry_feed) = EventBus::with_registry_feed(DEFAULT_CAPACITY);
    let registry = SessionRegistry::new(root.clone(), config.verbose);
    let registry_task = tokio::spawn(registry.run(registry_feed));

    let engine = WatchEngine::new(EngineConfig::from_config(&config, root), bus.clone())?;
    let server = BroadcastServer::bind(&ServerConfig::from_config(&config), bus).await?;

    tracing::info!(
        "Live CSS server is available at http://localhost:{}/",
        server.local_addr().port()
    );
    if !config.list_files {
        tracing::info!("To list the files being watched, run live-css with --list-files");
    }
    tracing::info!("Press CTRL-C to stop the server");

    let outcome = tokio::select! {
        result = engine.run() => result,
        result = server.run() => result,
    };

    registry_task.abort();
    outcome
}

fn report_fatal(err: &Error) {
    tracing::error!("Error: {err}");
    if let Some(hint) = err.remediation() {
        tracing::info!("{hint}");
    }
    tracing::error!("Exiting live-css server");
}
