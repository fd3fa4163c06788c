//! Codex Session Watch - announces assistant turns from Codex session logs.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use codex_session_watch::announce::resolve_announcer;
use codex_session_watch::config::{ConfigLoader, WatchConfig};
use codex_session_watch::lock::InstanceLock;
use codex_session_watch::watcher::SessionWatcher;

#[derive(Parser)]
#[command(
    name = "codex-session-watch",
    about = "Announce Codex assistant turns as they are written",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to load instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail session logs and announce new assistant messages.
    Watch {
        /// Log announcements instead of launching the announcer.
        #[arg(long)]
        dry_run: bool,
        /// Maximum number of session files to tail (0 = unbounded).
        #[arg(long)]
        max_files: Option<usize>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn stderr_filter(verbosity: u8) -> EnvFilter {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_tracing(verbosity: u8, config: &WatchConfig) {
    let filter = stderr_filter(verbosity);

    let debug_file = if config.debug {
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
        {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!(
                    "warning: cannot open debug log {}: {e}",
                    config.log_file.display()
                );
                None
            }
        }
    } else {
        None
    };
    let file_layer = debug_file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(LevelFilter::DEBUG)
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(filter))
        .with(file_layer)
        .init();
}

/// Load configuration, reporting override warnings on stderr.
fn load_config(path: Option<PathBuf>, verbosity: u8) -> Result<WatchConfig, ExitCode> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(stderr_filter(verbosity))
        .finish();
    tracing::subscriber::with_default(subscriber, || loader.load_with_env()).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::FAILURE
    })
}

/// Cancel `token` on Ctrl-C or SIGTERM.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        tracing::info!("Shutdown signal received");
        token.cancel();
    });
}

async fn watch(config: WatchConfig) -> ExitCode {
    let announcer = match resolve_announcer(config.announcer.as_deref()) {
        Ok(path) => path,
        Err(e) if config.dry_run => {
            tracing::debug!(error = %e, "Announcer unavailable, continuing in dry-run mode");
            PathBuf::new()
        }
        Err(e) => {
            tracing::error!(error = %e, "Cannot start without an announcer");
            return ExitCode::FAILURE;
        }
    };

    let lock = match InstanceLock::acquire(&config.lock_file) {
        Ok(Some(lock)) => lock,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Failed to acquire instance lock");
            return ExitCode::FAILURE;
        }
    };

    let mut watcher = SessionWatcher::from_config(&config, announcer.clone());
    tracing::info!(
        pid = std::process::id(),
        start_epoch = watcher.start_epoch(),
        dry_run = config.dry_run,
        max_per_hour = config.max_per_hour,
        min_seconds_between = config.min_seconds_between,
        max_files = config.max_files,
        announcer = %announcer.display(),
        codex_home = %config.codex_home.display(),
        "Starting session watcher"
    );

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());
    watcher.run(shutdown).await;

    drop(lock);
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = match load_config(cli.config, cli.verbose) {
        Ok(config) => config,
        Err(code) => return code,
    };

    match cli.command.unwrap_or(Commands::Watch {
        dry_run: false,
        max_files: None,
    }) {
        Commands::Watch { dry_run, max_files } => {
            config.dry_run |= dry_run;
            if let Some(max_files) = max_files {
                config.max_files = max_files;
            }
            init_tracing(cli.verbose, &config);
            watch(config).await
        }
        Commands::Config => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                print!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
