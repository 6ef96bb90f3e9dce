#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rama::{error::BoxError, graceful, telemetry::tracing};

use lag_lib::{
    config::{self, ServerConfig, ServerSettings},
    server::{self, ShutdownOutcome},
    utils,
};

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// A server that lags: delays, errors and payloads on demand.
#[derive(Debug, Clone, Parser)]
#[command(name = "lag")]
#[command(bin_name = "lag")]
#[command(version, about, long_about = None)]
struct Args {
    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o', global = true)]
    output: Option<PathBuf>,

    /// toml config file, by default ./config.toml or /etc/lag/config.toml are tried
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// run the lag http server
    #[command(visible_aliases = ["server", "s"])]
    Serve(ServerSettings),
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    })?;

    if let Err(err) = run_with_args(graceful::default_signal(), args).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_with_args<F>(shutdown_signal: F, args: Args) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    match args.cmd {
        Command::Serve(settings) => {
            let config = resolve_config(settings, args.config.as_deref())?;
            tracing::info!(
                address = %config.address,
                max_lag = ?config.max_lag,
                lag_policy = ?config.lag_policy,
                max_response_size = config.max_response_size,
                transport_timeout = ?config.transport_timeout,
                graceful_timeout = ?config.graceful_timeout,
                "server config resolved",
            );

            match server::serve_until_shutdown(config, shutdown_signal, None).await? {
                ShutdownOutcome::Graceful(elapsed) => {
                    tracing::info!("lag server stopped after draining for {elapsed:?}")
                }
                ShutdownOutcome::Forced(limit) => {
                    tracing::warn!("lag server stopped forcefully after {limit:?}")
                }
            }
        }
    }

    Ok(())
}

/// Layer the flag and env settings over the config file settings.
fn resolve_config(
    settings: ServerSettings,
    config_file: Option<&std::path::Path>,
) -> Result<ServerConfig, BoxError> {
    let base = config::load_config_file(config_file)?.unwrap_or_default();
    Ok(ServerConfig::try_from_settings(settings.merge_over(base))?)
}
