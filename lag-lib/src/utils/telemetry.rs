use std::{io::IsTerminal as _, path::Path};

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing::{
        self,
        metadata::LevelFilter,
        subscriber::{EnvFilter, fmt::writer::BoxMakeWriter},
    },
};

/// The http trace layer logs requests and responses at DEBUG.
const ACCESS_LOG_DIRECTIVE: &str = "rama_http::layer::trace=debug";

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig<'a> {
    /// Log at DEBUG instead of INFO by default.
    pub verbose: bool,
    /// Format for humans instead of the compact default.
    pub pretty: bool,
    /// Append to this file instead of writing to stderr.
    pub output: Option<&'a Path>,
}

/// Set up structured logging for the lag server.
///
/// Without `RUST_LOG` the access log is always on, next to the INFO
/// (or DEBUG when verbose) events of everything else.
/// `RUST_LOG` replaces these defaults entirely.
pub fn init_tracing(cfg: TelemetryConfig<'_>) -> Result<(), BoxError> {
    let filter = env_filter(
        cfg.verbose,
        std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
    );

    let make_writer = match cfg.output {
        Some(path) => BoxMakeWriter::new(
            std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("open log file '{}'", path.display()))?,
        ),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = tracing::subscriber::fmt()
        .with_ansi(cfg.output.is_none() && std::io::stderr().is_terminal())
        .with_env_filter(filter)
        .with_writer(make_writer);

    if cfg.pretty {
        subscriber.pretty().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    tracing::debug!(verbose = cfg.verbose, output = ?cfg.output, "tracing is set up");
    Ok(())
}

fn env_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let builder = EnvFilter::builder().with_default_directive(level.into());

    match directives.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => builder.parse_lossy(directives),
        None => builder.parse_lossy(ACCESS_LOG_DIRECTIVE),
    }
}
