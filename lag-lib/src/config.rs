//! Server configuration, resolved once at startup.
//!
//! Settings are layered, per property: flag > environment > config file > default.
//! Flags and environment are handled by clap, the config file by [`load_config_file`].

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use rama::telemetry::tracing;
use serde::Deserialize;

use crate::{
    latency::LagPolicy,
    size::{ParseSizeError, parse_size},
};

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_LAG: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_DATA_SIZE: &str = "500MB";
pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(15);

/// Added on top of the max lag for the default transport timeout.
pub const TRANSPORT_TIMEOUT_SLACK: Duration = Duration::from_secs(30);

/// Locations tried when no config file is given explicitly.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["config.toml", "/etc/lag/config.toml"];

/// Unresolved server settings, as given by the user.
#[derive(Debug, Clone, Default, Deserialize, clap::Args)]
#[serde(default)]
pub struct ServerSettings {
    /// ip address to listen on [default: 0.0.0.0]
    #[arg(long, value_name = "IP", env = "LAG_SERVER__HOST")]
    pub host: Option<IpAddr>,

    /// port to listen on [default: 8080]
    #[arg(long, value_name = "PORT", env = "LAG_SERVER__PORT")]
    pub port: Option<u16>,

    /// max lag a client can request, e.g. 30s or 1m [default: 30s]
    #[arg(long, value_name = "DURATION", env = "LAG_SERVER__MAX_LAG")]
    pub max_lag: Option<String>,

    /// what to do with requested lag above the max [default: reject]
    #[arg(long, value_enum, env = "LAG_SERVER__LAG_POLICY")]
    pub lag_policy: Option<LagPolicy>,

    /// max data size a client can request, e.g. 500MB [default: 500MB]
    #[arg(long, value_name = "SIZE", env = "LAG_SERVER__MAX_DATA_SIZE")]
    pub max_data_size: Option<String>,

    /// max time to serve a single request, has to exceed the max lag [default: max lag + 30s]
    #[arg(long, value_name = "DURATION", env = "LAG_SERVER__TRANSPORT_TIMEOUT")]
    pub transport_timeout: Option<String>,

    /// the graceful shutdown timeout, 0s for no timeout [default: 15s]
    #[arg(long, value_name = "DURATION", env = "LAG_SERVER__GRACEFUL")]
    pub graceful: Option<String>,
}

impl ServerSettings {
    /// Layer these settings on top of `base`, defined properties win.
    pub fn merge_over(self, base: ServerSettings) -> ServerSettings {
        let overwrite = self;

        macro_rules! merge_settings {
            ($overwrite:ident, $base:ident, {$($property:ident),+ $(,)?}) => {
                ServerSettings {
                    $(
                        $property: if let Some(value) = $overwrite.$property {
                            tracing::info!("property '{}': use flag or env: {value:?}", stringify!($property));
                            Some(value)
                        } else if let Some(value) = $base.$property {
                            tracing::info!("property '{}': use config file: {value:?}", stringify!($property));
                            Some(value)
                        } else {
                            tracing::debug!("property '{}': use default", stringify!($property));
                            None
                        },
                    )+
                }
            };
        }

        merge_settings!(
            overwrite, base,
            {
                host,
                port,
                max_lag,
                lag_policy,
                max_data_size,
                transport_timeout,
                graceful,
            }
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerSettings,
}

/// Load the server settings from a toml config file.
///
/// An explicit path has to exist, otherwise the default locations
/// are tried and `None` is returned when none of them exist.
pub fn load_config_file(path: Option<&Path>) -> Result<Option<ServerSettings>, ConfigError> {
    let path = match path {
        Some(path) => path.to_owned(),
        None => match DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
        {
            Some(path) => path,
            None => {
                tracing::info!("no config files found");
                return Ok(None);
            }
        },
    };

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
        path: path.clone(),
        source,
    })?;
    let file: ConfigFile =
        toml::from_str(&content).map_err(|source| ConfigError::ParseFile {
            path: path.clone(),
            source,
        })?;

    tracing::info!(path = ?path, "config file loaded");
    Ok(Some(file.server))
}

/// The resolved and validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub max_lag: Duration,
    pub lag_policy: LagPolicy,
    pub max_response_size: u64,
    /// Bound on serving a single request, always larger than `max_lag`.
    pub transport_timeout: Duration,
    /// `None` waits for in-flight requests without limit on shutdown.
    pub graceful_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Resolve the settings, using defaults for whatever is undefined.
    pub fn try_from_settings(settings: ServerSettings) -> Result<Self, ConfigError> {
        let address = SocketAddr::new(
            settings.host.unwrap_or(DEFAULT_HOST),
            settings.port.unwrap_or(DEFAULT_PORT),
        );

        let max_lag = parse_duration_property("max_lag", settings.max_lag)?.unwrap_or(DEFAULT_MAX_LAG);

        let max_data_size = settings
            .max_data_size
            .unwrap_or_else(|| DEFAULT_MAX_DATA_SIZE.to_owned());
        let max_response_size =
            parse_size(&max_data_size).map_err(|source| ConfigError::InvalidSize {
                property: "max_data_size",
                value: max_data_size.clone(),
                source,
            })?;

        let transport_timeout = match parse_duration_property(
            "transport_timeout",
            settings.transport_timeout,
        )? {
            Some(timeout) => timeout,
            None => max_lag
                .checked_add(TRANSPORT_TIMEOUT_SLACK)
                .ok_or(ConfigError::DurationOutOfRange {
                    property: "max_lag",
                    max_lag,
                })?,
        };
        if transport_timeout <= max_lag {
            return Err(ConfigError::TransportTimeoutTooLow {
                transport_timeout,
                max_lag,
            });
        }

        let graceful_timeout = parse_duration_property("graceful", settings.graceful)?
            .unwrap_or(DEFAULT_GRACEFUL_TIMEOUT);

        Ok(Self {
            address,
            max_lag,
            lag_policy: settings.lag_policy.unwrap_or_default(),
            max_response_size,
            transport_timeout,
            graceful_timeout: (!graceful_timeout.is_zero()).then_some(graceful_timeout),
        })
    }
}

fn parse_duration_property(
    property: &'static str,
    value: Option<String>,
) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|value| {
            humantime::parse_duration(value.trim()).map_err(|source| {
                ConfigError::InvalidDuration {
                    property,
                    value,
                    source,
                }
            })
        })
        .transpose()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSize {
        property: &'static str,
        value: String,
        source: ParseSizeError,
    },
    InvalidDuration {
        property: &'static str,
        value: String,
        source: humantime::DurationError,
    },
    TransportTimeoutTooLow {
        transport_timeout: Duration,
        max_lag: Duration,
    },
    /// No default transport timeout fits on top of this max lag.
    DurationOutOfRange {
        property: &'static str,
        max_lag: Duration,
    },
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSize {
                property, value, ..
            } => write!(f, "invalid size for '{property}': {value:?}"),
            ConfigError::InvalidDuration {
                property, value, ..
            } => write!(f, "invalid duration for '{property}': {value:?}"),
            ConfigError::TransportTimeoutTooLow {
                transport_timeout,
                max_lag,
            } => write!(
                f,
                "transport timeout ({}) has to be larger than the max lag ({})",
                humantime::format_duration(*transport_timeout),
                humantime::format_duration(*max_lag),
            ),
            ConfigError::DurationOutOfRange { property, max_lag } => write!(
                f,
                "'{property}' of {} leaves no room for a transport timeout",
                humantime::format_duration(*max_lag),
            ),
            ConfigError::ReadFile { path, .. } => {
                write!(f, "read config file '{}'", path.display())
            }
            ConfigError::ParseFile { path, .. } => {
                write!(f, "parse config file '{}'", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidSize { source, .. } => Some(source),
            ConfigError::InvalidDuration { source, .. } => Some(source),
            ConfigError::TransportTimeoutTooLow { .. } => None,
            ConfigError::DurationOutOfRange { .. } => None,
            ConfigError::ReadFile { source, .. } => Some(source),
            ConfigError::ParseFile { source, .. } => Some(source),
        }
    }
}
