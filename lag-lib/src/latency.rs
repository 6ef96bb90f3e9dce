//! Decide what to do with a requested (injected) response delay.

use std::time::Duration;

use rama::telemetry::tracing;
use serde::Deserialize;

/// What to do when the requested delay exceeds the configured maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LagPolicy {
    /// Respond with `400 Bad Request`.
    #[default]
    Reject,
    /// Sleep for the maximum instead and serve the request as usual.
    Clamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    PassThrough,
    Sleep(Duration),
    Reject(String),
}

/// Evaluate the requested delay against the cap.
///
/// An absent or empty request passes through untouched.
pub fn evaluate(requested: Option<&str>, cap: Duration, policy: LagPolicy) -> Decision {
    let Some(requested) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Decision::PassThrough;
    };

    let delay = match humantime::parse_duration(requested) {
        Ok(delay) => delay,
        Err(err) => {
            tracing::debug!("invalid lag value {requested:?}: {err}");
            return Decision::Reject("invalid time parameter".to_owned());
        }
    };

    if delay <= cap {
        return Decision::Sleep(delay);
    }

    match policy {
        LagPolicy::Reject => Decision::Reject(format!(
            "lag time cannot exceed {}",
            humantime::format_duration(cap)
        )),
        LagPolicy::Clamp => {
            tracing::debug!(
                "requested lag {} clamped to {}",
                humantime::format_duration(delay),
                humantime::format_duration(cap),
            );
            Decision::Sleep(cap)
        }
    }
}
