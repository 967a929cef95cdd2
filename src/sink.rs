// Logging Sink
// Options whose callbacks report every query as a tracing event

use crate::db::traits::Value;
use crate::proxy::Options;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`Options::logging`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSinkConfig {
    /// Include rendered arguments in each event
    pub include_args: bool,
    /// Successful queries at or above this duration are logged at `warn`
    #[serde(with = "optional_millis")]
    pub slow_threshold: Option<Duration>,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            include_args: true,
            slow_threshold: None,
        }
    }
}

impl LogSinkConfig {
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    pub fn with_args(mut self, include: bool) -> Self {
        self.include_args = include;
        self
    }

    fn is_slow(&self, duration: Duration) -> bool {
        self.slow_threshold.is_some_and(|t| duration >= t)
    }
}

fn render_args(config: &LogSinkConfig, args: &[Value]) -> String {
    if !config.include_args {
        return format!("<{} args>", args.len());
    }
    serde_json::to_string(args).unwrap_or_else(|_| format!("{args:?}"))
}

impl Options {
    /// Options that log each successful query at `info` (`warn` when slow)
    /// and each failed query at `error`.
    pub fn logging(config: LogSinkConfig) -> Options {
        let error_config = config.clone();
        Options::builder()
            .on_success(move |query, args, duration| {
                let args = render_args(&config, args);
                let took_ms = duration.as_secs_f64() * 1000.0;
                if config.is_slow(duration) {
                    tracing::warn!(query, args = %args, took_ms, "slow query");
                } else {
                    tracing::info!(query, args = %args, took_ms, "query success");
                }
            })
            .on_error(move |query, args, duration, err| {
                let args = render_args(&error_config, args);
                let took_ms = duration.as_secs_f64() * 1000.0;
                tracing::error!(query, args = %args, took_ms, error = %err, "query failed");
            })
            .build()
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
