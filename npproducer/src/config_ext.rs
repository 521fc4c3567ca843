//! Extension integrating the producer into npconfig.
//!
//! Provides the `ProducerConfigExt` trait adding producer settings to
//! `npconfig::Config`: the periodic push interval and the application
//! label stamped on snapshots that carry no app name of their own.
//!
//! # Example
//!
//! ```rust,ignore
//! use npconfig::get_config;
//! use npproducer::ProducerConfigExt;
//!
//! let config = get_config();
//! let interval = config.get_push_interval();
//! ```

use anyhow::Result;
use npconfig::Config;
use serde_yaml::Value;
use std::time::Duration;

const DEFAULT_INTERVAL_MS: u64 = 1000;
const DEFAULT_APP_LABEL: &str = "NPBridge";

/// Extension trait for the producer's configuration keys.
pub trait ProducerConfigExt {
    /// Cadence of periodic pushes while the observed context is
    /// visible.
    fn get_push_interval(&self) -> Duration;

    fn set_push_interval(&self, interval: Duration) -> Result<()>;

    /// Application label reported by this producer.
    fn get_app_label(&self) -> String;

    fn set_app_label(&self, app: String) -> Result<()>;
}

impl ProducerConfigExt for Config {
    fn get_push_interval(&self) -> Duration {
        let ms = match self.get_value(&["bridge", "producer", "interval_ms"]) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(DEFAULT_INTERVAL_MS),
            _ => DEFAULT_INTERVAL_MS,
        };
        // A zero interval would spin the push loop.
        Duration::from_millis(ms.max(1))
    }

    fn set_push_interval(&self, interval: Duration) -> Result<()> {
        self.set_value(
            &["bridge", "producer", "interval_ms"],
            Value::Number((interval.as_millis() as u64).into()),
        )
    }

    fn get_app_label(&self) -> String {
        match self.get_value(&["bridge", "producer", "app"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_APP_LABEL.to_string(),
        }
    }

    fn set_app_label(&self, app: String) -> Result<()> {
        self.set_value(&["bridge", "producer", "app"], Value::String(app))
    }
}
