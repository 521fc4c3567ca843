//! Extension integrating the relay into npconfig.
//!
//! Provides the `RelayConfigExt` trait adding native-host settings to
//! `npconfig::Config`: which host identifier the relay forwards to, and
//! the registry mapping host identifiers to launchable commands
//! (mirroring a native messaging host manifest registry).
//!
//! # Example
//!
//! ```rust,ignore
//! use npconfig::get_config;
//! use nprelay::RelayConfigExt;
//!
//! let config = get_config();
//! let host_id = config.get_native_host_id()?;
//! let (command, args) = config.get_native_host_command(&host_id)?;
//! ```

use anyhow::{anyhow, Result};
use npconfig::Config;
use serde_yaml::Value;

const DEFAULT_HOST_ID: &str = "com.npbridge.nowplaying";

/// Extension trait for the relay's configuration keys.
pub trait RelayConfigExt {
    /// Identifier of the native host records are forwarded to.
    fn get_native_host_id(&self) -> Result<String>;

    fn set_native_host_id(&self, host_id: String) -> Result<()>;

    /// Launch command and arguments registered for a host identifier.
    ///
    /// Fails when the identifier has no registry entry: an unregistered
    /// host cannot be dialed at all, which is a configuration error
    /// rather than a transient connect failure.
    fn get_native_host_command(&self, host_id: &str) -> Result<(String, Vec<String>)>;

    /// Register (or replace) the launch command for a host identifier.
    fn set_native_host_command(
        &self,
        host_id: &str,
        command: String,
        args: Vec<String>,
    ) -> Result<()>;
}

impl RelayConfigExt for Config {
    fn get_native_host_id(&self) -> Result<String> {
        match self.get_value(&["bridge", "host", "id"]) {
            Ok(Value::String(s)) if !s.is_empty() => Ok(s),
            _ => Ok(DEFAULT_HOST_ID.to_string()),
        }
    }

    fn set_native_host_id(&self, host_id: String) -> Result<()> {
        self.set_value(&["bridge", "host", "id"], Value::String(host_id))
    }

    fn get_native_host_command(&self, host_id: &str) -> Result<(String, Vec<String>)> {
        let command = match self.get_value(&["bridge", "host", "registry", host_id, "command"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => return Err(anyhow!("native host {host_id} has no registered command")),
        };

        let args = match self.get_value(&["bridge", "host", "registry", host_id, "args"]) {
            Ok(Value::Sequence(seq)) => seq
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        Ok((command, args))
    }

    fn set_native_host_command(
        &self,
        host_id: &str,
        command: String,
        args: Vec<String>,
    ) -> Result<()> {
        self.set_value(
            &["bridge", "host", "registry", host_id, "command"],
            Value::String(command),
        )?;
        self.set_value(
            &["bridge", "host", "registry", host_id, "args"],
            Value::Sequence(args.into_iter().map(Value::String).collect()),
        )
    }
}
