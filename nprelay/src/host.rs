//! Native host process boundary.
//!
//! The relay owns the only link to the native host: the registered
//! command is launched with piped stdio and records are framed with the
//! native messaging convention (see [`crate::codec`]). Responses from
//! the host are received by the link manager and discarded; the design
//! assumes the host needs no confirmation loop. Child exit or stdout
//! EOF is the disconnect event that triggers a backoff retry.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use nplink::{Connector, Link, LinkError};
use npconfig::Config;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

use crate::codec::NativeMessageCodec;
use crate::config_ext::RelayConfigExt;
use crate::error::Result;

/// Launches the registered native host command on demand.
pub struct NativeHostConnector {
    host_id: String,
    command: String,
    args: Vec<String>,
}

impl NativeHostConnector {
    pub fn new(host_id: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            host_id: host_id.into(),
            command: command.into(),
            args,
        }
    }

    /// Build the connector for the host identifier configured under
    /// `bridge.host.id`, resolved through the host registry.
    pub fn from_config(config: &Config) -> Result<Self> {
        let host_id = config.get_native_host_id()?;
        let (command, args) = config
            .get_native_host_command(&host_id)
            .map_err(|_| crate::error::RelayError::UnknownHost(host_id.clone()))?;
        Ok(Self::new(host_id, command, args))
    }
}

#[async_trait]
impl Connector for NativeHostConnector {
    type Link = NativeHostLink;

    fn peer(&self) -> &str {
        &self.host_id
    }

    async fn connect(&mut self) -> nplink::Result<NativeHostLink> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| LinkError::connect_failed(&self.host_id, err))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LinkError::connect_failed(&self.host_id, "child stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LinkError::connect_failed(&self.host_id, "child stdout unavailable"))?;

        debug!(host = %self.host_id, pid = ?child.id(), "native host launched");

        Ok(NativeHostLink {
            _child: child,
            writer: FramedWrite::new(stdin, NativeMessageCodec),
            reader: FramedRead::new(stdout, NativeMessageCodec),
        })
    }
}

/// A live stdio link to a running native host process.
pub struct NativeHostLink {
    // Kept so kill_on_drop reaps the child with the link.
    _child: Child,
    writer: FramedWrite<ChildStdin, NativeMessageCodec>,
    reader: FramedRead<ChildStdout, NativeMessageCodec>,
}

#[async_trait]
impl Link for NativeHostLink {
    async fn send(&mut self, record: &Value) -> nplink::Result<()> {
        self.writer.send(record).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Value> {
        match self.reader.next().await {
            Some(Ok(record)) => Some(record),
            Some(Err(err)) => {
                debug!(error = %err, "native host framing error, closing link");
                None
            }
            None => None,
        }
    }
}
