//! Relay server: producer links in, one native host link out.
//!
//! Producers connect over a Unix domain socket and speak
//! newline-delimited JSON. The first record must be a `connect`
//! handshake on the expected channel; connections announcing any other
//! channel are ignored, not errored. Accepted records are funneled
//! through a single forwarder task onto the native host link manager,
//! so every producer shares the one host connection. Nothing is queued
//! beyond in-flight forwarding: while the host is unreachable, records
//! are dropped.

use futures::StreamExt;
use nplink::{Connector, LinkManager};
use npconfig::Config;
use npmodel::{is_forwardable, RelayMessage};
use serde_json::Value;
use std::path::PathBuf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Longest producer line accepted before the connection is dropped.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Capacity of the hand-off channel between connection handlers and
/// the forwarder. This is not a delivery queue: when the host link is
/// up the forwarder drains it as fast as records arrive, and when the
/// link is down the manager drops each record immediately.
const FORWARD_CHANNEL_CAPACITY: usize = 32;

/// Accepts producer connections and forwards their records to the
/// native host.
pub struct RelayServer {
    socket_path: PathBuf,
    channel: String,
}

impl RelayServer {
    pub fn new(socket_path: impl Into<PathBuf>, channel: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
            channel: channel.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.get_socket_path()?,
            config.get_channel_name(),
        ))
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Run the relay until the task is cancelled.
    ///
    /// The native host link is owned by a dedicated forwarder task;
    /// producer connectivity and host connectivity recover
    /// independently of each other.
    pub async fn run<C>(self, connector: C) -> Result<()>
    where
        C: Connector + 'static,
        C::Link: 'static,
    {
        if let Some(parent) = self.socket_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // A previous run may have left the socket file behind.
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => debug!(socket = %self.socket_path.display(), "removed stale socket"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(
            socket = %self.socket_path.display(),
            channel = %self.channel,
            host = connector.peer(),
            "relay listening"
        );

        let (forward_tx, forward_rx) = mpsc::channel::<Value>(FORWARD_CHANNEL_CAPACITY);
        tokio::spawn(forward_records(forward_rx, LinkManager::new(connector)));

        loop {
            // The forwarder only goes away if it panicked; without it
            // the accept loop cannot usefully continue, so its channel
            // closing ends the relay even while the listener is idle.
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = forward_tx.closed() => {
                    warn!("forwarder task terminated, shutting relay down");
                    return Ok(());
                }
            };

            match accepted {
                Ok((stream, _)) => {
                    let channel = self.channel.clone();
                    let tx = forward_tx.clone();
                    tokio::spawn(handle_producer(stream, channel, tx));
                }
                Err(err) => {
                    warn!(error = %err, "failed to accept producer connection");
                }
            }
        }
    }
}

/// Owns the native host link manager and pushes every accepted record
/// through it, in arrival order.
async fn forward_records<C: Connector>(mut rx: mpsc::Receiver<Value>, mut manager: LinkManager<C>) {
    loop {
        tokio::select! {
            record = rx.recv() => match record {
                Some(record) => manager.send(&record).await,
                None => break,
            },
            _ = manager.maintain() => {}
        }
    }
    debug!(peer = manager.peer(), "forwarder stopped");
}

/// Reads one producer connection: handshake, then records.
async fn handle_producer(stream: UnixStream, channel: String, tx: mpsc::Sender<Value>) {
    let mut lines = FramedRead::new(stream, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

    // The connection is only accepted when it announces the expected
    // channel; everything else is filtered, not an error.
    let hello = match lines.next().await {
        Some(Ok(line)) => line,
        _ => return,
    };
    match serde_json::from_str::<RelayMessage>(&hello) {
        Ok(RelayMessage::Connect { channel: announced }) if announced == channel => {
            debug!(channel = %channel, "producer connected");
        }
        Ok(RelayMessage::Connect { channel: announced }) => {
            debug!(announced = %announced, "ignoring producer on unexpected channel");
            return;
        }
        _ => {
            debug!("ignoring producer connection without handshake");
            return;
        }
    }

    while let Some(item) = lines.next().await {
        let line = match item {
            Ok(line) => line,
            Err(err) => {
                debug!(error = %err, "producer stream error, closing connection");
                break;
            }
        };

        // Malformed records are dropped in isolation; they never
        // affect the connection or the host link.
        let record: Value = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(_) => {
                debug!("dropping malformed producer record");
                continue;
            }
        };
        if !is_forwardable(&record) {
            debug!("dropping record with unrecognized type tag");
            continue;
        }

        if tx.send(record).await.is_err() {
            // Forwarder gone; nothing left to relay to.
            break;
        }
    }

    debug!(channel = %channel, "producer disconnected");
}
