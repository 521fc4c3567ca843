//! Producer side of the relay link.
//!
//! Connects to the relay's Unix domain socket and speaks
//! newline-delimited JSON. The handshake announcing the channel is part
//! of `connect`, so a fresh link is always past the relay's filter
//! before the first record goes out.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use nplink::{Connector, Link, LinkError};
use npmodel::RelayMessage;
use serde_json::Value;
use std::path::PathBuf;
use tokio::net::UnixStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::debug;

/// Longest line the producer will read back from the relay.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Dials the relay socket and performs the channel handshake.
pub struct RelayConnector {
    socket_path: PathBuf,
    channel: String,
}

impl RelayConnector {
    pub fn new(socket_path: impl Into<PathBuf>, channel: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Connector for RelayConnector {
    type Link = ProducerLink;

    fn peer(&self) -> &str {
        "relay"
    }

    async fn connect(&mut self) -> nplink::Result<ProducerLink> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|err| LinkError::connect_failed("relay", err))?;
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

        let hello = RelayMessage::Connect {
            channel: self.channel.clone(),
        };
        let line = serde_json::to_string(&hello)?;
        framed.send(line).await.map_err(map_line_error)?;

        debug!(
            socket = %self.socket_path.display(),
            channel = %self.channel,
            "connected to relay"
        );
        Ok(ProducerLink { framed })
    }
}

/// A live connection to the relay.
pub struct ProducerLink {
    framed: Framed<UnixStream, LinesCodec>,
}

#[async_trait]
impl Link for ProducerLink {
    async fn send(&mut self, record: &Value) -> nplink::Result<()> {
        let line = serde_json::to_string(record)?;
        self.framed.send(line).await.map_err(map_line_error)
    }

    async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.framed.next().await {
                Some(Ok(line)) => match serde_json::from_str(&line) {
                    Ok(value) => return Some(value),
                    Err(_) => continue,
                },
                Some(Err(err)) => {
                    debug!(error = %err, "relay stream error");
                    return None;
                }
                None => return None,
            }
        }
    }
}

fn map_line_error(err: LinesCodecError) -> LinkError {
    match err {
        LinesCodecError::Io(err) => LinkError::Io(err),
        LinesCodecError::MaxLineLengthExceeded => LinkError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "line exceeds maximum length",
        )),
    }
}
