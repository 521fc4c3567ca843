//! Transport seam between the link manager and concrete connections.
//!
//! The manager only ever sees "connect to the peer, get a duplex channel
//! of structured records". Each boundary (producer to relay, relay to
//! native host) provides its own implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Establishes links to one named peer.
#[async_trait]
pub trait Connector: Send {
    type Link: Link;

    /// Peer label used in logs.
    fn peer(&self) -> &str;

    /// Attempt to establish a link. A failure here is never fatal; the
    /// manager schedules a backoff retry.
    async fn connect(&mut self) -> Result<Self::Link>;
}

/// A live duplex channel of structured records.
#[async_trait]
pub trait Link: Send {
    /// Send one record to the peer.
    async fn send(&mut self, record: &Value) -> Result<()>;

    /// Next inbound record, or `None` once the peer is gone.
    ///
    /// The manager polls this from the moment the link is established,
    /// so disconnection is observed even when nothing is being sent.
    async fn recv(&mut self) -> Option<Value>;
}
