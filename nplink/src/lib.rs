//! Connection/reconnection core for NPBridge.
//!
//! Both NPBridge links — the producer's link to the relay and the
//! relay's link to the native host process — are instances of the same
//! primitive: a [`LinkManager`] that owns one logical connection to a
//! named peer, re-establishes it after failure with bounded exponential
//! backoff, and drops records rather than queueing them while the peer
//! is unreachable.
//!
//! The transport itself is abstracted behind [`Connector`] and
//! [`Link`]: the manager only sees "connect to the peer, get a duplex
//! channel of structured records".
//!
//! # Example
//!
//! ```ignore
//! let mut manager = LinkManager::new(connector);
//! loop {
//!     tokio::select! {
//!         record = rx.recv() => match record {
//!             Some(record) => manager.send(&record).await,
//!             None => break,
//!         },
//!         _ = manager.maintain() => {}
//!     }
//! }
//! ```

mod backoff;
mod error;
mod manager;
mod transport;

pub use backoff::{Backoff, BACKOFF_CEILING, BACKOFF_FLOOR};
pub use error::{LinkError, Result};
pub use manager::LinkManager;
pub use transport::{Connector, Link};
