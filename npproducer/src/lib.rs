//! NPBridge producer.
//!
//! Observes one media session through a [`MetadataSource`] and pushes
//! snapshots of it to the relay over a Unix socket link. Pushes happen
//! at startup, on a periodic timer while the observing context is
//! visible, and whenever the source reports a playback event. Delivery
//! is best effort: with the relay down, snapshots are dropped and the
//! link retries in the background with bounded backoff.

pub mod config_ext;
pub mod producer;
pub mod source;
pub mod transport;

pub use config_ext::ProducerConfigExt;
pub use producer::Producer;
pub use source::{MetadataSource, SourceEvent};
pub use transport::{ProducerLink, RelayConnector};
