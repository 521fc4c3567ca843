//! NPBridge relay daemon.
//!
//! Accepts now-playing records from producer links over a Unix socket
//! and forwards them, verbatim, to a native host process over its only
//! persistent link. Producer connectivity and host connectivity are
//! managed independently: either side can come and go without the
//! other noticing anything but dropped records.

pub mod codec;
pub mod config_ext;
pub mod error;
pub mod host;
pub mod relay;

pub use codec::{NativeMessageCodec, MAX_RECORD_BYTES};
pub use config_ext::RelayConfigExt;
pub use error::{RelayError, Result};
pub use host::{NativeHostConnector, NativeHostLink};
pub use relay::RelayServer;
