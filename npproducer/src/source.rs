//! Metadata source boundary.
//!
//! The producer does no metadata scraping of its own. It consumes a
//! collaborator that exposes a synchronous snapshot read and a stream
//! of hook events, and stays agnostic of where the metadata comes from.

use npmodel::SessionSnapshot;
use tokio::sync::mpsc;

/// Events emitted by a metadata source's hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    Play,
    Pause,
    TimeUpdate,
    /// The observing context became visible (`true`) or hidden.
    VisibilityChanged(bool),
}

/// A collaborator observing one media session.
pub trait MetadataSource: Send {
    /// Fresh snapshot of the observed session. Called on every push;
    /// each snapshot supersedes the previous one.
    fn read_current_state(&mut self) -> SessionSnapshot;

    /// Subscribe to the source's event hooks. Called once at startup;
    /// the producer stops when the stream closes.
    fn subscribe(&mut self) -> mpsc::Receiver<SourceEvent>;
}
