//! Single-owner manager for one reconnecting link.

use serde_json::Value;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

use crate::backoff::Backoff;
use crate::transport::{Connector, Link};

/// Connection state of a managed link.
enum LinkState<L> {
    /// No live link. `retry_at` holds the scheduled retry deadline, or
    /// `None` when nothing triggered a dial yet (lazy link).
    Disconnected { retry_at: Option<Instant> },
    Connected(L),
}

enum Maintenance {
    PeerGone,
    RetryAt(Instant),
}

/// Maintains a single logical connection to a named peer.
///
/// The manager owns its connector, its backoff state and the live link,
/// and is driven by exactly one task: there is never more than one
/// outstanding connect attempt per link. Delivery is best-effort by
/// design. A record sent while the link is down is dropped, not queued;
/// only the freshest state matters and retrying stale snapshots is
/// wasted work.
///
/// The owning task races [`LinkManager::maintain`] against its message
/// sources, typically:
///
/// ```ignore
/// loop {
///     tokio::select! {
///         record = rx.recv() => manager.send(&record?).await,
///         _ = manager.maintain() => {}
///     }
/// }
/// ```
pub struct LinkManager<C: Connector> {
    connector: C,
    backoff: Backoff,
    state: LinkState<C::Link>,
}

impl<C: Connector> LinkManager<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            backoff: Backoff::new(),
            state: LinkState::Disconnected { retry_at: None },
        }
    }

    /// Peer label, as reported by the connector.
    pub fn peer(&self) -> &str {
        self.connector.peer()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, LinkState::Connected(_))
    }

    /// Deadline of the scheduled reconnect attempt, if any.
    pub fn retry_deadline(&self) -> Option<Instant> {
        match &self.state {
            LinkState::Disconnected { retry_at } => *retry_at,
            LinkState::Connected(_) => None,
        }
    }

    /// Return the live link, dialing if necessary.
    ///
    /// Returns `None` while a scheduled retry deadline lies in the
    /// future (mid-backoff) or when the dial fails, in which case the
    /// next retry is scheduled after the current backoff delay.
    pub async fn ensure_connected(&mut self) -> Option<&mut C::Link> {
        if let LinkState::Disconnected { retry_at } = &self.state {
            if let Some(at) = retry_at {
                if Instant::now() < *at {
                    trace!(peer = self.connector.peer(), "mid-backoff, not dialing");
                    return None;
                }
            }
            match self.connector.connect().await {
                Ok(link) => {
                    self.backoff.reset();
                    info!(peer = self.connector.peer(), "link established");
                    self.state = LinkState::Connected(link);
                }
                Err(err) => {
                    let delay = self.backoff.next_delay();
                    warn!(
                        peer = self.connector.peer(),
                        error = %err,
                        retry_in_ms = delay.as_millis() as u64,
                        "connect failed"
                    );
                    self.state = LinkState::Disconnected {
                        retry_at: Some(Instant::now() + delay),
                    };
                    return None;
                }
            }
        }
        match &mut self.state {
            LinkState::Connected(link) => Some(link),
            LinkState::Disconnected { .. } => None,
        }
    }

    /// Send one record, best-effort.
    ///
    /// With no link available the record is silently dropped. A send
    /// failure on a live link drops the record and schedules a
    /// reconnect, identical to a connect failure.
    pub async fn send(&mut self, record: &Value) {
        if self.ensure_connected().await.is_none() {
            debug!(peer = self.connector.peer(), "link unavailable, record dropped");
            return;
        }
        let result = match &mut self.state {
            LinkState::Connected(link) => link.send(record).await,
            LinkState::Disconnected { .. } => return,
        };
        if let Err(err) = result {
            warn!(
                peer = self.connector.peer(),
                error = %err,
                "send failed, record dropped"
            );
            self.on_disconnect();
        }
    }

    /// Housekeeping future for the owning task.
    ///
    /// While connected, waits on inbound records: acknowledgements from
    /// the peer are discarded by policy (they carry nothing actionable)
    /// and end-of-stream is the disconnect event. While mid-backoff,
    /// sleeps until the retry deadline and re-dials. The state is
    /// re-checked after the sleep, so a retry scheduled in an older
    /// backoff cycle never produces a duplicate connect attempt.
    pub async fn maintain(&mut self) {
        let action = match &mut self.state {
            LinkState::Connected(link) => match link.recv().await {
                Some(_ack) => {
                    trace!(peer = self.connector.peer(), "discarding inbound record");
                    return;
                }
                None => Maintenance::PeerGone,
            },
            LinkState::Disconnected { retry_at: Some(at) } => Maintenance::RetryAt(*at),
            LinkState::Disconnected { retry_at: None } => {
                // Lazy link: nothing to do until someone sends.
                std::future::pending().await
            }
        };

        match action {
            Maintenance::PeerGone => {
                info!(peer = self.connector.peer(), "peer disconnected");
                self.on_disconnect();
            }
            Maintenance::RetryAt(at) => {
                sleep_until(at).await;
                // The link may have been re-established since this
                // retry was scheduled.
                if !self.is_connected() {
                    let _ = self.ensure_connected().await;
                }
            }
        }
    }

    fn on_disconnect(&mut self) {
        let delay = self.backoff.next_delay();
        debug!(
            peer = self.connector.peer(),
            retry_in_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
        self.state = LinkState::Disconnected {
            retry_at: Some(Instant::now() + delay),
        };
    }
}
