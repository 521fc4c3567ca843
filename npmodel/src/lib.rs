//! Data model shared by the NPBridge producer and relay.
//!
//! A producer observes a media session and pushes [`SessionSnapshot`]
//! records to the relay, which forwards them to a native host process.
//! Every snapshot supersedes the previous one; there is no identity and
//! no persistence.
//!
//! Records on the wire are JSON objects tagged by a mandatory `type`
//! field. The relay only ever inspects that tag: accepted records are
//! forwarded field-for-field as received, never re-encoded through the
//! typed model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Logical channel name producers connect on.
pub const CHANNEL_NAME: &str = "nowplaying";

/// `type` tag of the producer handshake record.
pub const MSG_TYPE_CONNECT: &str = "connect";

/// `type` tag of a now-playing snapshot record.
pub const MSG_TYPE_NOWPLAYING: &str = "nowplaying";

/// Playback state of the observed media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// A point-in-time description of the observed media session.
///
/// Durations and positions are in seconds. `elapsed` never exceeds
/// `duration` when a duration is known (see [`SessionSnapshot::new`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Label of the producing application ("YouTube Music", ...).
    pub app: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub state: PlaybackState,
    pub duration: f64,
    pub elapsed: f64,
}

impl SessionSnapshot {
    /// Build a snapshot, sanitizing the timing fields: negative values
    /// are floored to zero and `elapsed` is clamped to `duration` when
    /// a duration is known.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        app: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        state: PlaybackState,
        duration: f64,
        elapsed: f64,
    ) -> Self {
        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
        let mut elapsed = if elapsed.is_finite() && elapsed > 0.0 {
            elapsed
        } else {
            0.0
        };
        if duration > 0.0 {
            elapsed = elapsed.min(duration);
        }

        Self {
            app: app.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            state,
            duration,
            elapsed,
        }
    }
}

/// Records exchanged between a producer and the relay, tagged by the
/// mandatory `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayMessage {
    /// Handshake sent once by a producer right after connecting. The
    /// relay ignores connections whose channel does not match
    /// [`CHANNEL_NAME`].
    Connect { channel: String },
    /// A now-playing snapshot, flattened next to the tag.
    NowPlaying(SessionSnapshot),
}

impl RelayMessage {
    /// Serialize into a generic JSON record.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Peek at the `type` discriminator of a record without deserializing it.
pub fn message_type(record: &Value) -> Option<&str> {
    record.get("type")?.as_str()
}

/// Whether a record carries a payload tag the relay forwards to the
/// native host. Anything else is dropped, not propagated.
pub fn is_forwardable(record: &Value) -> bool {
    matches!(message_type(record), Some(MSG_TYPE_NOWPLAYING))
}
