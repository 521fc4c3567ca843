//! Push scheduling for one observed media session.

use std::time::Duration;

use nplink::{Connector, LinkManager};
use npmodel::RelayMessage;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::source::{MetadataSource, SourceEvent};

enum Step {
    Tick,
    Event(Option<SourceEvent>),
    Maintained,
}

/// Pushes session snapshots to the relay.
///
/// Three triggers: an immediate push at startup, a periodic timer while
/// the observing context is visible, and the source's playback events.
/// Every push goes through the relay link manager and inherits its
/// best-effort semantics: with the relay unreachable, snapshots are
/// dropped and the next trigger simply produces a fresher one.
pub struct Producer<S: MetadataSource, C: Connector> {
    source: S,
    manager: LinkManager<C>,
    interval: Duration,
}

impl<S: MetadataSource, C: Connector> Producer<S, C> {
    pub fn new(source: S, connector: C, interval: Duration) -> Self {
        Self {
            source,
            manager: LinkManager::new(connector),
            interval,
        }
    }

    /// Run until the source's event stream closes.
    pub async fn run(mut self) {
        let mut events = self.source.subscribe();
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut visible = true;

        self.push().await;

        loop {
            let step = tokio::select! {
                _ = ticker.tick(), if visible => Step::Tick,
                event = events.recv() => Step::Event(event),
                _ = self.manager.maintain() => Step::Maintained,
            };

            match step {
                Step::Tick => self.push().await,
                Step::Event(Some(SourceEvent::VisibilityChanged(now_visible))) => {
                    visible = now_visible;
                    if visible {
                        // Coming back to the foreground: push right away
                        // and restart the cadence from now.
                        ticker.reset();
                        self.push().await;
                    } else {
                        debug!("context hidden, timer suspended");
                    }
                }
                Step::Event(Some(_)) => self.push().await,
                Step::Event(None) => break,
                Step::Maintained => {}
            }
        }

        debug!("metadata source closed, producer stopping");
    }

    async fn push(&mut self) {
        let snapshot = self.source.read_current_state();
        match RelayMessage::NowPlaying(snapshot).to_value() {
            Ok(record) => self.manager.send(&record).await,
            Err(err) => warn!(error = %err, "failed to serialize snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nplink::{Link, LinkError};
    use npmodel::{PlaybackState, SessionSnapshot};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct ScriptedSource {
        reads: Arc<AtomicUsize>,
        events: Option<mpsc::Receiver<SourceEvent>>,
    }

    impl ScriptedSource {
        fn new() -> (Self, mpsc::Sender<SourceEvent>, Arc<AtomicUsize>) {
            let (tx, rx) = mpsc::channel(8);
            let reads = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    reads: reads.clone(),
                    events: Some(rx),
                },
                tx,
                reads,
            )
        }
    }

    impl MetadataSource for ScriptedSource {
        fn read_current_state(&mut self) -> SessionSnapshot {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            SessionSnapshot::new(
                "Test Player",
                format!("track {n}"),
                "artist",
                "album",
                PlaybackState::Playing,
                180.0,
                n as f64,
            )
        }

        fn subscribe(&mut self) -> mpsc::Receiver<SourceEvent> {
            self.events.take().expect("subscribed once")
        }
    }

    struct CaptureConnector {
        pushed: mpsc::UnboundedSender<Value>,
    }

    struct CaptureLink {
        pushed: mpsc::UnboundedSender<Value>,
    }

    #[async_trait]
    impl Connector for CaptureConnector {
        type Link = CaptureLink;

        fn peer(&self) -> &str {
            "relay"
        }

        async fn connect(&mut self) -> nplink::Result<CaptureLink> {
            Ok(CaptureLink {
                pushed: self.pushed.clone(),
            })
        }
    }

    #[async_trait]
    impl Link for CaptureLink {
        async fn send(&mut self, record: &Value) -> nplink::Result<()> {
            self.pushed
                .send(record.clone())
                .map_err(|_| LinkError::closed("relay"))
        }

        async fn recv(&mut self) -> Option<Value> {
            std::future::pending().await
        }
    }

    struct UnreachableConnector;

    #[async_trait]
    impl Connector for UnreachableConnector {
        type Link = CaptureLink;

        fn peer(&self) -> &str {
            "relay"
        }

        async fn connect(&mut self) -> nplink::Result<CaptureLink> {
            Err(LinkError::connect_failed("relay", "socket missing"))
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Value>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(record) = rx.try_recv() {
            out.push(record);
        }
        out
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_once_at_startup() {
        let (source, _events, _reads) = ScriptedSource::new();
        let (tx, mut pushed) = mpsc::unbounded_channel();
        let producer = Producer::new(
            source,
            CaptureConnector { pushed: tx },
            Duration::from_secs(1),
        );
        tokio::spawn(producer.run());
        settle().await;

        let records = drain(&mut pushed);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["type"], "nowplaying");
        assert_eq!(records[0]["app"], "Test Player");
        assert_eq!(records[0]["state"], "playing");
    }

    #[tokio::test(start_paused = true)]
    async fn timer_pushes_every_interval_while_visible() {
        let (source, _events, _reads) = ScriptedSource::new();
        let (tx, mut pushed) = mpsc::unbounded_channel();
        let producer = Producer::new(
            source,
            CaptureConnector { pushed: tx },
            Duration::from_secs(1),
        );
        tokio::spawn(producer.run());
        settle().await;
        drain(&mut pushed); // startup push

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert_eq!(drain(&mut pushed).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_context_suspends_the_timer() {
        let (source, events, _reads) = ScriptedSource::new();
        let (tx, mut pushed) = mpsc::unbounded_channel();
        let producer = Producer::new(
            source,
            CaptureConnector { pushed: tx },
            Duration::from_secs(1),
        );
        tokio::spawn(producer.run());
        settle().await;
        drain(&mut pushed);

        events
            .send(SourceEvent::VisibilityChanged(false))
            .await
            .unwrap();
        settle().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert!(drain(&mut pushed).is_empty());

        // Back to the foreground: one immediate push, then the cadence
        // resumes.
        events
            .send(SourceEvent::VisibilityChanged(true))
            .await
            .unwrap();
        settle().await;
        assert_eq!(drain(&mut pushed).len(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(drain(&mut pushed).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn playback_events_trigger_pushes() {
        let (source, events, _reads) = ScriptedSource::new();
        let (tx, mut pushed) = mpsc::unbounded_channel();
        let producer = Producer::new(
            source,
            CaptureConnector { pushed: tx },
            Duration::from_secs(60),
        );
        tokio::spawn(producer.run());
        settle().await;
        drain(&mut pushed);

        events.send(SourceEvent::Play).await.unwrap();
        events.send(SourceEvent::TimeUpdate).await.unwrap();
        events.send(SourceEvent::Pause).await.unwrap();
        settle().await;

        let records = drain(&mut pushed);
        assert_eq!(records.len(), 3);
        // Snapshots are read fresh for each push.
        assert_ne!(records[0]["title"], records[2]["title"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_the_source_goes_away() {
        let (source, events, _reads) = ScriptedSource::new();
        let (tx, _pushed) = mpsc::unbounded_channel();
        let producer = Producer::new(
            source,
            CaptureConnector { pushed: tx },
            Duration::from_secs(1),
        );
        let handle = tokio::spawn(producer.run());
        settle().await;

        drop(events);
        settle().await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_are_dropped_while_relay_is_unreachable() {
        let (source, events, reads) = ScriptedSource::new();
        let producer = Producer::new(source, UnreachableConnector, Duration::from_secs(60));
        let handle = tokio::spawn(producer.run());
        settle().await;

        events.send(SourceEvent::TimeUpdate).await.unwrap();
        settle().await;

        // Snapshots were read and dropped; nothing crashed.
        assert!(reads.load(Ordering::SeqCst) >= 2);
        assert!(!handle.is_finished());
    }
}
