//! Minimal producer pushing a synthetic session to the relay.
//!
//! Run the relay first, then:
//!
//! ```sh
//! cargo run --example simple_producer
//! ```

use npconfig::get_config;
use npmodel::{PlaybackState, SessionSnapshot};
use npproducer::{MetadataSource, Producer, ProducerConfigExt, RelayConnector, SourceEvent};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

struct SyntheticSource {
    app: String,
    elapsed: f64,
    events: Option<mpsc::Receiver<SourceEvent>>,
}

impl MetadataSource for SyntheticSource {
    fn read_current_state(&mut self) -> SessionSnapshot {
        self.elapsed += 1.0;
        SessionSnapshot::new(
            self.app.clone(),
            "Blue in Green",
            "Miles Davis",
            "Kind of Blue",
            PlaybackState::Playing,
            327.0,
            self.elapsed,
        )
    }

    fn subscribe(&mut self) -> mpsc::Receiver<SourceEvent> {
        self.events.take().unwrap()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let config = get_config();
    let socket = config.get_socket_path()?;
    let channel = config.get_channel_name();
    let interval = config.get_push_interval();

    // Keep the sender alive so the producer runs until Ctrl-C.
    let (_events_tx, events_rx) = mpsc::channel(8);
    let source = SyntheticSource {
        app: config.get_app_label(),
        elapsed: 0.0,
        events: Some(events_rx),
    };

    let producer = Producer::new(source, RelayConnector::new(socket, channel), interval);

    tokio::select! {
        _ = producer.run() => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    Ok(())
}
