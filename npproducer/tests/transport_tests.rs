//! Integration tests for the producer's relay link.
//!
//! The relay side is played by a bare Unix listener reading lines, so
//! the tests see exactly the bytes the connector and link put on the
//! wire.

use nplink::{Connector, Link};
use npproducer::RelayConnector;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;

fn socket_in(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("relay.sock")
}

async fn read_json_line(reader: &mut BufReader<UnixStream>) -> Value {
    let mut line = String::new();
    timeout(Duration::from_secs(2), reader.read_line(&mut line))
        .await
        .expect("line should arrive")
        .unwrap();
    serde_json::from_str(line.trim_end()).unwrap()
}

#[tokio::test]
async fn connect_sends_the_channel_handshake_first() {
    let dir = tempfile::tempdir().unwrap();
    let socket = socket_in(&dir);
    let listener = UnixListener::bind(&socket).unwrap();

    let mut connector = RelayConnector::new(&socket, "nowplaying");
    let mut link = connector.connect().await.unwrap();
    let (stream, _) = listener.accept().await.unwrap();
    let mut reader = BufReader::new(stream);

    let hello = read_json_line(&mut reader).await;
    assert_eq!(hello, json!({"type": "connect", "channel": "nowplaying"}));

    let record = json!({
        "type": "nowplaying",
        "app": "YouTube Music",
        "title": "So What",
        "artist": "Miles Davis",
        "album": "Kind of Blue",
        "state": "playing",
        "duration": 180.0,
        "elapsed": 10.0,
    });
    link.send(&record).await.unwrap();
    assert_eq!(read_json_line(&mut reader).await, record);
}

#[tokio::test]
async fn connect_fails_when_the_socket_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let mut connector = RelayConnector::new(socket_in(&dir), "nowplaying");
    assert!(connector.connect().await.is_err());
}

#[tokio::test]
async fn relay_hangup_is_observed_as_disconnect() {
    let dir = tempfile::tempdir().unwrap();
    let socket = socket_in(&dir);
    let listener = UnixListener::bind(&socket).unwrap();

    let mut connector = RelayConnector::new(&socket, "nowplaying");
    let mut link = connector.connect().await.unwrap();
    let (stream, _) = listener.accept().await.unwrap();
    drop(stream);

    let gone = timeout(Duration::from_secs(2), link.recv()).await.unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
async fn inbound_lines_are_parsed_as_records() {
    let dir = tempfile::tempdir().unwrap();
    let socket = socket_in(&dir);
    let listener = UnixListener::bind(&socket).unwrap();

    let mut connector = RelayConnector::new(&socket, "nowplaying");
    let mut link = connector.connect().await.unwrap();
    let (mut stream, _) = listener.accept().await.unwrap();

    // Unparseable lines are skipped, not treated as hangups.
    stream.write_all(b"not json\n").await.unwrap();
    stream.write_all(b"{\"ok\":true}\n").await.unwrap();
    stream.flush().await.unwrap();

    let received = timeout(Duration::from_secs(2), link.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, json!({"ok": true}));
}
