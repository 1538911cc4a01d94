//! Watch event delivery
//!
//! A [`Watcher`] is the consumer half of an unbounded channel fed by the tracker
//! (or by a test through a [`FakeWatcher`]). Dropping or stopping it ends the watch;
//! the producer notices the closed channel and stops sending.

use crate::Result;
use futures::stream::{BoxStream, Stream, StreamExt};
use kube::core::{ErrorResponse, WatchEvent};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::trace;

/// Typed event stream returned by resource clients
pub type WatchStream<K> = BoxStream<'static, Result<WatchEvent<K>>>;

/// Untyped stream of watch events
#[derive(Debug)]
pub struct Watcher {
    rx: mpsc::UnboundedReceiver<WatchEvent<Value>>,
}

impl Watcher {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<WatchEvent<Value>>) -> Self {
        Self { rx }
    }

    /// Stop receiving events; anything already queued can still be drained
    pub fn stop(&mut self) {
        self.rx.close();
    }

    /// Decode every event object into `K`
    pub fn typed<K>(self) -> WatchStream<K>
    where
        K: DeserializeOwned + Send + 'static,
    {
        self.map(decode_event::<K>).boxed()
    }
}

impl Stream for Watcher {
    type Item = WatchEvent<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

fn decode_event<K: DeserializeOwned>(event: WatchEvent<Value>) -> Result<WatchEvent<K>> {
    Ok(match event {
        WatchEvent::Added(obj) => WatchEvent::Added(serde_json::from_value(obj)?),
        WatchEvent::Modified(obj) => WatchEvent::Modified(serde_json::from_value(obj)?),
        WatchEvent::Deleted(obj) => WatchEvent::Deleted(serde_json::from_value(obj)?),
        WatchEvent::Bookmark(bookmark) => WatchEvent::Bookmark(bookmark),
        WatchEvent::Error(err) => WatchEvent::Error(err),
    })
}

/// Producer half handed to tests that want to script a watch by hand
///
/// # Example
///
/// ```
/// use futures::StreamExt;
/// use kube::core::WatchEvent;
/// use serde_json::json;
/// use tekton_fake_client::watch::fake_watcher;
///
/// # #[tokio::main]
/// # async fn main() {
/// let (producer, mut watcher) = fake_watcher();
/// producer.add(&json!({"metadata": {"name": "run-1"}})).unwrap();
///
/// match watcher.next().await {
///     Some(WatchEvent::Added(obj)) => assert_eq!(obj["metadata"]["name"], "run-1"),
///     other => panic!("unexpected event: {:?}", other),
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FakeWatcher {
    tx: mpsc::UnboundedSender<WatchEvent<Value>>,
}

/// Create a connected producer/consumer pair
pub fn fake_watcher() -> (FakeWatcher, Watcher) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FakeWatcher { tx }, Watcher::new(rx))
}

impl FakeWatcher {
    /// Send an event; returns false once the consumer has gone away
    pub fn send(&self, event: WatchEvent<Value>) -> bool {
        if self.tx.send(event).is_err() {
            trace!("Dropping watch event for a stopped watcher");
            return false;
        }
        true
    }

    pub fn add<K: Serialize>(&self, obj: &K) -> Result<bool> {
        Ok(self.send(WatchEvent::Added(serde_json::to_value(obj)?)))
    }

    pub fn modify<K: Serialize>(&self, obj: &K) -> Result<bool> {
        Ok(self.send(WatchEvent::Modified(serde_json::to_value(obj)?)))
    }

    pub fn delete<K: Serialize>(&self, obj: &K) -> Result<bool> {
        Ok(self.send(WatchEvent::Deleted(serde_json::to_value(obj)?)))
    }

    pub fn error(&self, status: ErrorResponse) -> bool {
        self.send(WatchEvent::Error(status))
    }

    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }
}
