//! Per-search event fan-out over `tokio::sync::broadcast` channels.

use std::{
  collections::HashMap,
  sync::{PoisonError, RwLock},
};

use futures::{Stream, StreamExt};
use sourcer_core::events::{EventSink, SearchEvent};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default number of events buffered per search for slow subscribers.
pub const DEFAULT_CAPACITY: usize = 100;

/// One broadcast channel per search, created on first subscription.
///
/// Events published while nobody listens to a search are dropped.
pub struct EventBus {
  capacity: usize,
  channels: RwLock<HashMap<Uuid, broadcast::Sender<SearchEvent>>>,
}

impl Default for EventBus {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

impl EventBus {
  pub fn new(capacity: usize) -> Self {
    Self { capacity: capacity.max(1), channels: RwLock::new(HashMap::new()) }
  }

  pub fn subscribe(&self, search_id: Uuid) -> broadcast::Receiver<SearchEvent> {
    let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
    channels
      .entry(search_id)
      .or_insert_with(|| broadcast::channel(self.capacity).0)
      .subscribe()
  }

  /// Subscribe as a stream. Events missed because the subscriber lagged are
  /// skipped.
  pub fn subscribe_stream(&self, search_id: Uuid) -> impl Stream<Item = SearchEvent> + use<> {
    BroadcastStream::new(self.subscribe(search_id)).filter_map(move |result| async move {
      match result {
        Ok(event) => Some(event),
        Err(e) => {
          warn!(%search_id, error = %e, "event subscriber lagged");
          None
        }
      }
    })
  }

  pub fn subscriber_count(&self, search_id: Uuid) -> usize {
    self
      .channels
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&search_id)
      .map_or(0, broadcast::Sender::receiver_count)
  }
}

impl EventSink for EventBus {
  fn publish(&self, search_id: Uuid, event: SearchEvent) {
    let delivered = {
      let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
      match channels.get(&search_id) {
        Some(tx) => tx.send(event).is_ok(),
        None => return,
      }
    };

    if delivered {
      debug!(%search_id, "event published");
    } else {
      // Every receiver is gone; forget the channel.
      let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
      if channels.get(&search_id).is_some_and(|tx| tx.receiver_count() == 0) {
        channels.remove(&search_id);
      }
    }
  }
}
