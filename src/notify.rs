//! Change broadcasting for connected portal clients.
//!
//! The engine publishes [`ChangeEvent`]s on a tokio broadcast channel; the
//! web layer holds one receiver per connected client and forwards the wire
//! form over its push socket. Emission is fire-and-forget: a send with no
//! live receivers is not an error.

use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::store::types::ScheduleEntry;

/// Default broadcast capacity. Slow clients that fall further behind than
/// this see a `Lagged` error on their receiver and resync from the store.
const DEFAULT_CAPACITY: usize = 256;

/// A change the engine made to a card.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A scheduled image was applied to a card.
    ImageApplied { card_id: i64, image: String },
    /// Expired schedule entries were removed; `entries` is what remains.
    SchedulePruned {
        card_id: i64,
        entries: Vec<ScheduleEntry>,
    },
}

impl ChangeEvent {
    /// Wire form pushed to clients.
    ///
    /// Both variants serialize as `card:updated` with the changed field
    /// attached. The schedule list travels under `scheduleWeekdays`, the
    /// field name existing clients already bind to, with an emptied list
    /// sent as `null`.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::ImageApplied { card_id, image } => json!({
                "type": "card:updated",
                "cardId": card_id,
                "image": image,
            }),
            Self::SchedulePruned { card_id, entries } => {
                let remaining = if entries.is_empty() {
                    Value::Null
                } else {
                    json!(entries)
                };
                json!({
                    "type": "card:updated",
                    "cardId": card_id,
                    "scheduleWeekdays": remaining,
                })
            }
        }
    }
}

/// Broadcast fan-out for [`ChangeEvent`]s.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to subsequent change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn emit(&self, event: ChangeEvent) {
        // send() errs when no receiver exists, which is normal at startup
        // and between client connections.
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
