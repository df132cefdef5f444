use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Events emitted after successful mutations. Consumers are observers only;
/// no ledger invariant depends on event delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ItemCreated(Uuid),
    ItemUpdated(Uuid),
    ItemDeleted(Uuid),

    // Ledger events
    InboundRecorded {
        movement_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    },
    InboundReversed {
        movement_id: Uuid,
        item_id: Uuid,
        quantity: i32,
        clamped: bool,
    },
    OutboundRecorded {
        movement_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    },
    OutboundReversed {
        movement_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    },

    // Stock-take events
    StockTakeApplied {
        stock_take_id: Uuid,
        total_count: u64,
        mismatch_count: u64,
    },
    StockTakeDeleted(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Builds a channel pair with a sensible default buffer.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Spawn as a background task;
/// exits when every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(event = ?event, "Processing event");
    }
    info!("Event channel closed, stopping event processor");
}
