use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::checkout::CheckoutStep;

/// Checkout lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutStarted {
        session_id: Uuid,
        item_id: Uuid,
        bid_amount: Decimal,
    },
    StepAdvanced {
        session_id: Uuid,
        from: CheckoutStep,
        to: CheckoutStep,
    },
    SteppedBack {
        session_id: Uuid,
        from: CheckoutStep,
        to: CheckoutStep,
    },
    PaymentCaptured {
        session_id: Uuid,
        transaction_id: String,
        amount: Decimal,
    },
    PaymentFailed {
        session_id: Uuid,
        reason: String,
    },
    ConfirmationEmailFailed {
        session_id: Uuid,
        email: String,
    },
    CheckoutCompleted {
        session_id: Uuid,
        order_total: Decimal,
    },
    CheckoutCancelled {
        session_id: Uuid,
    },
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

    /// Sends an event asynchronously. Delivery is best-effort; a full or
    /// closed channel is logged and otherwise ignored so checkout progress
    /// never blocks on observers.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to send checkout event: {}", e);
        }
    }

    /// Non-suspending variant for the session's synchronous transitions.
    /// Same best-effort contract as [`send`](Self::send).
    pub fn try_send(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Failed to send checkout event: {}", e);
        }
    }
}

/// Creates an event channel with the given capacity.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Consumes and logs checkout events. Spawned once from the binary.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PaymentFailed { session_id, reason } => {
                warn!(%session_id, %reason, "payment attempt failed");
            }
            Event::ConfirmationEmailFailed { session_id, email } => {
                warn!(%session_id, %email, "confirmation email failed");
            }
            _ => {
                info!("Received event: {:?}", event);
            }
        }
    }

    info!("Event channel closed; stopping event processing loop");
}
