//! User-facing notifications.
//!
//! Sinks are fire-and-forget: the cart store never waits on them and never
//! sees whether a message was delivered.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

/// Messages shown to the user, in the storefront's language (pt-BR).
pub mod messages {
    /// A new product was added to the cart.
    pub const PRODUCT_ADDED: &str = "Produto foi adicionado ao carrinho!";

    /// The requested quantity exceeds available stock.
    pub const OUT_OF_STOCK: &str = "Quantidade solicitada fora de estoque";

    /// Adding a product failed.
    pub const ADD_FAILED: &str = "Erro na adição do produto";

    /// Removing a product failed.
    pub const REMOVE_FAILED: &str = "Erro na remoção do produto";

    /// Changing a product's amount failed.
    pub const UPDATE_FAILED: &str = "Erro na alteração de quantidade do produto";
}

/// Receiver of user-facing success and error messages.
pub trait NotificationSink: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    fn new(level: NotificationLevel, message: &str) -> Self {
        Self {
            level,
            message: message.to_string(),
        }
    }
}

/// Emits notifications as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(notification = "success", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::warn!(notification = "error", "{message}");
    }
}

/// Forwards notifications to a UI task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver the UI drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, notification: Notification) {
        // Nobody listening is not an error for a toast.
        let _ = self.tx.send(notification);
    }
}

impl NotificationSink for ChannelNotifier {
    fn success(&self, message: &str) {
        self.send(Notification::new(NotificationLevel::Success, message));
    }

    fn error(&self, message: &str) {
        self.send(Notification::new(NotificationLevel::Error, message));
    }
}

/// Records notifications for later inspection.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    received: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages of the given level, oldest first.
    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }

    fn push(&self, notification: Notification) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

impl NotificationSink for MemoryNotifier {
    fn success(&self, message: &str) {
        self.push(Notification::new(NotificationLevel::Success, message));
    }

    fn error(&self, message: &str) {
        self.push(Notification::new(NotificationLevel::Error, message));
    }
}
