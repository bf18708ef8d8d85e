// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reports events of the message pipeline to interested parties.
//!
//! Subscribers hold a [`Subscription`] handle and receive every notification posted while the
//! handle is alive. Dropping the handle unsubscribes.
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{trace, warn};

use crate::config::{Config, DEFAULT_NOTIFICATION_CAPACITY};

/// Event posted by the message pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// Content could not be parsed.
    ContentMalformed { content_type: Option<String> },

    /// No processor is available for the content.
    ContentUnsupported {
        content_type: String,
        command: Option<String>,
    },
}

/// Broadcasts notifications to all current subscribers.
#[derive(Clone, Debug)]
pub struct NotificationCenter {
    tx: broadcast::Sender<Notification>,
}

impl NotificationCenter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Center buffering [`Config::notification_capacity`] notifications per subscriber.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.notification_capacity)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Delivers the notification to all subscribers, without any it is dropped.
    pub fn post(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            trace!("no subscribers for notification");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAPACITY)
    }
}

/// Handle receiving notifications until it is dropped.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Notification>,
}

impl Subscription {
    /// Waits for the next notification, `None` once the center is gone.
    ///
    /// Notifications missed because the subscriber fell behind are skipped.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(notification) => return Some(notification),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber missed notifications");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next notification if one is waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.try_recv() {
                Ok(notification) => return Some(notification),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber missed notifications");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
