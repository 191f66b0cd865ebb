//! Auth state notifications as a message channel.
//!
//! The provider side owns an [`AuthEventHub`] and emits every transition
//! through it; consumers hold an [`AuthSubscription`] and drop or
//! [`unsubscribe`](AuthSubscription::unsubscribe) it on teardown.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::AuthStateChange;

const CHANNEL_CAPACITY: usize = 32;

/// Fan-out point for auth state changes.
#[derive(Debug, Clone)]
pub struct AuthEventHub {
    sender: broadcast::Sender<AuthStateChange>,
}

impl Default for AuthEventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthEventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Sends a change to every live subscription. Having no subscribers is
    /// not an error.
    pub fn emit(&self, change: AuthStateChange) {
        debug!(event = %change.event, has_session = change.session.is_some(), "emitting auth change");
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving end of an [`AuthEventHub`]. Changes arrive in emission order.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthStateChange>,
}

impl AuthSubscription {
    /// Waits for the next change. Returns `None` once the hub is gone.
    ///
    /// A subscriber that falls behind skips the overwritten changes; the
    /// next change it sees still carries the current session.
    pub async fn recv(&mut self) -> Option<AuthStateChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth subscription lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        debug!("auth subscription closed");
    }
}
