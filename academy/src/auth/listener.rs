//! Background task feeding provider notifications into the session store.

use std::sync::Arc;

use academy_adapters::AuthSubscription;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::service::SessionStore;

pub struct AuthChangeListener;

/// Handle to a running listener. Dropping it stops the listener too, the
/// same as [`shutdown`](ListenerHandle::shutdown) without waiting for it.
pub struct ListenerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl AuthChangeListener {
    /// Spawns the listener. Notifications are applied one at a time in the
    /// order the provider emitted them.
    pub fn spawn(store: Arc<SessionStore>, mut subscription: AuthSubscription) -> ListenerHandle {
        let (shutdown, mut stop) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            info!("auth change listener started");
            loop {
                tokio::select! {
                    // Fires on an explicit shutdown and when the handle is dropped.
                    _ = &mut stop => {
                        debug!("auth change listener received shutdown");
                        break;
                    }
                    change = subscription.recv() => match change {
                        Some(change) => store.on_auth_state_changed(change).await,
                        None => {
                            debug!("auth provider closed its notification channel");
                            break;
                        }
                    },
                }
            }
            subscription.unsubscribe();
            info!("auth change listener stopped");
        });

        ListenerHandle { shutdown, task }
    }
}

impl ListenerHandle {
    /// Signals the listener to stop after the notification it is handling.
    /// The returned handle can be awaited to wait for that.
    pub fn shutdown(self) -> JoinHandle<()> {
        let _ = self.shutdown.send(());
        self.task
    }
}
