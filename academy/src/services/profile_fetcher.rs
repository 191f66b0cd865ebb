//! Resolves an identity to its profile record.
//!
//! A missing profile is a normal, recoverable state: errors, timeouts and
//! empty results all come back as `None` and are only logged.

use std::sync::Arc;
use std::time::Duration;

use academy_adapters::DataAdapter;
use tracing::{debug, error, warn};

use crate::database::models::Profile;
use crate::database::queries;

#[derive(Clone)]
pub struct ProfileFetcher {
    db: Arc<dyn DataAdapter>,
    timeout: Duration,
}

impl ProfileFetcher {
    pub fn new(db: Arc<dyn DataAdapter>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches the profile for `user_id`, giving up after the timeout.
    pub async fn fetch(&self, user_id: &str) -> Option<Profile> {
        if user_id.is_empty() {
            warn!("profile requested for empty user id");
            return None;
        }

        debug!(user_id, "fetching profile");
        let call = queries::get_user_profile(self.db.as_ref(), user_id);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(Some(profile))) => {
                debug!(user_id, role = %profile.role, status = %profile.status, "profile fetched");
                Some(profile)
            }
            Ok(Ok(None)) => {
                warn!(user_id, "no profile found for user");
                None
            }
            Ok(Err(e)) => {
                error!(user_id, error = %e, "error fetching profile");
                None
            }
            Err(_) => {
                error!(user_id, timeout_ms = self.timeout.as_millis() as u64, "profile fetch timed out");
                None
            }
        }
    }
}
