//! Best-effort webhook notification.
//!
//! At most one unauthenticated POST per triggered backup, response body
//! discarded. Failures are logged and never retried; delivery is not a
//! guarantee this core makes.

use std::time::Duration;
use tracing::{debug, warn};

const HOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Fire-and-forget webhook client.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(HOOK_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// POST an empty form to the hook URL. Never blocks subsequent work on
    /// failure.
    pub async fn post_hook(&self, url: &str, database_id: i64) {
        match self
            .client
            .post(url)
            .form::<[(&str, &str); 0]>(&[])
            .send()
            .await
        {
            Ok(response) => {
                debug!(url, database_id, status = %response.status(), "Posted backup webhook");
            }
            Err(err) => {
                warn!(url, database_id, error = %err, "Failed to POST backup webhook");
            }
        }
    }
}
