use tokio::sync::Mutex;
use tracing::warn;

use crate::client::{Session, WebDriverClient};
use crate::error::WebDriverError;

/// Take-once owner of a browser session. The flow opens the session at
/// start; whichever side finishes first (flow, deadline watchdog, stop
/// request) calls `release`, and the take() guarantees the remote
/// teardown happens exactly once.
pub struct SessionGuard {
    client: WebDriverClient,
    session: Mutex<Option<Session>>,
}

impl SessionGuard {
    pub fn new(client: WebDriverClient) -> Self {
        Self {
            client,
            session: Mutex::new(None),
        }
    }

    /// Create the remote session and take ownership of it.
    pub async fn open(&self) -> Result<Session, WebDriverError> {
        let session = self.client.new_session().await?;
        *self.session.lock().await = Some(session.clone());
        Ok(session)
    }

    /// Tear down the remote session if it is still owned. Safe to call
    /// from every exit path; later calls are no-ops.
    pub async fn release(&self) {
        let taken = self.session.lock().await.take();
        if let Some(session) = taken {
            if let Err(e) = self.client.delete_session(&session).await {
                warn!(session = %session.id, error = %e, "failed to release browser session");
            }
        }
    }

    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// The session currently owned, without taking it.
    pub async fn current(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }
}
