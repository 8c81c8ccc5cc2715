use async_trait::async_trait;

use crate::types::RunStatus;

/// Terminal event for one reservation run, handed to a downstream
/// notification consumer. The screenshot is only captured when such a
/// consumer is actually configured.
#[derive(Debug, Clone)]
pub struct BookingEvent {
    pub reservation_id: String,
    pub reservation_name: String,
    pub status: RunStatus,
    pub screenshot: Option<Vec<u8>>,
}

/// Outbound notification delivery. Implemented by the caller; the core
/// only invokes it on terminal states.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &BookingEvent) -> anyhow::Result<()>;
}

/// Receives human-readable step descriptions as a flow advances, so
/// collaborators can render progress without interpreting error types.
pub trait ProgressObserver: Send + Sync {
    fn on_step(&self, step: &str);
}
