use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use courtbot_core::notify::{BookingEvent, Notifier};

/// Notification consumer that drops result screenshots into a directory
/// and logs the terminal status. Configuring it is what turns screenshot
/// capture on in the core.
pub struct ScreenshotDirNotifier {
    dir: PathBuf,
}

impl ScreenshotDirNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Notifier for ScreenshotDirNotifier {
    async fn notify(&self, event: &BookingEvent) -> Result<()> {
        info!(
            id = %event.reservation_id,
            name = %event.reservation_name,
            status = %event.status,
            "booking finished"
        );

        if let Some(bytes) = &event.screenshot {
            tokio::fs::create_dir_all(&self.dir).await?;
            let filename = format!(
                "{}-{}.png",
                event.reservation_id,
                chrono::Utc::now().format("%Y%m%dT%H%M%S")
            );
            let path = self.dir.join(filename);
            tokio::fs::write(&path, bytes).await?;
            info!(path = %path.display(), "screenshot written");
        }

        Ok(())
    }
}
