pub mod batch;
pub mod run;
pub mod validate;

use std::sync::Arc;

use anyhow::Result;

use courtbot_core::config::AppConfig;
use courtbot_core::notify::Notifier;
use courtbot_mail::MailClient;
use courtbot_orchestrator::Orchestrator;
use courtbot_stealth::StealthEngine;
use courtbot_webdriver::WebDriverClient;

use crate::notify::ScreenshotDirNotifier;

/// Wire the injected clients together the same way for every command.
pub(crate) fn build_orchestrator(
    config: &AppConfig,
    screenshot_dir: Option<String>,
) -> Result<Arc<Orchestrator>> {
    let driver = WebDriverClient::new(config.webdriver.clone())?;
    let stealth = Arc::new(StealthEngine::new(driver.clone(), config.stealth.clone()));
    let mail = Arc::new(MailClient::new(config.credentials.clone(), config.mail.clone()));

    let notifier: Option<Arc<dyn Notifier>> =
        screenshot_dir.map(|dir| Arc::new(ScreenshotDirNotifier::new(dir)) as Arc<dyn Notifier>);

    Ok(Arc::new(Orchestrator::new(
        driver,
        stealth,
        mail,
        config.flow.clone(),
        config.orchestrator.clone(),
        notifier,
    )))
}
