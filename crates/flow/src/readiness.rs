use std::time::{Duration, Instant};

use tracing::debug;

use courtbot_webdriver::{Locator, Session, WebDriverClient, WebDriverError};

use crate::error::FlowError;

/// Page-state predicate gating a state-machine transition.
pub enum Readiness {
    /// Any of the candidate elements is present.
    Element(Vec<Locator>),
    /// The page source contains this text (case-insensitive).
    Text(String),
    /// document.readyState reports complete.
    DocumentReady,
}

/// Poll a readiness predicate until it holds or the step budget runs
/// out. Exhausting the budget names the condition that was waited for.
pub async fn wait_for(
    driver: &WebDriverClient,
    session: &Session,
    readiness: &Readiness,
    timeout: Duration,
    interval: Duration,
    what: &str,
) -> Result<(), FlowError> {
    let started = Instant::now();

    loop {
        if check(driver, session, readiness).await? {
            debug!(what, elapsed_ms = started.elapsed().as_millis() as u64, "readiness signal");
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(FlowError::StepTimeout(what.to_string()));
        }
        tokio::time::sleep(interval).await;
    }
}

async fn check(
    driver: &WebDriverClient,
    session: &Session,
    readiness: &Readiness,
) -> Result<bool, FlowError> {
    match readiness {
        Readiness::Element(candidates) => match driver.find_first(session, candidates).await {
            Ok(_) => Ok(true),
            Err(WebDriverError::ElementNotFound(_)) => Ok(false),
            Err(other) => Err(other.into()),
        },
        Readiness::Text(needle) => {
            let source = driver.page_source(session).await?;
            Ok(source.to_lowercase().contains(&needle.to_lowercase()))
        }
        Readiness::DocumentReady => {
            let value = driver
                .execute(session, "return document.readyState;", vec![])
                .await?;
            Ok(value.as_str() == Some("complete"))
        }
    }
}
