use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use courtbot_core::config::FlowConfig;
use courtbot_core::notify::ProgressObserver;
use courtbot_core::types::ReservationConfig;
use courtbot_mail::MailClient;
use courtbot_stealth::StealthEngine;
use courtbot_webdriver::{ElementRef, Locator, Session, SessionGuard, WebDriverClient, WebDriverError};

use crate::classify::{self, PageVerdict};
use crate::error::FlowError;
use crate::readiness::{wait_for, Readiness};
use crate::selectors;
use crate::state::FlowState;

/// Terminal result of one flow, plus the screenshot captured for a
/// downstream notification consumer (None when none is configured).
#[derive(Debug)]
pub struct FlowOutcome {
    pub state: FlowState,
    pub screenshot: Option<Vec<u8>>,
}

/// Drives one reservation through the booking site, strictly
/// sequentially, with every interaction routed through the stealth
/// engine and the verification mail fetched on demand.
pub struct ReservationFlow {
    driver: WebDriverClient,
    stealth: Arc<StealthEngine>,
    mail: Arc<MailClient>,
    config: FlowConfig,
    observer: Arc<dyn ProgressObserver>,
    capture_screenshots: bool,
}

impl ReservationFlow {
    pub fn new(
        driver: WebDriverClient,
        stealth: Arc<StealthEngine>,
        mail: Arc<MailClient>,
        config: FlowConfig,
        observer: Arc<dyn ProgressObserver>,
        capture_screenshots: bool,
    ) -> Self {
        Self {
            driver,
            stealth,
            mail,
            config,
            observer,
            capture_screenshots,
        }
    }

    /// Run the flow to a terminal state. The session is released on every
    /// exit path of this method; a caller that cancels the future instead
    /// must release through the same guard.
    pub async fn run(&self, reservation: &ReservationConfig, guard: &SessionGuard) -> FlowOutcome {
        let result = self.run_steps(reservation, guard).await;

        let mut screenshot = None;
        if self.capture_screenshots {
            if let Some(session) = guard.current().await {
                screenshot = self.driver.screenshot(&session).await.ok();
            }
        }
        guard.release().await;

        let state = match result {
            Ok(()) => FlowState::Succeeded,
            Err(e) => FlowState::Failed(e.reason()),
        };
        self.step(&state);
        FlowOutcome { state, screenshot }
    }

    async fn run_steps(
        &self,
        reservation: &ReservationConfig,
        guard: &SessionGuard,
    ) -> Result<(), FlowError> {
        reservation
            .validate()
            .map_err(|e| FlowError::Validation(e.to_string()))?;

        self.step(&FlowState::Starting);
        let session = guard.open().await?;

        self.step(&FlowState::Navigating);
        self.driver
            .navigate(&session, &reservation.facility_url)
            .await?;
        self.stealth.prime_page(&session).await?;

        self.step(&FlowState::AwaitingPageReady);
        self.wait(&session, Readiness::DocumentReady, "page load").await?;
        self.stealth.human_scroll(&session).await?;

        self.step(&FlowState::SelectingSport);
        self.wait(
            &session,
            Readiness::Element(selectors::sport_tile(&reservation.sport)),
            "sport selection",
        )
        .await?;
        self.click_like_human(&session, &selectors::sport_tile(&reservation.sport))
            .await?;

        self.step(&FlowState::AwaitingGroupSizePage);
        self.wait(
            &session,
            Readiness::Element(selectors::group_size_input()),
            "group size page",
        )
        .await?;
        self.stealth.prime_page(&session).await?;

        self.step(&FlowState::FillingGroupSize);
        self.fill_field(
            &session,
            &selectors::group_size_input(),
            &reservation.participants.to_string(),
        )
        .await?;

        self.step(&FlowState::ConfirmingGroupSize);
        self.confirm_with_retry(&session, &selectors::next_button(), "group size confirmation")
            .await?;

        self.step(&FlowState::AwaitingTimeSelectionPage);
        self.wait(
            &session,
            Readiness::Element(selectors::slot_list()),
            "time selection page",
        )
        .await?;

        self.step(&FlowState::SelectingTimeSlot);
        self.select_time_slot(&session, reservation).await?;

        self.step(&FlowState::AwaitingContactPage);
        self.wait(
            &session,
            Readiness::Element(selectors::email_input()),
            "contact page",
        )
        .await?;
        self.stealth.prime_page(&session).await?;

        self.step(&FlowState::FillingContactInfo);
        self.fill_field(&session, &selectors::name_input(), &reservation.contact.full_name)
            .await?;
        self.fill_field(&session, &selectors::phone_input(), &reservation.contact.phone)
            .await?;
        self.fill_field(&session, &selectors::email_input(), &reservation.contact.email)
            .await?;

        self.step(&FlowState::ConfirmingContactInfo);
        self.confirm_with_retry(&session, &selectors::confirm_button(), "contact confirmation")
            .await?;

        // Let the post-submit page render before probing for the
        // verification signal.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        if self.verification_needed(&session).await? {
            self.enter_verification_code(&session).await?;
        }

        self.step(&FlowState::CheckingResult);
        self.check_result(&session).await
    }

    /// A dedicated code input, or page text asking for a code, means the
    /// site wants the emailed verification step.
    async fn verification_needed(&self, session: &Session) -> Result<bool, FlowError> {
        match self
            .driver
            .find_first(session, &selectors::verification_input())
            .await
        {
            Ok(_) => return Ok(true),
            Err(WebDriverError::ElementNotFound(_)) => {}
            Err(other) => return Err(other.into()),
        }
        let source = self.driver.page_source(session).await?;
        Ok(classify::verification_required(&source))
    }

    async fn enter_verification_code(&self, session: &Session) -> Result<(), FlowError> {
        self.step(&FlowState::AwaitingVerification);

        // Only mail received after this instant counts; the client
        // subtracts its clock-skew tolerance itself.
        let requested_at = Utc::now();
        let query = self.mail.verification_query(requested_at);

        let mut code = None;
        for attempt in 1..=self.config.verification_attempts {
            debug!(attempt, total = self.config.verification_attempts, "polling for verification mail");
            match self.mail.fetch_verification_code(&query).await {
                Ok(Some(found)) => {
                    code = Some(found);
                    break;
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "mail retrieval attempt failed"),
            }
            tokio::time::sleep(Duration::from_secs(self.config.verification_interval_seconds)).await;
        }

        let code = code.ok_or_else(|| {
            FlowError::Verification(format!(
                "no code received within {} attempts",
                self.config.verification_attempts
            ))
        })?;

        self.step(&FlowState::EnteringVerificationCode);
        self.fill_field(session, &selectors::verification_input(), &code)
            .await?;
        self.confirm_with_retry(session, &selectors::confirm_button(), "verification confirmation")
            .await
    }

    /// Walk the configured day/time preferences in order and click the
    /// first slot the page actually offers.
    async fn select_time_slot(
        &self,
        session: &Session,
        reservation: &ReservationConfig,
    ) -> Result<(), FlowError> {
        for pref in &reservation.slots {
            for time in &pref.times {
                let candidates = selectors::time_slot(&pref.day, time);
                match self.driver.find_first(session, &candidates).await {
                    Ok(_) => {
                        info!(day = %pref.day, time = %time, "slot available, selecting");
                        self.click_like_human(session, &candidates).await?;
                        return Ok(());
                    }
                    Err(WebDriverError::ElementNotFound(_)) => {
                        debug!(day = %pref.day, time = %time, "slot not offered");
                    }
                    Err(other) => return Err(other.into()),
                }
            }
        }
        Err(FlowError::Rejected("no configured time slot available".into()))
    }

    /// Bounded confirm/submit loop: after each click, an inline retry
    /// prompt invalidates the click and triggers another attempt.
    async fn confirm_with_retry(
        &self,
        session: &Session,
        candidates: &[Locator],
        what: &str,
    ) -> Result<(), FlowError> {
        for attempt in 1..=self.config.submit_retries {
            self.click_like_human(session, candidates).await?;
            tokio::time::sleep(Duration::from_millis(800)).await;

            let source = self.driver.page_source(session).await?;
            if !classify::needs_retry(&source) {
                return Ok(());
            }
            warn!(what, attempt, "inline retry prompt after click");
        }
        Err(FlowError::Rejected(format!(
            "{} still asked to retry after {} attempts",
            what, self.config.submit_retries
        )))
    }

    /// Locate, approach, and click: pointer path to the element, a
    /// human reaction pause, then the (fallback-capable) click.
    async fn click_like_human(
        &self,
        session: &Session,
        candidates: &[Locator],
    ) -> Result<(), FlowError> {
        let element = self.driver.find_first(session, candidates).await?;

        if let Some((x, y)) = self.element_center(session, &element).await {
            self.stealth.move_pointer(session, x, y).await?;
        } else {
            self.stealth.wander_pointer(session).await?;
        }
        self.stealth.approach_delay().await;

        self.driver.click(session, &element).await?;
        Ok(())
    }

    async fn element_center(&self, session: &Session, element: &ElementRef) -> Option<(f64, f64)> {
        let value = self
            .driver
            .execute(
                session,
                "const r = arguments[0].getBoundingClientRect(); \
                 return [r.x + r.width / 2, r.y + r.height / 2];",
                vec![element.as_arg()],
            )
            .await
            .ok()?;
        match value {
            Value::Array(items) if items.len() == 2 => {
                Some((items[0].as_f64()?, items[1].as_f64()?))
            }
            _ => None,
        }
    }

    /// Fill one field through the candidate list, with human typing
    /// unless instant-fill is configured.
    async fn fill_field(
        &self,
        session: &Session,
        candidates: &[Locator],
        value: &str,
    ) -> Result<(), FlowError> {
        let element = self.driver.find_first(session, candidates).await?;
        self.driver.click(session, &element).await?;
        self.driver.clear(session, &element).await?;

        if self.config.instant_fill {
            self.driver.send_keys(session, &element, value).await?;
        } else {
            self.stealth.human_type(session, &element, value).await?;
        }
        Ok(())
    }

    async fn check_result(&self, session: &Session) -> Result<(), FlowError> {
        // Give the site a moment to settle on its result page.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        let url = self.driver.current_url(session).await.unwrap_or_default();
        let source = self.driver.page_source(session).await?;
        debug!(%url, "classifying result page");

        match classify::classify_result(&source) {
            PageVerdict::Success => Ok(()),
            PageVerdict::Failure(reason) => Err(FlowError::Rejected(reason)),
            PageVerdict::Ambiguous => {
                let title = self.driver.title(session).await.unwrap_or_default();
                if self.config.assume_success_on_ambiguous {
                    warn!(%url, %title, "result page ambiguous, assuming success per configuration");
                    Ok(())
                } else {
                    Err(FlowError::Rejected(format!(
                        "result page could not be classified (title: {})",
                        title
                    )))
                }
            }
        }
    }

    async fn wait(
        &self,
        session: &Session,
        readiness: Readiness,
        what: &str,
    ) -> Result<(), FlowError> {
        wait_for(
            &self.driver,
            session,
            &readiness,
            Duration::from_secs(self.config.step_timeout_seconds),
            Duration::from_millis(self.config.poll_interval_ms),
            what,
        )
        .await
    }

    fn step(&self, state: &FlowState) {
        let description = state.describe();
        info!(step = %description, "flow step");
        self.observer.on_step(&description);
    }
}
