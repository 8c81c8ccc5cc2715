use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use courtbot_core::config::{FlowConfig, OrchestratorConfig};
use courtbot_core::notify::{BookingEvent, Notifier, ProgressObserver};
use courtbot_core::types::{ReservationConfig, RunStatus, RunType};
use courtbot_flow::{FlowState, ReservationFlow};
use courtbot_mail::MailClient;
use courtbot_stealth::StealthEngine;
use courtbot_webdriver::{SessionGuard, WebDriverClient};

use crate::pacing::ConnectionPacer;
use crate::status::StatusBoard;

/// Runs one reservation flow under an overall deadline, or many fully in
/// parallel, and owns the per-configuration status board. Clients are
/// injected; the orchestrator holds no hidden globals.
pub struct Orchestrator {
    driver: WebDriverClient,
    stealth: Arc<StealthEngine>,
    mail: Arc<MailClient>,
    flow_config: FlowConfig,
    config: OrchestratorConfig,
    board: Arc<StatusBoard>,
    notifier: Option<Arc<dyn Notifier>>,
    pacer: ConnectionPacer,
    stops: DashMap<String, CancellationToken>,
}

impl Orchestrator {
    pub fn new(
        driver: WebDriverClient,
        stealth: Arc<StealthEngine>,
        mail: Arc<MailClient>,
        flow_config: FlowConfig,
        config: OrchestratorConfig,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            driver,
            stealth,
            mail,
            flow_config,
            config,
            board: Arc::new(StatusBoard::new()),
            notifier,
            pacer: ConnectionPacer::new(),
            stops: DashMap::new(),
        }
    }

    pub fn board(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.board)
    }

    /// Request that the active run for this id stop. The run observes
    /// the request at its next suspension point, releases its session,
    /// and records `stopped`.
    pub fn stop(&self, id: &str) {
        if let Some(token) = self.stops.get(id) {
            info!(id, "stop requested");
            token.cancel();
        }
    }

    /// Run one reservation to completion, racing the flow against the
    /// overall deadline and any external stop request. The browser
    /// session is released exactly once no matter which side wins.
    pub async fn run_one(&self, reservation: &ReservationConfig, run_type: RunType) -> RunStatus {
        let attempt = Utc::now();
        info!(id = %reservation.id, name = %reservation.name, ?run_type, "run starting");

        if let Some(gap) = self.pacer.note() {
            debug!(gap_ms = gap.as_millis() as u64, "time since previous connection attempt");
        }

        let token = CancellationToken::new();
        self.stops.insert(reservation.id.clone(), token.clone());

        self.board
            .record(&reservation.id, attempt, RunStatus::Running);

        let observer = Arc::new(BoardObserver {
            board: Arc::clone(&self.board),
            id: reservation.id.clone(),
            attempt,
        });

        let flow = ReservationFlow::new(
            self.driver.clone(),
            Arc::clone(&self.stealth),
            Arc::clone(&self.mail),
            self.flow_config.clone(),
            observer,
            self.notifier.is_some(),
        );
        let guard = SessionGuard::new(self.driver.clone());
        let deadline = Duration::from_secs(self.config.overall_deadline_seconds);

        let (status, screenshot) = tokio::select! {
            outcome = flow.run(reservation, &guard) => {
                let status = match outcome.state {
                    FlowState::Succeeded => RunStatus::Success,
                    FlowState::Failed(reason) => RunStatus::Failed(reason),
                    other => RunStatus::Failed(format!("flow ended in {}", other)),
                };
                (status, outcome.screenshot)
            }
            _ = tokio::time::sleep(deadline) => {
                warn!(id = %reservation.id, deadline_s = deadline.as_secs(), "overall deadline hit");
                let screenshot = self.diagnostic_screenshot(&guard).await;
                guard.release().await;
                (RunStatus::Failed("timed out".into()), screenshot)
            }
            _ = token.cancelled() => {
                info!(id = %reservation.id, "run stopped by request");
                let screenshot = self.diagnostic_screenshot(&guard).await;
                guard.release().await;
                (RunStatus::Stopped, screenshot)
            }
        };
        // The flow releases on its own exit paths; after a lost race the
        // arms above already released. This is the exactly-once backstop.
        guard.release().await;

        self.board.record(&reservation.id, attempt, status.clone());
        self.stops.remove(&reservation.id);

        if let Some(notifier) = &self.notifier {
            let event = BookingEvent {
                reservation_id: reservation.id.clone(),
                reservation_name: reservation.name.clone(),
                status: status.clone(),
                screenshot,
            };
            if let Err(e) = notifier.notify(&event).await {
                warn!(id = %reservation.id, error = %e, "notification delivery failed");
            }
        }

        info!(id = %reservation.id, status = %status, "run finished");
        status
    }

    /// Run every configuration fully in parallel, one session per flow,
    /// with no concurrency cap. One member's failure never cancels the
    /// others; this method itself never fails — outcomes are recorded per
    /// configuration and returned.
    pub async fn run_batch(
        self: &Arc<Self>,
        reservations: &[ReservationConfig],
    ) -> Vec<(String, RunStatus)> {
        info!(count = reservations.len(), "batch starting");

        let mut handles = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            let this = Arc::clone(self);
            let reservation = reservation.clone();
            let id = reservation.id.clone();
            let handle =
                tokio::spawn(async move { this.run_one(&reservation, RunType::Batch).await });
            handles.push((id, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let status = match handle.await {
                Ok(status) => status,
                Err(e) => {
                    warn!(id = %id, error = %e, "batch member task died");
                    let status = RunStatus::Failed(format!("task failed: {}", e));
                    self.board.record(&id, Utc::now(), status.clone());
                    status
                }
            };
            results.push((id, status));
        }

        let failed = results
            .iter()
            .filter(|(_, s)| matches!(s, RunStatus::Failed(_)))
            .count();
        info!(total = results.len(), failed, "batch finished");
        results
    }

    /// Screenshot for the notification consumer when a run is cut short
    /// from outside the flow. Only taken when a consumer exists and the
    /// session is still alive.
    async fn diagnostic_screenshot(&self, guard: &SessionGuard) -> Option<Vec<u8>> {
        if self.notifier.is_none() {
            return None;
        }
        let session = guard.current().await?;
        self.driver.screenshot(&session).await.ok()
    }
}

/// Copies flow step descriptions onto the board under the attempt that
/// produced them, so stale attempts cannot scribble over newer ones.
struct BoardObserver {
    board: Arc<StatusBoard>,
    id: String,
    attempt: DateTime<Utc>,
}

impl ProgressObserver for BoardObserver {
    fn on_step(&self, step: &str) {
        self.board.record_step(&self.id, self.attempt, step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtbot_core::config::{MailConfig, StealthConfig, WebDriverConfig};
    use courtbot_core::types::{Contact, MailCredentials, SlotPreference};

    fn orchestrator() -> Arc<Orchestrator> {
        // Endpoint is never reached in these tests: validation fails first.
        let driver = WebDriverClient::new(WebDriverConfig {
            endpoint: "http://127.0.0.1:9".into(),
            request_timeout_seconds: 1,
            headless: true,
            window_width: 1280,
            window_height: 800,
        })
        .unwrap();
        let stealth = Arc::new(StealthEngine::new(driver.clone(), StealthConfig {
            seed: Some(1),
            ..StealthConfig::default()
        }));
        let mail = Arc::new(MailClient::new(
            MailCredentials {
                address: "user@example.com".into(),
                secret: "abcd 1234 efgh 5678".into(),
                server: "127.0.0.1".into(),
                port: 9,
                app_password_provider: true,
            },
            MailConfig {
                command_timeout_seconds: 1,
                handshake_timeout_seconds: 1,
                lookback_minutes: 15,
                clock_skew_seconds: 60,
                mailbox: "INBOX".into(),
                verification_sender: "noreply@booking.example".into(),
                verification_subject: "verification".into(),
            },
        ));
        Arc::new(Orchestrator::new(
            driver,
            stealth,
            mail,
            FlowConfig::default(),
            OrchestratorConfig { overall_deadline_seconds: 5 },
            None,
        ))
    }

    fn invalid_reservation(id: &str) -> ReservationConfig {
        ReservationConfig {
            id: id.into(),
            name: "broken".into(),
            facility_url: String::new(),
            sport: "Badminton".into(),
            participants: 2,
            slots: vec![SlotPreference { day: "Tuesday".into(), times: vec!["8:30 AM".into()] }],
            contact: Contact {
                full_name: "A Person".into(),
                phone: "0612345678".into(),
                email: "a@example.com".into(),
            },
        }
    }

    #[tokio::test]
    async fn invalid_config_fails_without_network() {
        let orch = orchestrator();
        let status = orch.run_one(&invalid_reservation("r1"), RunType::Manual).await;
        match status {
            RunStatus::Failed(reason) => assert!(reason.contains("validation"), "{}", reason),
            other => panic!("expected failed, got {:?}", other),
        }
        assert!(orch.board().get("r1").unwrap().status.is_terminal());
    }

    #[tokio::test]
    async fn batch_records_every_member_and_does_not_raise() {
        let orch = orchestrator();
        let reservations = vec![invalid_reservation("b1"), invalid_reservation("b2")];
        let results = orch.run_batch(&reservations).await;
        assert_eq!(results.len(), 2);
        for (id, status) in results {
            assert!(matches!(status, RunStatus::Failed(_)), "{} not failed", id);
            assert!(orch.board().get(&id).is_some());
        }
    }
}
