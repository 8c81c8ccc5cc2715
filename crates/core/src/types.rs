use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::BookingError;

/// One reservation target: which facility, which sport, how many people,
/// and which day/time slots to try, in preference order. Immutable once
/// handed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConfig {
    pub id: String,
    pub name: String,
    pub facility_url: String,
    pub sport: String,
    pub participants: u32,
    /// Ordered day -> time-slot preferences; first available wins.
    pub slots: Vec<SlotPreference>,
    pub contact: Contact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotPreference {
    pub day: String,
    pub times: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub full_name: String,
    pub phone: String,
    pub email: String,
}

impl ReservationConfig {
    /// Reject broken configurations before any network activity.
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.facility_url.trim().is_empty() {
            return Err(BookingError::Validation("facility URL is empty".into()));
        }
        if Url::parse(&self.facility_url).is_err() {
            return Err(BookingError::Validation(format!(
                "facility URL is not a valid URL: {}",
                self.facility_url
            )));
        }
        if self.sport.trim().is_empty() {
            return Err(BookingError::Validation("sport name is empty".into()));
        }
        if self.participants == 0 {
            return Err(BookingError::Validation("participant count is zero".into()));
        }
        if self.slots.is_empty() || self.slots.iter().all(|s| s.times.is_empty()) {
            return Err(BookingError::Validation("time-slot map is empty".into()));
        }
        Ok(())
    }
}

/// How a run was started. Labeling only, no effect on flow logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Manual,
    Automatic,
    Batch,
}

/// Current status of the latest run attempt for one reservation id.
/// Written only by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "reason")]
pub enum RunStatus {
    Idle,
    Running,
    Success,
    Failed(String),
    Stopped,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed(_) | RunStatus::Stopped)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed(reason) => write!(f, "failed: {}", reason),
            RunStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Mailbox credentials for verification-code retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailCredentials {
    pub address: String,
    pub secret: String,
    pub server: String,
    #[serde(default = "default_mail_port")]
    pub port: u16,
    /// Provider requires an application-specific credential (four
    /// space-separated groups of four) instead of the account password.
    #[serde(default)]
    pub app_password_provider: bool,
}

fn default_mail_port() -> u16 {
    143
}

impl MailCredentials {
    /// Fail fast on malformed credentials, before any socket is opened.
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.address.trim().is_empty() || !self.address.contains('@') {
            return Err(BookingError::Validation(format!(
                "mailbox address is not an email address: {}",
                self.address
            )));
        }
        if self.server.trim().is_empty() {
            return Err(BookingError::Validation("mail server is empty".into()));
        }
        if self.secret.is_empty() {
            return Err(BookingError::Validation("mailbox secret is empty".into()));
        }
        if self.app_password_provider && !is_app_password_format(&self.secret) {
            return Err(BookingError::Validation(
                "provider requires an app password (four space-separated groups of four)".into(),
            ));
        }
        Ok(())
    }
}

/// "abcd efgh ijkl mnop" style application credential.
fn is_app_password_format(secret: &str) -> bool {
    let groups: Vec<&str> = secret.split(' ').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| g.len() == 4 && g.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Point-in-time view of one reservation's run, as exposed to collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub id: String,
    pub status: RunStatus,
    /// Human-readable description of the step the flow is currently on.
    pub step: String,
    pub attempt_started: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReservationConfig {
        ReservationConfig {
            id: "club-1".into(),
            name: "Tuesday badminton".into(),
            facility_url: "https://booking.example.com/facility/12".into(),
            sport: "Badminton".into(),
            participants: 2,
            slots: vec![SlotPreference {
                day: "Tuesday".into(),
                times: vec!["8:30 AM".into()],
            }],
            contact: Contact {
                full_name: "A Person".into(),
                phone: "0612345678".into(),
                email: "a@example.com".into(),
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn empty_url_fails() {
        let mut c = config();
        c.facility_url = "".into();
        assert!(matches!(c.validate(), Err(BookingError::Validation(_))));
    }

    #[test]
    fn empty_sport_fails() {
        let mut c = config();
        c.sport = "  ".into();
        assert!(matches!(c.validate(), Err(BookingError::Validation(_))));
    }

    #[test]
    fn zero_participants_fails() {
        let mut c = config();
        c.participants = 0;
        assert!(matches!(c.validate(), Err(BookingError::Validation(_))));
    }

    #[test]
    fn empty_slots_fails() {
        let mut c = config();
        c.slots.clear();
        assert!(matches!(c.validate(), Err(BookingError::Validation(_))));
    }

    #[test]
    fn slots_without_times_fail() {
        let mut c = config();
        c.slots = vec![SlotPreference { day: "Tuesday".into(), times: vec![] }];
        assert!(matches!(c.validate(), Err(BookingError::Validation(_))));
    }

    fn creds(secret: &str, app: bool) -> MailCredentials {
        MailCredentials {
            address: "user@example.com".into(),
            secret: secret.into(),
            server: "mail.example.com".into(),
            port: 143,
            app_password_provider: app,
        }
    }

    #[test]
    fn app_password_format_enforced() {
        assert!(creds("abcd1234", true).validate().is_err());
        assert!(creds("abcd 1234 efgh 5678", true).validate().is_ok());
        // Plain providers accept anything non-empty
        assert!(creds("abcd1234", false).validate().is_ok());
    }

    #[test]
    fn status_terminality() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Failed("x".into()).is_terminal());
        assert!(RunStatus::Stopped.is_terminal());
    }
}
