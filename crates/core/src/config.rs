use serde::Deserialize;

use crate::types::{MailCredentials, ReservationConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub webdriver: WebDriverConfig,
    #[serde(default)]
    pub stealth: StealthConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    pub credentials: MailCredentials,
    #[serde(default)]
    pub reservations: Vec<ReservationConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebDriverConfig {
    /// Local automation endpoint, e.g. http://localhost:9515
    pub endpoint: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StealthConfig {
    /// Fixed RNG seed for reproducible interaction timing. None = real entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_key_delay_min")]
    pub key_delay_min_ms: u64,
    #[serde(default = "default_key_delay_max")]
    pub key_delay_max_ms: u64,
    /// Probability of a mid-sequence blur while typing.
    #[serde(default = "default_blur_probability")]
    pub blur_probability: f64,
    #[serde(default = "default_reaction_min")]
    pub reaction_min_ms: u64,
    #[serde(default = "default_reaction_max")]
    pub reaction_max_ms: u64,
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self {
            seed: None,
            key_delay_min_ms: default_key_delay_min(),
            key_delay_max_ms: default_key_delay_max(),
            blur_probability: default_blur_probability(),
            reaction_min_ms: default_reaction_min(),
            reaction_max_ms: default_reaction_max(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_seconds: u64,
    /// How far back a received mail is still considered relevant.
    /// Observed deployments used 5/15/30 minutes; configurable on purpose.
    #[serde(default = "default_lookback")]
    pub lookback_minutes: i64,
    /// Tolerance subtracted from the verification-requested timestamp.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_seconds: i64,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    /// Expected sender of verification mails.
    pub verification_sender: String,
    #[serde(default = "default_verification_subject")]
    pub verification_subject: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FlowConfig {
    #[serde(default = "default_step_timeout")]
    pub step_timeout_seconds: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_submit_retries")]
    pub submit_retries: u32,
    #[serde(default = "default_verification_attempts")]
    pub verification_attempts: u32,
    #[serde(default = "default_verification_interval")]
    pub verification_interval_seconds: u64,
    /// Set field values directly instead of simulating keystrokes.
    #[serde(default)]
    pub instant_fill: bool,
    /// When the post-submission page matches neither success nor failure
    /// signals, treat the booking as successful. High impact: a false
    /// positive means a missed court. Kept as an explicit default rather
    /// than silent behavior.
    #[serde(default = "default_true")]
    pub assume_success_on_ambiguous: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            step_timeout_seconds: default_step_timeout(),
            poll_interval_ms: default_poll_interval(),
            submit_retries: default_submit_retries(),
            verification_attempts: default_verification_attempts(),
            verification_interval_seconds: default_verification_interval(),
            instant_fill: false,
            assume_success_on_ambiguous: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrchestratorConfig {
    /// Overall deadline for one flow, racing against its natural completion.
    #[serde(default = "default_deadline")]
    pub overall_deadline_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { overall_deadline_seconds: default_deadline() }
    }
}

fn default_true() -> bool { true }
fn default_request_timeout() -> u64 { 30 }
fn default_window_width() -> u32 { 1920 }
fn default_window_height() -> u32 { 1080 }
fn default_key_delay_min() -> u64 { 60 }
fn default_key_delay_max() -> u64 { 180 }
fn default_blur_probability() -> f64 { 0.02 }
fn default_reaction_min() -> u64 { 250 }
fn default_reaction_max() -> u64 { 850 }
fn default_command_timeout() -> u64 { 10 }
fn default_handshake_timeout() -> u64 { 30 }
fn default_lookback() -> i64 { 15 }
fn default_clock_skew() -> i64 { 60 }
fn default_mailbox() -> String { "INBOX".into() }
fn default_verification_subject() -> String { "verification".into() }
fn default_step_timeout() -> u64 { 20 }
fn default_poll_interval() -> u64 { 500 }
fn default_submit_retries() -> u32 { 3 }
fn default_verification_attempts() -> u32 { 10 }
fn default_verification_interval() -> u64 { 15 }
fn default_deadline() -> u64 { 300 }
