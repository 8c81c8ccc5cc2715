use thiserror::Error;

use courtbot_mail::MailError;
use courtbot_webdriver::WebDriverError;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("{0}")]
    Driver(#[from] WebDriverError),

    #[error("{0}")]
    Mail(#[from] MailError),

    #[error("timed out waiting for {0}")]
    StepTimeout(String),

    #[error("verification not completed: {0}")]
    Verification(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("booking rejected: {0}")]
    Rejected(String),
}

impl FlowError {
    /// Human-readable failure reason for the terminal status.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
