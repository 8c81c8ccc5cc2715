use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),
}

impl From<std::io::Error> for MailError {
    fn from(e: std::io::Error) -> Self {
        MailError::Transport(e.to_string())
    }
}
