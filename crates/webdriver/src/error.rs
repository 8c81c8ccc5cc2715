use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebDriverError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

impl WebDriverError {
    /// Transport breakage and timeouts keep their identity; everything else
    /// is re-labeled for the operation that raised it.
    pub(crate) fn for_operation(self, relabel: fn(String) -> WebDriverError) -> WebDriverError {
        match self {
            WebDriverError::Transport(_) | WebDriverError::Timeout(_) => self,
            other => relabel(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for WebDriverError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WebDriverError::Timeout(e.to_string())
        } else {
            WebDriverError::Transport(e.to_string())
        }
    }
}
