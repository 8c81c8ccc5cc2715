use thiserror::Error;

/// Umbrella error taxonomy shared across the workspace. Component crates
/// keep their own local enums and convert at the seam.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("verification not completed: {0}")]
    Verification(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
