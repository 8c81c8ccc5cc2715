pub mod client;
pub mod error;
pub mod extract;
pub mod protocol;

pub use client::{MailClient, MailQuery, MailState};
pub use error::MailError;
