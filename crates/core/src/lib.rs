pub mod config;
pub mod error;
pub mod notify;
pub mod types;

pub use config::AppConfig;
pub use error::BookingError;
pub use notify::{BookingEvent, Notifier, ProgressObserver};
pub use types::*;
