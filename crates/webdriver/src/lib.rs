pub mod client;
pub mod error;
pub mod locator;
pub mod session;

pub use client::{ElementRef, Session, WebDriverClient};
pub use error::WebDriverError;
pub use locator::Locator;
pub use session::SessionGuard;
