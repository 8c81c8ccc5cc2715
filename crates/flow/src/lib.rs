pub mod classify;
pub mod error;
pub mod flow;
pub mod readiness;
pub mod selectors;
pub mod state;

pub use error::FlowError;
pub use flow::{FlowOutcome, ReservationFlow};
pub use state::FlowState;
