pub mod engine;
pub mod entropy;
pub mod script;

pub use engine::StealthEngine;
pub use entropy::Entropy;
