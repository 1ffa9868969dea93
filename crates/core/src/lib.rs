//! gitpulse core - pure domain logic with no terminal, filesystem or git dependencies
//!
//! This crate holds the status model and its classification rule, the ports
//! (interfaces) the probe and scanner talk through, the registry that ranks
//! repositories by urgency, and the command vocabulary the UI speaks. Git,
//! directory walking and the terminal are handled by adapters in the app crate.

pub mod domain;
pub mod ports;
pub mod app;
pub mod error;

// Re-exports for ergonomics
pub use domain::*;
pub use error::*;
