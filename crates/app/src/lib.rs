//! gitpulse application library
//!
//! Adapters for git, the filesystem, the config file and the GUI launcher,
//! the probe scheduler, and the terminal UI. The binary in `main.rs` only
//! parses arguments and hands over to [`app::GitPulseApp`].

pub mod adapters;
pub mod app;
pub mod cli;
pub mod logging;
pub mod services;
pub mod tui;
