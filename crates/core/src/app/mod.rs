pub mod commands;
pub mod probe;
pub mod registry;

pub use commands::*;
pub use probe::*;
pub use registry::*;
