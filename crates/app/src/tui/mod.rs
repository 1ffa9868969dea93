pub mod model;
pub mod terminal;
pub mod update;
pub mod view;

// Re-exports for convenience
pub use model::*;
pub use update::*;
pub use view::*;
