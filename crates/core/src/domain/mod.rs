pub mod repo;
pub mod report;

// Re-exports for convenience
pub use repo::*;
pub use report::*;
