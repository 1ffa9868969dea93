pub mod discovery;
pub mod git;
pub mod launcher;
pub mod persistence;
