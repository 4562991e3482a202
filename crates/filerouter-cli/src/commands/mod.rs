pub mod catalog;
pub mod format;
pub mod repo;
pub mod types;
