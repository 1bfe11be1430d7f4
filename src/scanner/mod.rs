//! Album directory scanning.

pub mod file_scanner;

pub use file_scanner::{list_images, sort_entries};
