pub mod image_entry;

pub use image_entry::*;
