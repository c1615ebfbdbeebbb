//! Utility functions

pub mod files;
pub mod language;
mod sanitize;
pub mod trash;

pub use files::{claim_unique_directory, move_dir_contents, move_file, mtime_micros};
pub use language::language_code;
pub use sanitize::{is_name_maybe_with_suffix, resource_file_ending, sanitize_filename};
pub use trash::{DirTrash, SystemTrash, Trash};
