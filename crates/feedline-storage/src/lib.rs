//! Completion-marker storage backends for Feedline.

pub mod directory;

pub use directory::DirectoryCompletionStore;
pub use feedline_core::storage::{CompletionMarker, CompletionStore};
