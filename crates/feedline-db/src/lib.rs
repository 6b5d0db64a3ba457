//! Document repositories for Feedline.
//!
//! Provides repository traits and an in-memory implementation that can be
//! loaded from and saved to a JSON snapshot.

pub mod error;
pub mod memory;
pub mod repo;

pub use error::{DbError, DbResult};
pub use memory::{MemoryStore, Snapshot};
pub use repo::*;
