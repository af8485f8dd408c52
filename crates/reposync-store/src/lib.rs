//! Local storage for mirrored repositories.
//!
//! [`ContentStore`] is the interface the sync engine writes through. [`FileStore`] is
//! the on-disk implementation: it keeps the last committed generation untouched while
//! a new one is assembled next to it, then swaps them with directory renames.

pub mod error;
pub mod file;
pub mod path;
pub mod store;

pub use error::{Result, StoreError};
pub use file::FileStore;
pub use store::ContentStore;
