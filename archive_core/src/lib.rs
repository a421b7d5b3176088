pub mod cache;
pub mod error;
pub mod helpers;
pub mod pagination;
pub mod upload;

pub use error::{ArchiveError, ArchiveResult};
