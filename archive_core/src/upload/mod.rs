//! Per-user video upload workflow.

pub mod dto;
pub mod input;
pub mod sessions;
pub mod sweeper;

pub use dto::{UploadStage, UserId, VideoSubmission};
pub use sessions::UploadSessions;
pub use sweeper::{SessionSweeper, SweeperConfig};
