use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Telegram user id, as stored everywhere else in the archive.
pub type UserId = i64;

/// What the bot expects next from a user in the middle of an upload.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UploadStage {
    AwaitingVideo,
    AwaitingSessionNumber,
    AwaitingSessionDate,
    AwaitingTopic,
    Complete,
}

/// A finished upload, ready to be stored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoSubmission {
    pub course_id: u64,
    pub uploader: UserId,
    pub video_file_id: String,
    pub session_number: u32,
    pub session_date: NaiveDate,
    pub topic: Option<String>,
    pub added_at: DateTime<Utc>,
}
