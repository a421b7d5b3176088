//! In-memory map of users who are in the middle of uploading a video.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::error::{ArchiveError, ArchiveResult};
use crate::upload::dto::{UploadStage, UserId, VideoSubmission};
use crate::upload::input::{parse_session_date, parse_session_number, parse_topic};
use crate::upload::sweeper::{SessionSweeper, SweeperConfig};

/// Answers collected so far. Each variant holds exactly what its stage has seen.
#[derive(Clone, Debug)]
enum Progress {
    AwaitingVideo,
    AwaitingSessionNumber {
        video_file_id: String,
    },
    AwaitingSessionDate {
        video_file_id: String,
        session_number: u32,
    },
    AwaitingTopic {
        video_file_id: String,
        session_number: u32,
        session_date: NaiveDate,
    },
    Complete {
        video_file_id: String,
        session_number: u32,
        session_date: NaiveDate,
        topic: Option<String>,
    },
}

enum Answer {
    Video(String),
    SessionNumber(u32),
    SessionDate(NaiveDate),
    Topic(Option<String>),
}

impl Answer {
    fn stage(&self) -> UploadStage {
        match self {
            Answer::Video(_) => UploadStage::AwaitingVideo,
            Answer::SessionNumber(_) => UploadStage::AwaitingSessionNumber,
            Answer::SessionDate(_) => UploadStage::AwaitingSessionDate,
            Answer::Topic(_) => UploadStage::AwaitingTopic,
        }
    }
}

impl Progress {
    fn stage(&self) -> UploadStage {
        match self {
            Progress::AwaitingVideo => UploadStage::AwaitingVideo,
            Progress::AwaitingSessionNumber { .. } => UploadStage::AwaitingSessionNumber,
            Progress::AwaitingSessionDate { .. } => UploadStage::AwaitingSessionDate,
            Progress::AwaitingTopic { .. } => UploadStage::AwaitingTopic,
            Progress::Complete { .. } => UploadStage::Complete,
        }
    }

    /// The next progress, or `Err` with `self` unchanged when the answer is for another stage.
    fn accept(self, answer: Answer) -> Result<Progress, Progress> {
        match (self, answer) {
            (Progress::AwaitingVideo, Answer::Video(video_file_id)) => {
                Ok(Progress::AwaitingSessionNumber { video_file_id })
            }
            (Progress::AwaitingSessionNumber { video_file_id }, Answer::SessionNumber(session_number)) => {
                Ok(Progress::AwaitingSessionDate {
                    video_file_id,
                    session_number,
                })
            }
            (
                Progress::AwaitingSessionDate {
                    video_file_id,
                    session_number,
                },
                Answer::SessionDate(session_date),
            ) => Ok(Progress::AwaitingTopic {
                video_file_id,
                session_number,
                session_date,
            }),
            (
                Progress::AwaitingTopic {
                    video_file_id,
                    session_number,
                    session_date,
                },
                Answer::Topic(topic),
            ) => Ok(Progress::Complete {
                video_file_id,
                session_number,
                session_date,
                topic,
            }),
            (progress, _) => Err(progress),
        }
    }
}

#[derive(Clone, Debug)]
struct UploadSession {
    created_at: DateTime<Utc>,
    course_id: u64,
    progress: Progress,
}

/// Upload sessions keyed by user.
///
/// Every operation runs while holding the lock of the user's entry, so a stage
/// check and the write that advances past it can never interleave with another
/// call for the same user.
#[derive(Default)]
pub struct UploadSessions {
    sessions: DashMap<UserId, UploadSession>,
}

impl UploadSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new upload for `course_id`, discarding any previous session of the user.
    pub fn start_session(&self, course_id: u64, user_id: UserId) {
        self.start_session_at(course_id, user_id, Utc::now());
    }

    pub(crate) fn start_session_at(&self, course_id: u64, user_id: UserId, created_at: DateTime<Utc>) {
        self.sessions.insert(
            user_id,
            UploadSession {
                created_at,
                course_id,
                progress: Progress::AwaitingVideo,
            },
        );
    }

    pub fn set_video(&self, user_id: UserId, video_file_id: String) -> ArchiveResult<UploadStage> {
        self.advance(user_id, Answer::Video(video_file_id))
    }

    pub fn set_session_number(&self, user_id: UserId, session_number: u32) -> ArchiveResult<UploadStage> {
        self.advance(user_id, Answer::SessionNumber(session_number))
    }

    pub fn set_session_date(&self, user_id: UserId, session_date: NaiveDate) -> ArchiveResult<UploadStage> {
        self.advance(user_id, Answer::SessionDate(session_date))
    }

    pub fn set_topic(&self, user_id: UserId, topic: Option<String>) -> ArchiveResult<UploadStage> {
        self.advance(user_id, Answer::Topic(topic))
    }

    /// Parse a text answer for the step the user's session is waiting on and apply it.
    ///
    /// Text is not consumed while the session waits for the video or is already
    /// complete; the current stage is returned unchanged. A [`ArchiveError::ParseFailure`]
    /// leaves the session as it was.
    pub fn submit_text(&self, user_id: UserId, text: &str, today: NaiveDate) -> ArchiveResult<UploadStage> {
        match self.stage(user_id)? {
            UploadStage::AwaitingSessionNumber => {
                self.set_session_number(user_id, parse_session_number(text)?)
            }
            UploadStage::AwaitingSessionDate => {
                self.set_session_date(user_id, parse_session_date(text, today)?)
            }
            UploadStage::AwaitingTopic => self.set_topic(user_id, parse_topic(text)),
            stage @ (UploadStage::AwaitingVideo | UploadStage::Complete) => Ok(stage),
        }
    }

    pub fn stage(&self, user_id: UserId) -> ArchiveResult<UploadStage> {
        self.sessions
            .get(&user_id)
            .map(|session| session.progress.stage())
            .ok_or(ArchiveError::NoActiveSession)
    }

    #[cfg(test)]
    pub(crate) fn course_id(&self, user_id: UserId) -> ArchiveResult<u64> {
        self.sessions
            .get(&user_id)
            .map(|session| session.course_id)
            .ok_or(ArchiveError::NoActiveSession)
    }

    /// Remove a completed session and turn it into a submission.
    ///
    /// Sessions that have not reached [`UploadStage::Complete`] are left in
    /// place and reported as [`ArchiveError::WrongStage`].
    pub fn extract_and_close(&self, user_id: UserId) -> ArchiveResult<VideoSubmission> {
        let Entry::Occupied(mut entry) = self.sessions.entry(user_id) else {
            return Err(ArchiveError::NoActiveSession);
        };

        let session = entry.get_mut();
        let course_id = session.course_id;
        match std::mem::replace(&mut session.progress, Progress::AwaitingVideo) {
            Progress::Complete {
                video_file_id,
                session_number,
                session_date,
                topic,
            } => {
                entry.remove();
                Ok(VideoSubmission {
                    course_id,
                    uploader: user_id,
                    video_file_id,
                    session_number,
                    session_date,
                    topic,
                    added_at: Utc::now(),
                })
            }
            progress => {
                let actual = progress.stage();
                session.progress = progress;
                Err(ArchiveError::WrongStage {
                    expected: UploadStage::Complete,
                    actual,
                })
            }
        }
    }

    /// Drop the user's session if there is one.
    pub fn cancel(&self, user_id: UserId) {
        self.sessions.remove(&user_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove every session older than `max_age` as seen from `now`.
    ///
    /// Returns how many sessions were removed.
    pub fn sweep_expired(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| {
            // A creation time in the future yields a negative age, which never expires.
            (now - session.created_at)
                .to_std()
                .map(|age| age <= max_age)
                .unwrap_or(true)
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Start the background task that evicts stale sessions.
    pub fn spawn_sweeper(self: &Arc<Self>, config: SweeperConfig) -> SessionSweeper {
        SessionSweeper::spawn(self.clone(), config)
    }

    fn advance(&self, user_id: UserId, answer: Answer) -> ArchiveResult<UploadStage> {
        let mut session = self
            .sessions
            .get_mut(&user_id)
            .ok_or(ArchiveError::NoActiveSession)?;

        let expected = answer.stage();
        let progress = std::mem::replace(&mut session.progress, Progress::AwaitingVideo);
        match progress.accept(answer) {
            Ok(next) => {
                session.progress = next;
                Ok(session.progress.stage())
            }
            Err(unchanged) => {
                let actual = unchanged.stage();
                session.progress = unchanged;
                Err(ArchiveError::WrongStage { expected, actual })
            }
        }
    }
}
