use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, ArchiveResult};
use crate::upload::UserId;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    /// Storage id, not the university course code.
    pub id: u64,
    pub name: String,
    pub lecturer: String,
    pub group_id: i64,
    pub code: i64,
}

impl std::fmt::Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\nLecturer: {}\nID: {}-{}",
            self.name, self.lecturer, self.code, self.group_id
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCourse {
    pub name: String,
    pub lecturer: String,
    pub group_id: i64,
    pub code: i64,
}

impl NewCourse {
    /// Parse `name;lecturer;group;code` as sent to `/add_course`.
    pub fn parse(args: &str) -> ArchiveResult<Self> {
        let usage = || {
            ArchiveError::ParseFailure(
                "Usage: /add_course name;lecturer;group;code".to_string(),
            )
        };

        let parts: Vec<&str> = args.split(';').map(str::trim).collect();
        let [name, lecturer, group_id, code] = parts.as_slice() else {
            return Err(usage());
        };
        if name.is_empty() || lecturer.is_empty() {
            return Err(usage());
        }

        Ok(Self {
            name: name.to_string(),
            lecturer: lecturer.to_string(),
            group_id: group_id.parse().map_err(|_| usage())?,
            code: code.parse().map_err(|_| usage())?,
        })
    }
}

/// Course as listed on the course browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CourseSummary {
    pub id: u64,
    pub name: String,
    pub group_id: i64,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            name: course.name.clone(),
            group_id: course.group_id,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: Option<String>,
    pub name: String,
    pub is_admin: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoRecord {
    pub id: u64,
    pub course_id: u64,
    pub video_file_id: String,
    pub session_number: u32,
    pub uploader: UserId,
    pub topic: Option<String>,
    pub session_date: NaiveDate,
    pub added_at: DateTime<Utc>,
    pub verified: bool,
}

/// Verified video as listed on a course's session browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoSessionSummary {
    pub id: u64,
    pub course_id: u64,
    pub session_number: u32,
}

/// How much of the uploader is revealed to non-admin viewers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UploaderPrivacy {
    #[default]
    All,
    NameOnly,
    None,
}

impl UploaderPrivacy {
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("name") => UploaderPrivacy::NameOnly,
            Some("none") => UploaderPrivacy::None,
            _ => UploaderPrivacy::All,
        }
    }
}

/// A video joined with its course and uploader, ready for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoDetails {
    pub video_id: u64,
    pub video_file_id: String,
    pub topic: Option<String>,
    pub session_number: u32,
    pub session_date: NaiveDate,
    pub added_at: DateTime<Utc>,
    pub uploader_name: String,
    pub uploader_username: Option<String>,
    /// Course name and group, e.g. `Algorithms G2`.
    pub course_name: String,
}

impl VideoDetails {
    fn username_suffix(&self) -> String {
        self.uploader_username
            .as_ref()
            .map(|u| format!("(@{})", u))
            .unwrap_or_default()
    }

    /// One entry of the `/review` list.
    pub fn review_line(&self) -> String {
        format!(
            "{}\nS{} at {}\nFrom: {} {}\n/review_{}\n",
            self.course_name,
            self.session_number,
            self.session_date,
            self.uploader_name,
            self.username_suffix(),
            self.video_id
        )
    }

    /// Caption sent along with the video. Admins always see the uploader.
    pub fn caption(&self, privacy: UploaderPrivacy, is_admin: bool) -> String {
        let mut caption = format!(
            "{}\nSession {} at {}\n",
            self.course_name, self.session_number, self.session_date
        );
        match (is_admin, privacy) {
            (true, _) | (false, UploaderPrivacy::All) => {
                caption.push_str(&format!(
                    "From: {} {}\n",
                    self.uploader_name,
                    self.username_suffix()
                ));
            }
            (false, UploaderPrivacy::NameOnly) => {
                caption.push_str(&format!("From: {}\n", self.uploader_name));
            }
            (false, UploaderPrivacy::None) => {}
        }
        caption.push_str(&format!(
            "Uploaded at {}\nTopic: {}",
            self.added_at.format("%Y-%m-%d %H:%M UTC"),
            self.topic.as_deref().unwrap_or("-")
        ));
        caption
    }
}
