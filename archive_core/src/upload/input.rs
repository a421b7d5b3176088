//! Parsing of the free-text answers a user sends during an upload.

use chrono::NaiveDate;

use crate::error::{ArchiveError, ArchiveResult};

/// Reply keyboard shortcut accepted instead of a date.
pub const TODAY_SHORTCUT: &str = "Today";
/// Topic answer meaning "this session has no topic".
pub const NO_TOPIC_SENTINEL: &str = "-";
pub const SESSION_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_session_number(text: &str) -> ArchiveResult<u32> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| ArchiveError::ParseFailure("cannot parse the session number!".to_string()))
}

pub fn parse_session_date(text: &str, today: NaiveDate) -> ArchiveResult<NaiveDate> {
    let text = text.trim();
    if text == TODAY_SHORTCUT {
        return Ok(today);
    }

    NaiveDate::parse_from_str(text, SESSION_DATE_FORMAT)
        .map_err(|_| ArchiveError::ParseFailure("cannot parse the date!".to_string()))
}

pub fn parse_topic(text: &str) -> Option<String> {
    let text = text.trim();
    if text == NO_TOPIC_SENTINEL || text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
