use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(
    rename_rule = "snake_case",
    description = "These commands are supported:"
)]
pub enum Command {
    #[command(description = "Show the welcome message.")]
    Start,
    #[command(description = "Display this text.")]
    Help,
    #[command(description = "Browse the list of courses.")]
    Courses,
    #[command(description = "Cancel the current upload.")]
    Cancel,
    #[command(description = "List videos waiting for review (admins only).")]
    Review,
    #[command(description = "Get a backup of the bot's database (admins only).")]
    DbDump,
    #[command(description = "Add a course: name;lecturer;group;code (admins only).")]
    AddCourse(String),
}

pub const REVIEW_VIDEO_PREFIX: &str = "/review_";
pub const GET_VIDEO_PREFIX: &str = "/get_video_";

/// Commands that carry a video id in their name, like `/review_12`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoCommand {
    Review(u64),
    GetVideo(u64),
}

impl VideoCommand {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.split_whitespace().next()?;
        // Drop a trailing @botname so group mentions work too.
        let text = text.split('@').next()?;

        if let Some(id) = text.strip_prefix(REVIEW_VIDEO_PREFIX) {
            return id.parse().ok().map(VideoCommand::Review);
        }
        if let Some(id) = text.strip_prefix(GET_VIDEO_PREFIX) {
            return id.parse().ok().map(VideoCommand::GetVideo);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static_commands() {
        assert_eq!(Command::parse("/courses", "archive_bot").unwrap(), Command::Courses);
        assert_eq!(Command::parse("/db_dump", "archive_bot").unwrap(), Command::DbDump);
        assert_eq!(
            Command::parse("/add_course Algorithms;Dr. Smith;2;4012", "archive_bot").unwrap(),
            Command::AddCourse("Algorithms;Dr. Smith;2;4012".to_string())
        );
        assert!(Command::parse("/review_12", "archive_bot").is_err());
    }

    #[test]
    fn test_parse_video_commands() {
        assert_eq!(VideoCommand::parse("/review_12"), Some(VideoCommand::Review(12)));
        assert_eq!(
            VideoCommand::parse("/get_video_7@archive_bot"),
            Some(VideoCommand::GetVideo(7))
        );
        assert_eq!(VideoCommand::parse("/review_abc"), None);
        assert_eq!(VideoCommand::parse("/review"), None);
        assert_eq!(VideoCommand::parse("hello"), None);
    }
}
