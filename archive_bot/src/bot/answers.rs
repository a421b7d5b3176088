use anyhow::Result;
use archive_core::helpers::bot_commands::{Command, VideoCommand};
use teloxide::{Bot, types::Message};

use super::handler::{handle_cancel, handle_help, handle_start};
use crate::courses::handler::{handle_courses, handle_get_video};
use crate::dependencies::BotDependencies;
use crate::review::handler::{
    handle_add_course, handle_db_dump, handle_review_list, handle_review_video,
};

pub async fn answers(bot: Bot, msg: Message, cmd: Command, bot_deps: BotDependencies) -> Result<()> {
    match cmd {
        Command::Start => handle_start(bot, msg).await?,
        Command::Help => handle_help(bot, msg, bot_deps).await?,
        Command::Courses => handle_courses(bot, msg, bot_deps).await?,
        Command::Cancel => handle_cancel(bot, msg, bot_deps).await?,
        Command::Review => handle_review_list(bot, msg, bot_deps).await?,
        Command::DbDump => handle_db_dump(bot, msg, bot_deps).await?,
        Command::AddCourse(args) => handle_add_course(bot, msg, args, bot_deps).await?,
    };
    Ok(())
}

pub async fn video_answers(bot: Bot, msg: Message, cmd: VideoCommand, bot_deps: BotDependencies) -> Result<()> {
    match cmd {
        VideoCommand::Review(video_id) => handle_review_video(bot, msg, video_id, bot_deps).await?,
        VideoCommand::GetVideo(video_id) => handle_get_video(bot, msg, video_id, bot_deps).await?,
    };
    Ok(())
}
