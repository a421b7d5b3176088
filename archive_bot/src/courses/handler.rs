use anyhow::Result;
use archive_core::pagination::{Pivot, page_limit};
use teloxide::{
    prelude::*,
    types::{FileId, InputFile, Message},
};

use crate::dependencies::BotDependencies;
use crate::keyboards::{COURSE_COLUMNS, paginate_buttons};

pub async fn handle_courses(bot: Bot, msg: Message, bot_deps: BotDependencies) -> Result<()> {
    let page = bot_deps
        .storage
        .courses_page(Pivot::Up, 0, page_limit(COURSE_COLUMNS))?;

    if page.is_empty() {
        bot.send_message(msg.chat.id, "There are no courses yet.")
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, "Please select a course:")
        .reply_markup(paginate_buttons(&page, COURSE_COLUMNS))
        .await?;
    Ok(())
}

/// Send a verified video with a caption that respects the uploader privacy setting.
pub async fn send_course_video(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    video_id: u64,
    bot_deps: &BotDependencies,
) -> Result<()> {
    let Some(details) = bot_deps.storage.video_details(video_id, true)? else {
        bot.send_message(chat_id, "Video not found!").await?;
        return Ok(());
    };

    let is_admin = bot_deps.storage.is_admin(user_id)?;
    bot.send_video(chat_id, InputFile::file_id(FileId(details.video_file_id.clone())))
        .caption(details.caption(bot_deps.privacy, is_admin))
        .await?;
    Ok(())
}

pub async fn handle_get_video(bot: Bot, msg: Message, video_id: u64, bot_deps: BotDependencies) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    send_course_video(&bot, msg.chat.id, user.id.0 as i64, video_id, &bot_deps).await
}
