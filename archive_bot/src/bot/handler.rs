use anyhow::Result as AnyResult;
use teloxide::{
    prelude::*,
    types::{KeyboardRemove, Message},
};

use crate::dependencies::BotDependencies;

const USER_HELP: &str = "These commands are supported:
/courses - browse the courses and their videos
/cancel - cancel the current upload
/help - display this text

To upload a video, pick a course from /courses and press \"Upload Video\".";

const ADMIN_HELP: &str = "Admin commands:
/review - list videos waiting for review
/review_<id> - review a single video
/add_course name;lecturer;group;code - add a course
/db_dump - get a backup of the database";

pub async fn handle_start(bot: Bot, msg: Message) -> AnyResult<()> {
    bot.send_message(
        msg.chat.id,
        "Welcome to the class video archive!\n\nUse /courses to find recorded sessions or to upload one.",
    )
    .await?;
    Ok(())
}

pub async fn handle_help(bot: Bot, msg: Message, bot_deps: BotDependencies) -> AnyResult<()> {
    let is_admin = match msg.from.as_ref() {
        Some(user) => bot_deps.storage.is_admin(user.id.0 as i64)?,
        None => false,
    };

    let text = if is_admin {
        format!("{}\n\n{}", USER_HELP, ADMIN_HELP)
    } else {
        USER_HELP.to_string()
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn handle_cancel(bot: Bot, msg: Message, bot_deps: BotDependencies) -> AnyResult<()> {
    if let Some(user) = msg.from.as_ref() {
        bot_deps.uploads.cancel(user.id.0 as i64);
    }
    bot.send_message(msg.chat.id, "Canceled!")
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}
