use anyhow::Result;
use archive_core::helpers::dto::{NewCourse, UploaderPrivacy};
use chrono::Utc;
use teloxide::{
    prelude::*,
    types::{CallbackQuery, FileId, InputFile, MaybeInaccessibleMessage, Message},
};

use crate::archive::storage::REVIEW_LIST_LIMIT;
use crate::dependencies::BotDependencies;
use crate::keyboards::review_buttons;

/// Admin commands are silently ignored for everyone else.
fn sender_is_admin(msg: &Message, bot_deps: &BotDependencies) -> Result<bool> {
    match msg.from.as_ref() {
        Some(user) => bot_deps.storage.is_admin(user.id.0 as i64),
        None => Ok(false),
    }
}

pub async fn handle_review_list(bot: Bot, msg: Message, bot_deps: BotDependencies) -> Result<()> {
    if !sender_is_admin(&msg, &bot_deps)? {
        return Ok(());
    }

    let pending = bot_deps.storage.unverified_videos(REVIEW_LIST_LIMIT)?;
    if pending.is_empty() {
        bot.send_message(msg.chat.id, "Nothing to review!").await?;
        return Ok(());
    }

    let text = pending
        .iter()
        .map(|video| video.review_line())
        .collect::<Vec<_>>()
        .join("\n");
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn handle_review_video(bot: Bot, msg: Message, video_id: u64, bot_deps: BotDependencies) -> Result<()> {
    if !sender_is_admin(&msg, &bot_deps)? {
        return Ok(());
    }

    let Some(details) = bot_deps.storage.video_details(video_id, false)? else {
        bot.send_message(msg.chat.id, "Video not found!").await?;
        return Ok(());
    };

    bot.send_video(msg.chat.id, InputFile::file_id(FileId(details.video_file_id.clone())))
        .caption(details.caption(UploaderPrivacy::All, true))
        .reply_markup(review_buttons(video_id))
        .await?;
    Ok(())
}

pub async fn handle_review_decision(
    bot: &Bot,
    query: &CallbackQuery,
    user_id: i64,
    video_id: u64,
    accepted: bool,
    bot_deps: &BotDependencies,
) -> Result<()> {
    // The review message may have been forwarded, so check again.
    if !bot_deps.storage.is_admin(user_id)? {
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    }

    let found = if accepted {
        bot_deps.storage.verify_video(video_id)?
    } else {
        bot_deps.storage.delete_video(video_id)?
    };
    log::info!(
        "Admin {} {} video {}",
        user_id,
        if accepted { "accepted" } else { "rejected" },
        video_id
    );

    bot.answer_callback_query(query.id.clone())
        .text(if found { "Done" } else { "Video not found!" })
        .await?;

    if let Some(MaybeInaccessibleMessage::Regular(message)) = &query.message {
        bot.delete_message(message.chat.id, message.id).await?;
    }
    Ok(())
}

pub async fn handle_db_dump(bot: Bot, msg: Message, bot_deps: BotDependencies) -> Result<()> {
    if !sender_is_admin(&msg, &bot_deps)? {
        return Ok(());
    }

    let dump = serde_json::to_vec_pretty(&bot_deps.storage.dump()?)?;
    let file_name = format!("archive_dump_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
    bot.send_document(msg.chat.id, InputFile::memory(dump).file_name(file_name))
        .await?;
    Ok(())
}

pub async fn handle_add_course(bot: Bot, msg: Message, args: String, bot_deps: BotDependencies) -> Result<()> {
    if !sender_is_admin(&msg, &bot_deps)? {
        return Ok(());
    }

    let new_course = match NewCourse::parse(&args) {
        Ok(course) => course,
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
            return Ok(());
        }
    };

    let course = bot_deps.storage.add_course(new_course)?;
    log::info!("Course {} added: {}", course.id, course.name);
    bot.send_message(msg.chat.id, format!("Course added:\n{}", course))
        .await?;
    Ok(())
}
