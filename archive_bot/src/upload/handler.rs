use anyhow::Result;
use archive_core::ArchiveError;
use archive_core::upload::UploadStage;
use chrono::Utc;
use teloxide::{
    prelude::*,
    types::{KeyboardRemove, Message},
};

use crate::dependencies::BotDependencies;
use crate::keyboards::{no_topic_keyboard, today_keyboard};

async fn report_upload_error(bot: &Bot, chat_id: ChatId, error: ArchiveError) -> Result<()> {
    let text = match error {
        ArchiveError::ParseFailure(message) => message,
        ArchiveError::NoActiveSession => {
            "Your upload has expired. Please select a /courses entry again.".to_string()
        }
        ArchiveError::WrongStage { .. } => {
            "Unexpected input. Please follow the upload steps or send /cancel.".to_string()
        }
        ArchiveError::InvalidConfiguration(message) => {
            log::error!("Configuration error during upload: {}", message);
            "Something went wrong. Please try again later.".to_string()
        }
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

pub async fn handle_upload_video(bot: Bot, msg: Message, bot_deps: BotDependencies) -> Result<()> {
    let (Some(user), Some(video)) = (msg.from.as_ref(), msg.video()) else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    match bot_deps.uploads.set_video(user_id, video.file.id.0.clone()) {
        Ok(_) => {
            bot.send_message(msg.chat.id, "Now send the session number")
                .await?;
        }
        Err(ArchiveError::NoActiveSession) | Err(ArchiveError::WrongStage { .. }) => {
            bot.send_message(msg.chat.id, "Please select a /courses entry first")
                .await?;
        }
        Err(e) => report_upload_error(&bot, msg.chat.id, e).await?,
    }
    Ok(())
}

/// Route free text to the step the sender's upload is waiting for.
pub async fn handle_upload_text(bot: Bot, msg: Message, bot_deps: BotDependencies) -> Result<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    let today = Utc::now().date_naive();

    match bot_deps.uploads.submit_text(user_id, text, today) {
        // Text from users who are not uploading is not for us.
        Err(ArchiveError::NoActiveSession) => {}
        Err(e) => report_upload_error(&bot, msg.chat.id, e).await?,
        Ok(UploadStage::AwaitingVideo) => {
            bot.send_message(msg.chat.id, "Please send the video first, or /cancel")
                .await?;
        }
        Ok(UploadStage::AwaitingSessionNumber) => {
            bot.send_message(msg.chat.id, "Now send the session number")
                .await?;
        }
        Ok(UploadStage::AwaitingSessionDate) => {
            bot.send_message(
                msg.chat.id,
                "Now send the session date in format of YYYY-MM-DD",
            )
            .reply_markup(today_keyboard())
            .await?;
        }
        Ok(UploadStage::AwaitingTopic) => {
            bot.send_message(
                msg.chat.id,
                "Now send the topic of this session, or - if there is none",
            )
            .reply_markup(no_topic_keyboard())
            .await?;
        }
        Ok(UploadStage::Complete) => finish_upload(&bot, &msg, user_id, &bot_deps).await?,
    }
    Ok(())
}

async fn finish_upload(bot: &Bot, msg: &Message, user_id: i64, bot_deps: &BotDependencies) -> Result<()> {
    let submission = match bot_deps.uploads.extract_and_close(user_id) {
        Ok(submission) => submission,
        Err(e) => return report_upload_error(bot, msg.chat.id, e).await,
    };

    let (video_id, verified) = bot_deps.storage.add_video(&submission)?;
    log::info!(
        "User {} uploaded video {} for course {} (verified: {})",
        user_id,
        video_id,
        submission.course_id,
        verified
    );

    let text = if verified {
        "Video added to the archive. Thanks!"
    } else {
        "Thanks! Your video was submitted for review."
    };
    bot.send_message(msg.chat.id, text)
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}
