//! Callback query handlers for archive_bot.

use anyhow::Result;
use archive_core::pagination::{Pivot, page_limit};
use teloxide::{
    prelude::*,
    types::{CallbackQuery, InlineKeyboardMarkup, MaybeInaccessibleMessage},
};

use crate::courses::handler::send_course_video;
use crate::dependencies::BotDependencies;
use crate::keyboards::{COURSE_COLUMNS, VIDEO_COLUMNS, course_buttons, paginate_buttons};
use crate::review::handler::handle_review_decision;

/// Parsed inline button payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Course(u64),
    CoursesNext(u64),
    CoursesPrev(u64),
    Videos(u64),
    VideosNext { course_id: u64, session_number: u32 },
    VideosPrev { course_id: u64, session_number: u32 },
    Video(u64),
    Upload(u64),
    Review { video_id: u64, accepted: bool },
}

impl CallbackAction {
    pub fn data(&self) -> String {
        match self {
            CallbackAction::Course(id) => format!("course:{}", id),
            CallbackAction::CoursesNext(id) => format!("courses_next:{}", id),
            CallbackAction::CoursesPrev(id) => format!("courses_prev:{}", id),
            CallbackAction::Videos(course_id) => format!("videos:{}", course_id),
            CallbackAction::VideosNext {
                course_id,
                session_number,
            } => format!("videos_next:{}:{}", course_id, session_number),
            CallbackAction::VideosPrev {
                course_id,
                session_number,
            } => format!("videos_prev:{}:{}", course_id, session_number),
            CallbackAction::Video(id) => format!("video:{}", id),
            CallbackAction::Upload(course_id) => format!("upload:{}", course_id),
            CallbackAction::Review { video_id, accepted } => {
                format!("review:{}:{}", if *accepted { "y" } else { "n" }, video_id)
            }
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (kind, args) = data.split_once(':')?;
        let action = match kind {
            "course" => CallbackAction::Course(args.parse().ok()?),
            "courses_next" => CallbackAction::CoursesNext(args.parse().ok()?),
            "courses_prev" => CallbackAction::CoursesPrev(args.parse().ok()?),
            "videos" => CallbackAction::Videos(args.parse().ok()?),
            "videos_next" | "videos_prev" => {
                let (course_id, session_number) = args.split_once(':')?;
                let course_id = course_id.parse().ok()?;
                let session_number = session_number.parse().ok()?;
                if kind == "videos_next" {
                    CallbackAction::VideosNext {
                        course_id,
                        session_number,
                    }
                } else {
                    CallbackAction::VideosPrev {
                        course_id,
                        session_number,
                    }
                }
            }
            "video" => CallbackAction::Video(args.parse().ok()?),
            "upload" => CallbackAction::Upload(args.parse().ok()?),
            "review" => {
                let (verdict, video_id) = args.split_once(':')?;
                let accepted = match verdict {
                    "y" => true,
                    "n" => false,
                    _ => return None,
                };
                CallbackAction::Review {
                    video_id: video_id.parse().ok()?,
                    accepted,
                }
            }
            _ => return None,
        };
        Some(action)
    }
}

fn callback_chat_id(query: &CallbackQuery) -> ChatId {
    match &query.message {
        Some(MaybeInaccessibleMessage::Regular(message)) => message.chat.id,
        Some(MaybeInaccessibleMessage::Inaccessible(message)) => message.chat.id,
        None => ChatId(query.from.id.0 as i64),
    }
}

async fn replace_keyboard(bot: &Bot, query: &CallbackQuery, keyboard: InlineKeyboardMarkup) -> Result<()> {
    if let Some(MaybeInaccessibleMessage::Regular(message)) = &query.message {
        bot.edit_message_reply_markup(message.chat.id, message.id)
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

pub async fn handle_callback_query(bot: Bot, query: CallbackQuery, bot_deps: BotDependencies) -> Result<()> {
    let Some(data) = &query.data else {
        return Ok(());
    };
    let Some(action) = CallbackAction::parse(data) else {
        log::warn!("Unknown callback data: {}", data);
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    };

    let user_id = query.from.id.0 as i64;
    let chat_id = callback_chat_id(&query);

    match action {
        CallbackAction::Course(course_id) => {
            bot.answer_callback_query(query.id.clone()).await?;
            match bot_deps.storage.get_course(course_id)? {
                Some(course) => {
                    bot.send_message(chat_id, course.to_string())
                        .reply_markup(course_buttons(course.id))
                        .await?;
                }
                None => {
                    bot.send_message(chat_id, "Course not found!").await?;
                }
            }
        }
        CallbackAction::CoursesNext(last_id) | CallbackAction::CoursesPrev(last_id) => {
            bot.answer_callback_query(query.id.clone()).await?;
            let (pivot, id) = match action {
                CallbackAction::CoursesNext(_) => (Pivot::Up, last_id.saturating_add(1)),
                _ => (Pivot::Down, last_id.saturating_sub(1)),
            };
            let page = bot_deps
                .storage
                .courses_page(pivot, id, page_limit(COURSE_COLUMNS))?;
            if !page.is_empty() {
                replace_keyboard(&bot, &query, paginate_buttons(&page, COURSE_COLUMNS)).await?;
            }
        }
        CallbackAction::Videos(course_id) => {
            bot.answer_callback_query(query.id.clone()).await?;
            let page = bot_deps
                .storage
                .verified_videos_page(Pivot::Up, course_id, 0, page_limit(VIDEO_COLUMNS))?;
            if page.is_empty() {
                bot.send_message(chat_id, "No video is uploaded for this course :(")
                    .await?;
            } else {
                bot.send_message(chat_id, "Please select a session:")
                    .reply_markup(paginate_buttons(&page, VIDEO_COLUMNS))
                    .await?;
            }
        }
        CallbackAction::VideosNext {
            course_id,
            session_number,
        }
        | CallbackAction::VideosPrev {
            course_id,
            session_number,
        } => {
            bot.answer_callback_query(query.id.clone()).await?;
            let (pivot, session_number) = match action {
                CallbackAction::VideosNext { .. } => (Pivot::Up, session_number.saturating_add(1)),
                _ => (Pivot::Down, session_number.saturating_sub(1)),
            };
            let page = bot_deps.storage.verified_videos_page(
                pivot,
                course_id,
                session_number,
                page_limit(VIDEO_COLUMNS),
            )?;
            if !page.is_empty() {
                replace_keyboard(&bot, &query, paginate_buttons(&page, VIDEO_COLUMNS)).await?;
            }
        }
        CallbackAction::Video(video_id) => {
            bot.answer_callback_query(query.id.clone()).await?;
            send_course_video(&bot, chat_id, user_id, video_id, &bot_deps).await?;
        }
        CallbackAction::Upload(course_id) => {
            if bot_deps.storage.get_course(course_id)?.is_none() {
                bot.answer_callback_query(query.id.clone())
                    .text("Course not found!")
                    .await?;
                return Ok(());
            }

            bot_deps.uploads.start_session(course_id, user_id);
            log::info!("User {} started an upload for course {}", user_id, course_id);
            bot.answer_callback_query(query.id.clone()).await?;

            let suggested = bot_deps.storage.next_session_number(course_id)?;
            bot.send_message(
                chat_id,
                format!(
                    "Please send the video to bot\nThe next session is probably session {}.\nSend /cancel to stop.",
                    suggested
                ),
            )
            .await?;
        }
        CallbackAction::Review { video_id, accepted } => {
            handle_review_decision(&bot, &query, user_id, video_id, accepted, &bot_deps).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_data_formats() {
        assert_eq!(CallbackAction::Course(3).data(), "course:3");
        assert_eq!(CallbackAction::CoursesPrev(10).data(), "courses_prev:10");
        assert_eq!(
            CallbackAction::VideosNext {
                course_id: 2,
                session_number: 14
            }
            .data(),
            "videos_next:2:14"
        );
        assert_eq!(
            CallbackAction::Review {
                video_id: 8,
                accepted: false
            }
            .data(),
            "review:n:8"
        );
    }

    #[test]
    fn test_parse_reads_back_every_action() {
        let actions = [
            CallbackAction::Course(1),
            CallbackAction::CoursesNext(2),
            CallbackAction::CoursesPrev(3),
            CallbackAction::Videos(4),
            CallbackAction::VideosNext {
                course_id: 5,
                session_number: 6,
            },
            CallbackAction::VideosPrev {
                course_id: 7,
                session_number: 8,
            },
            CallbackAction::Video(9),
            CallbackAction::Upload(10),
            CallbackAction::Review {
                video_id: 11,
                accepted: true,
            },
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.data()), Some(action));
        }
    }

    #[test]
    fn test_parse_rejects_malformed_data() {
        assert_eq!(CallbackAction::parse("course"), None);
        assert_eq!(CallbackAction::parse("course:abc"), None);
        assert_eq!(CallbackAction::parse("videos_next:2"), None);
        assert_eq!(CallbackAction::parse("review:maybe:3"), None);
        assert_eq!(CallbackAction::parse("delete_file:3"), None);
    }
}
