use anyhow::Result;
use archive_core::helpers::bot_commands::{Command, VideoCommand};
use teloxide::{
    dispatching::{DpHandlerDescription, HandlerExt, UpdateFilterExt},
    dptree::{self, Handler},
    types::{CallbackQuery, Message, Update},
};

use crate::{
    bot::answers::{answers, video_answers},
    callbacks::handle_callback_query,
    dependencies::BotDependencies,
    upload::handler::{handle_upload_text, handle_upload_video},
};

pub fn handler_tree() -> Handler<'static, Result<()>, DpHandlerDescription> {
    dptree::entry()
        .branch(
            Update::filter_message()
                // Keep the users tree current for every sender (passthrough)
                .inspect(|bot_deps: BotDependencies, msg: Message| {
                    if let Some(user) = msg.from.as_ref() {
                        if let Err(e) = bot_deps.users.register(user) {
                            log::error!("Failed to register user {}: {}", user.id.0, e);
                        }
                    }
                })
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(answers),
                )
                .branch(
                    // `/review_<id>` and `/get_video_<id>`
                    dptree::filter_map(|msg: Message| msg.text().and_then(VideoCommand::parse))
                        .endpoint(video_answers),
                )
                .branch(
                    dptree::entry()
                        .filter(|msg: Message| msg.video().is_some())
                        .endpoint(handle_upload_video),
                )
                .branch(
                    dptree::entry()
                        .filter(|msg: Message| {
                            msg.text().is_some_and(|text| !text.starts_with('/'))
                        })
                        .endpoint(handle_upload_text),
                ),
        )
        .branch(
            Update::filter_callback_query()
                .inspect(|bot_deps: BotDependencies, query: CallbackQuery| {
                    if let Err(e) = bot_deps.users.register(&query.from) {
                        log::error!("Failed to register user {}: {}", query.from.id.0, e);
                    }
                })
                .endpoint(handle_callback_query),
        )
}
