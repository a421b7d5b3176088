mod archive;
mod bot;
mod callbacks;
mod config;
mod courses;
mod dependencies;
mod keyboards;
mod review;
mod upload;

use std::sync::Arc;

use anyhow::Result;
use archive_core::cache::RecencyCache;
use archive_core::upload::UploadSessions;
use teloxide::prelude::*;

use crate::archive::{storage::ArchiveStorage, users::UserRegistry};
use crate::bot::handler_tree::handler_tree;
use crate::config::Config;
use crate::dependencies::BotDependencies;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    log::info!("Starting archive_bot...");

    if let Err(e) = run().await {
        log::error!("archive_bot stopped: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;

    let db = sled::open(&config.db_path)?;
    let storage = ArchiveStorage::new(&db)?;
    for admin in &config.admin_user_ids {
        storage.set_admin(*admin, true)?;
        log::info!("User {} is an admin", admin);
    }

    let cache = Arc::new(RecencyCache::new(config.user_cache_size)?);
    let uploads = Arc::new(UploadSessions::new());
    let sweeper = uploads.spawn_sweeper(config.sweeper.clone());

    let bot_deps = BotDependencies {
        storage: storage.clone(),
        users: UserRegistry::new(cache, storage.clone()),
        uploads,
        privacy: config.privacy,
    };

    let bot = Bot::from_env();
    let me = bot.get_me().await?;
    log::info!("Logged in as @{}", me.username());

    Dispatcher::builder(bot, handler_tree())
        .dependencies(dptree::deps![bot_deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    sweeper.shutdown().await;
    storage.flush().await?;
    log::info!("Clean shutdown");
    Ok(())
}
