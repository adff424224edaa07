use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_bot::backend::{SharedBackend, StrapiClient};
use storefront_bot::bot;
use storefront_bot::config::BotConfig;
use storefront_bot::dialogue::ShopDialogueState;
use storefront_bot::localization::init_localization;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Storefront Telegram Bot");

    let config = BotConfig::from_env().context("Failed to load configuration")?;
    info!(backend_url = %config.backend_url, timeout = ?config.backend_timeout, "Configuration loaded");

    init_localization().context("Failed to initialize localization")?;

    let backend: SharedBackend = Arc::new(
        StrapiClient::from_config(&config).context("Failed to create backend client")?,
    );

    // Initialize the bot
    let bot = Bot::new(config.telegram_token.clone());

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<ShopDialogueState>, ShopDialogueState>()
                .endpoint(bot::message_handler),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<ShopDialogueState>, ShopDialogueState>()
                .endpoint(bot::callback_handler),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![
            InMemStorage::<ShopDialogueState>::new(),
            backend
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
