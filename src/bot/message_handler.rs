//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use teloxide::prelude::*;
use tracing::debug;

use crate::backend::SharedBackend;
use crate::dialogue::ShopDialogue;

use super::conversation::{Inbound, TurnContext};
use super::dialogue_manager::{report_turn_error, run_turn, ReplyTarget};

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    backend: SharedBackend,
    dialogue: ShopDialogue,
) -> Result<()> {
    // Extract user's language code from Telegram
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_ref())
        .map(|s| s.as_str());

    let user_id = msg
        .from
        .as_ref()
        .map(|user| user.id.to_string())
        .unwrap_or_else(|| msg.chat.id.to_string());

    debug!(user_id = %user_id, has_text = msg.text().is_some(), "Received message from user");

    let target = ReplyTarget {
        chat_id: msg.chat.id,
        message_id: None,
        callback: None,
        language_code,
    };
    let ctx = TurnContext::new(user_id, language_code.map(str::to_string));

    let event = Inbound::from_text(msg.text());
    if let Err(e) = run_turn(&bot, &target, &dialogue, backend, &ctx, event).await {
        report_turn_error(&bot, &target, &e).await;
    }

    Ok(())
}
