//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::debug;

use crate::backend::SharedBackend;
use crate::dialogue::ShopDialogue;

use super::conversation::{Inbound, ShownMessage, TurnContext};
use super::dialogue_manager::{report_turn_error, run_turn, ReplyTarget};

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    backend: SharedBackend,
    dialogue: ShopDialogue,
) -> Result<()> {
    let data = q.data.clone().unwrap_or_default();
    debug!(user_id = %q.from.id, data = %data, "Received callback query from user");

    let language_code = q.from.language_code.as_deref();
    let shown = q
        .message
        .as_ref()
        .and_then(|message| message.regular_message())
        .map(|message| ShownMessage {
            text: message.text().or_else(|| message.caption()).map(str::to_string),
            keyboard: message.reply_markup().cloned(),
        });

    let target = ReplyTarget {
        chat_id: q
            .message
            .as_ref()
            .map(|message| message.chat().id)
            .unwrap_or_else(|| dialogue.chat_id()),
        message_id: q.message.as_ref().map(|message| message.id()),
        callback: Some(&q),
        language_code,
    };
    let ctx = TurnContext::new(q.from.id.to_string(), language_code.map(str::to_string));

    let event = Inbound::Callback { data, shown };
    if let Err(e) = run_turn(&bot, &target, &dialogue, backend, &ctx, event).await {
        report_turn_error(&bot, &target, &e).await;
    }

    Ok(())
}
