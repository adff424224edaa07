//! Dialogue Manager module: executes a conversation turn against Telegram
//! and persists the resulting dialogue transition

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InputFile, MessageId};
use tracing::{debug, error, warn};

// Import localization
use crate::localization::t_lang;

// Import dialogue types
use crate::dialogue::ShopDialogue;

use crate::backend::SharedBackend;

use super::conversation::{handle_event, ChatAction, Inbound, Transition, Turn, TurnContext};

/// Where a turn's output goes
pub struct ReplyTarget<'a> {
    pub chat_id: ChatId,
    /// Message the pressed button belongs to
    pub message_id: Option<MessageId>,
    pub callback: Option<&'a CallbackQuery>,
    pub language_code: Option<&'a str>,
}

/// Load the dialogue state, run the conversation and apply the resulting turn
pub async fn run_turn(
    bot: &Bot,
    target: &ReplyTarget<'_>,
    dialogue: &ShopDialogue,
    backend: SharedBackend,
    ctx: &TurnContext,
    event: Inbound,
) -> Result<()> {
    let state = dialogue.get().await?.unwrap_or_default();
    let turn = handle_event(backend.as_ref(), ctx, state, event).await?;
    apply_turn(bot, target, dialogue, turn).await
}

/// Perform every action of the turn in order, then move the dialogue
pub async fn apply_turn(
    bot: &Bot,
    target: &ReplyTarget<'_>,
    dialogue: &ShopDialogue,
    turn: Turn,
) -> Result<()> {
    let mut answered = false;

    for action in turn.actions {
        match action {
            ChatAction::SendMessage { text, keyboard } => {
                let request = bot.send_message(target.chat_id, text);
                match keyboard {
                    Some(keyboard) => request.reply_markup(keyboard).await?,
                    None => request.await?,
                };
            }
            ChatAction::SendPhoto {
                image,
                caption,
                keyboard,
            } => {
                let request = bot
                    .send_photo(target.chat_id, InputFile::memory(image))
                    .caption(caption);
                match keyboard {
                    Some(keyboard) => request.reply_markup(keyboard).await?,
                    None => request.await?,
                };
            }
            ChatAction::EditText { text, keyboard } => {
                let Some(message_id) = target.message_id else {
                    warn!(chat_id = %target.chat_id, "No message to edit, sending instead");
                    let request = bot.send_message(target.chat_id, text);
                    match keyboard {
                        Some(keyboard) => request.reply_markup(keyboard).await?,
                        None => request.await?,
                    };
                    continue;
                };
                let request = bot.edit_message_text(target.chat_id, message_id, text);
                let result = match keyboard {
                    Some(keyboard) => request.reply_markup(keyboard).await,
                    None => request.await,
                };
                if let Err(e) = result {
                    warn!(chat_id = %target.chat_id, error = %e, "Failed to edit message text");
                }
            }
            ChatAction::EditKeyboard { keyboard } => {
                let Some(message_id) = target.message_id else {
                    continue;
                };
                if let Err(e) = bot
                    .edit_message_reply_markup(target.chat_id, message_id)
                    .reply_markup(keyboard)
                    .await
                {
                    warn!(chat_id = %target.chat_id, error = %e, "Failed to edit message keyboard");
                }
            }
            ChatAction::DeleteMessage => {
                let Some(message_id) = target.message_id else {
                    continue;
                };
                if let Err(e) = bot.delete_message(target.chat_id, message_id).await {
                    warn!(chat_id = %target.chat_id, error = %e, "Failed to delete message");
                }
            }
            ChatAction::AnswerCallback { text, alert } => {
                let Some(query) = target.callback else {
                    // Not a button press: show the acknowledgement as a message
                    if let Some(text) = text {
                        bot.send_message(target.chat_id, text).await?;
                    }
                    continue;
                };
                let mut request = bot.answer_callback_query(query.id.clone());
                if let Some(text) = text {
                    request = request.text(text).show_alert(alert);
                }
                request.await?;
                answered = true;
            }
        }
    }

    // Stop the client's loading spinner
    if let (Some(query), false) = (target.callback, answered) {
        if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
            debug!(error = %e, "Failed to answer callback query");
        }
    }

    match turn.transition {
        Transition::To(state) => dialogue.update(state).await?,
        Transition::End => dialogue.exit().await?,
    }

    Ok(())
}

/// Log a failed turn and show the generic apology on whichever channel is available
pub async fn report_turn_error(bot: &Bot, target: &ReplyTarget<'_>, err: &anyhow::Error) {
    error!(chat_id = %target.chat_id, error = ?err, "Failed to handle update");

    let text = t_lang("error-generic", target.language_code);
    let delivered = match target.callback {
        Some(query) => bot
            .answer_callback_query(query.id.clone())
            .text(text)
            .show_alert(true)
            .await
            .map(|_| ()),
        None => bot.send_message(target.chat_id, text).await.map(|_| ()),
    };

    if let Err(e) = delivered {
        error!(chat_id = %target.chat_id, error = %e, "Failed to deliver error message");
    }
}
