//! Conversation state machine
//!
//! [`handle_event`] turns one inbound chat event into a [`Turn`]: the chat
//! actions to perform and the state the dialogue moves to. It talks to the
//! backend through the cart workflow but never to Telegram, so a whole turn
//! can be run against an in-memory backend.

use teloxide::types::InlineKeyboardMarkup;
use tracing::{debug, error, warn};

use crate::backend::CommerceBackend;
use crate::cart::{
    add_item, clear_cart, format_cart_for_display, get_or_create_cart, place_order, remove_item,
    CartError,
};
use crate::dialogue::{validate_email, Session, ShopDialogueState, DEFAULT_QUANTITY};
use crate::localization::{t_args_lang, t_lang};

use super::callback_data::CallbackAction;
use super::ui_builder::{
    create_cart_keyboard, create_menu_keyboard, create_product_keyboard, create_start_keyboard,
    format_product_caption,
};

/// An inbound chat event, already stripped of Telegram specifics
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The `/start` command
    Start,
    /// Any other slash command
    Command(String),
    /// Plain text
    Text(String),
    /// A button press on one of our messages
    Callback {
        data: String,
        shown: Option<ShownMessage>,
    },
    /// Stickers, photos and everything else we do not handle
    Unsupported,
}

impl Inbound {
    /// Classify the text of an incoming message
    pub fn from_text(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return Inbound::Unsupported;
        };
        let trimmed = text.trim();
        if trimmed.starts_with('/') {
            let command = trimmed.split_whitespace().next().unwrap_or_default();
            let command = command.split('@').next().unwrap_or_default();
            if command == "/start" {
                return Inbound::Start;
            }
            return Inbound::Command(command.to_string());
        }
        Inbound::Text(trimmed.to_string())
    }
}

/// What the message a button belongs to currently displays
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShownMessage {
    pub text: Option<String>,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

/// Who the turn is for
#[derive(Debug, Clone, PartialEq)]
pub struct TurnContext {
    pub user_id: String,
    pub language_code: Option<String>,
}

impl TurnContext {
    pub fn new(user_id: impl Into<String>, language_code: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            language_code,
        }
    }

    fn lang(&self) -> Option<&str> {
        self.language_code.as_deref()
    }
}

/// Outbound action. Edits and deletes target the message the button belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatAction {
    SendMessage {
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    SendPhoto {
        image: Vec<u8>,
        caption: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    EditText {
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    EditKeyboard {
        keyboard: InlineKeyboardMarkup,
    },
    DeleteMessage,
    AnswerCallback {
        text: Option<String>,
        alert: bool,
    },
}

impl ChatAction {
    fn message(text: String, keyboard: Option<InlineKeyboardMarkup>) -> Self {
        ChatAction::SendMessage { text, keyboard }
    }

    fn answer(text: String, alert: bool) -> Self {
        ChatAction::AnswerCallback {
            text: Some(text),
            alert,
        }
    }
}

/// Where the dialogue goes after the turn
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    To(ShopDialogueState),
    /// The conversation is over; only `/start` reopens it
    End,
}

/// Result of handling one inbound event
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub actions: Vec<ChatAction>,
    pub transition: Transition,
}

impl Turn {
    pub fn to(state: ShopDialogueState) -> Self {
        Self {
            actions: vec![],
            transition: Transition::To(state),
        }
    }

    pub fn end() -> Self {
        Self {
            actions: vec![],
            transition: Transition::End,
        }
    }

    fn main(session: Session) -> Self {
        Self::to(ShopDialogueState::Main { session })
    }

    pub fn with_action(mut self, action: ChatAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = ChatAction>) -> Self {
        self.actions.extend(actions);
        self
    }
}

/// Handle one inbound event for one conversation.
///
/// On error nothing has been sent yet and the caller keeps the previous state.
pub async fn handle_event(
    backend: &dyn CommerceBackend,
    ctx: &TurnContext,
    state: ShopDialogueState,
    event: Inbound,
) -> Result<Turn, CartError> {
    debug!(user_id = %ctx.user_id, event = ?event, "Handling conversation event");
    let lang = ctx.lang();

    match (state, event) {
        (_, Inbound::Start) => handle_start(backend, ctx).await,

        (ShopDialogueState::Start, Inbound::Callback { .. }) => {
            Ok(Turn::to(ShopDialogueState::Start)
                .with_action(ChatAction::answer(t_lang("start-hint", lang), false)))
        }
        (ShopDialogueState::Start, _) => Ok(Turn::to(ShopDialogueState::Start)
            .with_action(ChatAction::message(t_lang("start-hint", lang), None))),

        (ShopDialogueState::Main { session }, Inbound::Callback { data, shown })
        | (ShopDialogueState::AwaitingEmail { session }, Inbound::Callback { data, shown }) => {
            let action = CallbackAction::decode(&data);
            handle_callback(backend, ctx, session, action, shown.unwrap_or_default()).await
        }

        (ShopDialogueState::Main { session }, _) => Ok(Turn::main(session)
            .with_action(ChatAction::message(t_lang("unknown-command", lang), None))),

        (ShopDialogueState::AwaitingEmail { session }, Inbound::Text(text)) => {
            handle_email(backend, ctx, session, &text).await
        }
        (ShopDialogueState::AwaitingEmail { session }, _) => {
            Ok(Turn::to(ShopDialogueState::AwaitingEmail { session })
                .with_action(ChatAction::message(t_lang("email-prompt", lang), None)))
        }
    }
}

async fn handle_start(backend: &dyn CommerceBackend, ctx: &TurnContext) -> Result<Turn, CartError> {
    let products = backend.list_products().await?;
    let lang = ctx.lang();

    Ok(Turn::main(Session::with_products(products)).with_action(ChatAction::message(
        t_lang("welcome", lang),
        Some(create_start_keyboard(lang)),
    )))
}

async fn handle_callback(
    backend: &dyn CommerceBackend,
    ctx: &TurnContext,
    session: Session,
    action: CallbackAction,
    shown: ShownMessage,
) -> Result<Turn, CartError> {
    match action {
        CallbackAction::Back | CallbackAction::ShowProducts => show_menu(backend, ctx, session).await,
        CallbackAction::SelectProduct(product_id) => {
            show_product(backend, ctx, session, product_id).await
        }
        CallbackAction::Quantity(quantity) => Ok(select_quantity(ctx, session, quantity, &shown)),
        CallbackAction::AddToCart(product_id) => {
            add_to_cart(backend, ctx, session, product_id).await
        }
        CallbackAction::MyCart => show_cart(backend, ctx, session, &shown).await,
        CallbackAction::Remove(cart_item_id) => {
            remove_from_cart(backend, ctx, session, cart_item_id, &shown).await
        }
        CallbackAction::Pay => start_checkout(backend, ctx, session).await,
        CallbackAction::Unknown(raw) => {
            debug!(user_id = %ctx.user_id, payload = %raw, "Unknown callback payload");
            Ok(Turn::main(session)
                .with_action(ChatAction::answer(t_lang("unknown-command", ctx.lang()), true)))
        }
    }
}

async fn show_menu(
    backend: &dyn CommerceBackend,
    ctx: &TurnContext,
    mut session: Session,
) -> Result<Turn, CartError> {
    let lang = ctx.lang();
    let products = backend.list_products().await?;
    let cart = backend.cart_with_items(&ctx.user_id).await?;
    let cart_count = format_cart_for_display(cart.as_ref(), lang).count;

    session.replace_products(products);
    let keyboard = create_menu_keyboard(&session.products, cart_count, lang);

    Ok(Turn::main(session).with_actions([
        ChatAction::DeleteMessage,
        ChatAction::message(t_lang("menu-title", lang), Some(keyboard)),
    ]))
}

async fn show_product(
    backend: &dyn CommerceBackend,
    ctx: &TurnContext,
    mut session: Session,
    product_id: i64,
) -> Result<Turn, CartError> {
    let lang = ctx.lang();
    if session.product(product_id).is_none() {
        session.replace_products(backend.list_products().await?);
    }
    let Some(product) = session.product(product_id).cloned() else {
        warn!(user_id = %ctx.user_id, product_id, "Selected product no longer exists");
        return Ok(Turn::main(session)
            .with_action(ChatAction::answer(t_lang("product-not-found", lang), true)));
    };

    let image = match product.image_path() {
        Some(path) => Some(backend.fetch_image(path).await?),
        None => None,
    };

    session.product_id = Some(product.id);
    session.quantity = DEFAULT_QUANTITY;

    let caption = format_product_caption(&product, lang);
    let keyboard = Some(create_product_keyboard(product.id, session.quantity, lang));
    let detail = match image {
        Some(image) => ChatAction::SendPhoto {
            image,
            caption,
            keyboard,
        },
        None => ChatAction::message(caption, keyboard),
    };

    Ok(Turn::main(session).with_actions([ChatAction::DeleteMessage, detail]))
}

fn select_quantity(
    ctx: &TurnContext,
    mut session: Session,
    quantity: u32,
    shown: &ShownMessage,
) -> Turn {
    let lang = ctx.lang();
    session.quantity = quantity;

    let answer = ChatAction::answer(
        t_args_lang(
            "quantity-selected",
            &[("quantity", &quantity.to_string())],
            lang,
        ),
        false,
    );

    let refresh = session.product_id.and_then(|product_id| {
        let keyboard = create_product_keyboard(product_id, quantity, lang);
        (shown.keyboard.as_ref() != Some(&keyboard)).then_some(ChatAction::EditKeyboard { keyboard })
    });

    Turn::main(session).with_action(answer).with_actions(refresh)
}

async fn add_to_cart(
    backend: &dyn CommerceBackend,
    ctx: &TurnContext,
    session: Session,
    product_id: i64,
) -> Result<Turn, CartError> {
    let quantity = session.quantity;
    get_or_create_cart(backend, &ctx.user_id).await?;
    add_item(backend, &ctx.user_id, product_id, quantity).await?;

    let text = t_args_lang(
        "added-to-cart",
        &[("quantity", &quantity.to_string())],
        ctx.lang(),
    );
    Ok(Turn::main(session).with_action(ChatAction::answer(text, true)))
}

/// Edit the shown message unless it already displays exactly this content
fn edit_if_changed(
    shown: &ShownMessage,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> Option<ChatAction> {
    // Telegram trims surrounding whitespace from message text
    let same_text = shown.text.as_deref().map(str::trim) == Some(text.trim());
    let same_keyboard = shown.keyboard.as_ref() == Some(&keyboard);
    if same_text && same_keyboard {
        return None;
    }
    Some(ChatAction::EditText {
        text,
        keyboard: Some(keyboard),
    })
}

async fn show_cart(
    backend: &dyn CommerceBackend,
    ctx: &TurnContext,
    session: Session,
    shown: &ShownMessage,
) -> Result<Turn, CartError> {
    let lang = ctx.lang();
    let cart = backend.cart_with_items(&ctx.user_id).await?;
    let summary = format_cart_for_display(cart.as_ref(), lang);
    let keyboard = create_cart_keyboard(cart.as_ref(), lang);

    Ok(Turn::main(session).with_actions(edit_if_changed(shown, summary.text, keyboard)))
}

async fn remove_from_cart(
    backend: &dyn CommerceBackend,
    ctx: &TurnContext,
    mut session: Session,
    cart_item_id: i64,
    shown: &ShownMessage,
) -> Result<Turn, CartError> {
    let lang = ctx.lang();
    session.cart_item_id = Some(cart_item_id);
    remove_item(backend, cart_item_id).await?;

    let cart = backend.cart_with_items(&ctx.user_id).await?;
    let summary = format_cart_for_display(cart.as_ref(), lang);
    let keyboard = create_cart_keyboard(cart.as_ref(), lang);

    Ok(Turn::main(session)
        .with_actions(edit_if_changed(shown, summary.text, keyboard))
        .with_action(ChatAction::answer(t_lang("item-removed", lang), false)))
}

async fn start_checkout(
    backend: &dyn CommerceBackend,
    ctx: &TurnContext,
    session: Session,
) -> Result<Turn, CartError> {
    let lang = ctx.lang();
    let cart = backend.cart_with_items(&ctx.user_id).await?;
    if cart.as_ref().map_or(true, |cart| cart.is_empty()) {
        return Ok(Turn::main(session).with_action(ChatAction::answer(t_lang("cart-empty", lang), true)));
    }

    Ok(Turn::to(ShopDialogueState::AwaitingEmail { session })
        .with_action(ChatAction::message(t_lang("email-prompt", lang), None)))
}

async fn handle_email(
    backend: &dyn CommerceBackend,
    ctx: &TurnContext,
    session: Session,
    input: &str,
) -> Result<Turn, CartError> {
    let lang = ctx.lang();
    let email = match validate_email(input) {
        Ok(email) => email,
        Err(reason) => {
            debug!(user_id = %ctx.user_id, reason, "Rejected email");
            return Ok(Turn::to(ShopDialogueState::AwaitingEmail { session })
                .with_action(ChatAction::message(t_lang("email-invalid", lang), None)));
        }
    };

    let placed = match backend.cart_with_items(&ctx.user_id).await? {
        Some(snapshot) => place_order(backend, &ctx.user_id, &email, &snapshot).await,
        None => Err(CartError::EmptyCart),
    };

    match placed {
        Ok(order) => {
            if let Err(e) = clear_cart(backend, &ctx.user_id).await {
                warn!(user_id = %ctx.user_id, order_id = order.id, error = %e, "Order placed but cart not cleared");
            }
            Ok(Turn::end().with_action(ChatAction::message(t_lang("order-success", lang), None)))
        }
        Err(CartError::EmptyCart) => {
            Ok(Turn::main(session).with_action(ChatAction::message(t_lang("cart-empty", lang), None)))
        }
        Err(e @ CartError::OrderIncomplete { .. }) => {
            error!(user_id = %ctx.user_id, error = %e, "Checkout failed");
            Ok(Turn::main(session).with_action(ChatAction::message(t_lang("order-failed", lang), None)))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_from_text() {
        assert_eq!(Inbound::from_text(Some("/start")), Inbound::Start);
        assert_eq!(Inbound::from_text(Some("/start promo")), Inbound::Start);
        assert_eq!(Inbound::from_text(Some("/start@fish_bot")), Inbound::Start);
        assert_eq!(
            Inbound::from_text(Some("/help")),
            Inbound::Command("/help".to_string())
        );
        assert_eq!(
            Inbound::from_text(Some("  a@b.co ")),
            Inbound::Text("a@b.co".to_string())
        );
        assert_eq!(Inbound::from_text(None), Inbound::Unsupported);
    }

    #[test]
    fn test_edit_suppressed_when_unchanged() {
        let keyboard = create_cart_keyboard(None, Some("en"));
        let shown = ShownMessage {
            text: Some("🛒 Your cart is empty".to_string()),
            keyboard: Some(keyboard.clone()),
        };
        assert!(edit_if_changed(&shown, "🛒 Your cart is empty".to_string(), keyboard.clone()).is_none());
        assert!(edit_if_changed(&shown, "other".to_string(), keyboard).is_some());
    }
}
