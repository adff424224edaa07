//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

// Import localization
use crate::localization::{t_args_lang, t_lang};

use crate::dialogue::QUANTITY_CHOICES;
use crate::models::{format_amount, Cart, Product};

use super::callback_data::CallbackAction;

/// Telegram's limit for photo captions, in characters
pub const MAX_CAPTION_CHARS: usize = 1024;

fn button(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), action.to_string())
}

/// Keyboard attached to the greeting
pub fn create_start_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        t_lang("start-button", language_code),
        CallbackAction::ShowProducts,
    )]])
}

/// One row per product, then the cart entry with its item count
pub fn create_menu_keyboard<'a>(
    products: impl IntoIterator<Item = &'a Product>,
    cart_count: usize,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = products
        .into_iter()
        .map(|product| {
            vec![button(
                product.title.clone(),
                CallbackAction::SelectProduct(product.id),
            )]
        })
        .collect();

    let cart_label = if cart_count > 0 {
        t_args_lang(
            "my-cart-count",
            &[("count", &cart_count.to_string())],
            language_code,
        )
    } else {
        t_lang("my-cart", language_code)
    };
    rows.push(vec![button(cart_label, CallbackAction::MyCart)]);

    InlineKeyboardMarkup::new(rows)
}

/// Quantity choices with the active one marked, then add-to-cart and back
pub fn create_product_keyboard(
    product_id: i64,
    selected_quantity: u32,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let quantity_row: Vec<InlineKeyboardButton> = QUANTITY_CHOICES
        .iter()
        .map(|&quantity| {
            let prefix = if quantity == selected_quantity { "✅ " } else { "" };
            button(
                format!("{prefix}{quantity}"),
                CallbackAction::Quantity(quantity),
            )
        })
        .collect();

    InlineKeyboardMarkup::new(vec![
        quantity_row,
        vec![button(
            t_lang("add-to-cart-button", language_code),
            CallbackAction::AddToCart(product_id),
        )],
        vec![button(t_lang("back-button", language_code), CallbackAction::Back)],
    ])
}

/// A remove button per cart item, then navigation; pay only when there is something to pay for
pub fn create_cart_keyboard(cart: Option<&Cart>, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = cart
        .map(|cart| cart.cart_items.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|item| {
            let title = item
                .product
                .as_ref()
                .map(|p| p.title.clone())
                .unwrap_or_else(|| t_lang("product-unavailable", language_code));
            vec![button(
                t_args_lang("remove-button", &[("title", &title)], language_code),
                CallbackAction::Remove(item.id),
            )]
        })
        .collect();

    let back = button(t_lang("back-button", language_code), CallbackAction::Back);
    if rows.is_empty() {
        rows.push(vec![back]);
    } else {
        rows.push(vec![
            back,
            button(t_lang("pay-button", language_code), CallbackAction::Pay),
        ]);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Caption of the product detail view
pub fn format_product_caption(product: &Product, language_code: Option<&str>) -> String {
    let caption = t_args_lang(
        "product-caption",
        &[
            ("title", &product.title),
            ("price", &format_amount(product.price)),
            ("description", product.description.as_deref().unwrap_or("")),
        ],
        language_code,
    );
    let caption = caption.trim_end();

    if caption.chars().count() > MAX_CAPTION_CHARS {
        let truncated: String = caption.chars().take(MAX_CAPTION_CHARS - 3).collect();
        format!("{truncated}...")
    } else {
        caption.to_string()
    }
}
