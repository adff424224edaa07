//! Callback payloads carried by inline keyboard buttons

use std::fmt;

use crate::dialogue::QUANTITY_CHOICES;

const QUANTITY_PREFIX: &str = "quantity_";
const ADD_TO_CART_PREFIX: &str = "add_cart_";
const REMOVE_PREFIX: &str = "remove_";

/// Every action a button press can request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Back,
    ShowProducts,
    MyCart,
    Pay,
    Quantity(u32),
    AddToCart(i64),
    Remove(i64),
    SelectProduct(i64),
    Unknown(String),
}

impl CallbackAction {
    /// Decode a raw callback payload
    pub fn decode(data: &str) -> Self {
        match data {
            "back" => return CallbackAction::Back,
            "show_products" => return CallbackAction::ShowProducts,
            "my_cart" => return CallbackAction::MyCart,
            "pay" => return CallbackAction::Pay,
            _ => {}
        }

        let decoded = if let Some(rest) = data.strip_prefix(QUANTITY_PREFIX) {
            rest.parse::<u32>()
                .ok()
                .filter(|quantity| QUANTITY_CHOICES.contains(quantity))
                .map(CallbackAction::Quantity)
        } else if let Some(rest) = data.strip_prefix(ADD_TO_CART_PREFIX) {
            parse_id(rest).map(CallbackAction::AddToCart)
        } else if let Some(rest) = data.strip_prefix(REMOVE_PREFIX) {
            parse_id(rest).map(CallbackAction::Remove)
        } else {
            parse_id(data).map(CallbackAction::SelectProduct)
        };

        decoded.unwrap_or_else(|| CallbackAction::Unknown(data.to_string()))
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Back => write!(f, "back"),
            CallbackAction::ShowProducts => write!(f, "show_products"),
            CallbackAction::MyCart => write!(f, "my_cart"),
            CallbackAction::Pay => write!(f, "pay"),
            CallbackAction::Quantity(quantity) => write!(f, "{QUANTITY_PREFIX}{quantity}"),
            CallbackAction::AddToCart(product_id) => write!(f, "{ADD_TO_CART_PREFIX}{product_id}"),
            CallbackAction::Remove(cart_item_id) => write!(f, "{REMOVE_PREFIX}{cart_item_id}"),
            CallbackAction::SelectProduct(product_id) => write!(f, "{product_id}"),
            CallbackAction::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}
