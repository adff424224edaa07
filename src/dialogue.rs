//! Shop dialogue module for handling conversation state with users.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::models::Product;

/// Quantity preselected when a product is opened
pub const DEFAULT_QUANTITY: u32 = 1;

/// Quantities offered in the product detail view, in kilograms
pub const QUANTITY_CHOICES: [u32; 4] = [1, 2, 5, 10];

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[\w.-]+@\w[\w.-]*\.\w+$").expect("Email pattern should be valid");
}

/// Per-conversation data carried between turns
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Products from the last menu render, in backend order
    pub products: Vec<Product>,
    /// Product shown in the detail view
    pub product_id: Option<i64>,
    /// Quantity chosen in the detail view
    pub quantity: u32,
    /// Cart item most recently requested for removal
    pub cart_item_id: Option<i64>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            product_id: None,
            quantity: DEFAULT_QUANTITY,
            cart_item_id: None,
        }
    }
}

impl Session {
    pub fn with_products(products: Vec<Product>) -> Self {
        let mut session = Self::default();
        session.replace_products(products);
        session
    }

    pub fn replace_products(&mut self, products: Vec<Product>) {
        self.products = products;
    }

    pub fn product(&self, product_id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }
}

/// Represents the conversation state of a shopper
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ShopDialogueState {
    /// No conversation running; only `/start` opens one
    #[default]
    Start,
    /// Browsing products and managing the cart
    Main { session: Session },
    /// Checkout started, waiting for the contact email
    AwaitingEmail { session: Session },
}

/// Type alias for our shop dialogue
pub type ShopDialogue = Dialogue<ShopDialogueState, InMemStorage<ShopDialogueState>>;

/// Validates a contact email, returning it trimmed
pub fn validate_email(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err("invalid");
    }

    Ok(trimmed.to_string())
}
