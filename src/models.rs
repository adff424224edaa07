//! # Storefront Data Models
//!
//! Serde representations of the backend's resources. The backend wraps every
//! payload in a `data` envelope; everything else in the body is ignored.
//!
//! Amounts are `f64` in whole currency units. Every computed amount goes
//! through [`round_amount`] and is shown with [`format_amount`].

use serde::{Deserialize, Serialize};

/// `{ "data": ... }`
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Round an amount to hundredths
pub fn round_amount(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// At most two decimals, trailing zeros dropped: `59.7`, `1300`
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", round_amount(value));
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// A product for sale. Read-only from the bot's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    pub title: String,
    /// Price per kilogram, in whole currency units
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
}

impl Product {
    /// Path (or absolute URL) of the picture shown in the detail view
    pub fn image_path(&self) -> Option<&str> {
        let image = self.image.as_ref()?;
        image
            .formats
            .as_ref()
            .and_then(|formats| formats.small.as_ref())
            .and_then(|small| small.url.as_deref())
            .or(image.url.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub formats: Option<ImageFormats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFormats {
    #[serde(default)]
    pub small: Option<ImageFormat>,
    #[serde(default)]
    pub thumbnail: Option<ImageFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFormat {
    #[serde(default)]
    pub url: Option<String>,
}

/// A user's cart. At most one per user is expected, but the backend does not enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(rename = "telegramId", default)]
    pub telegram_id: Option<String>,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.cart_items.is_empty()
    }

    /// Find the line holding `product_id`
    pub fn item_for_product(&self, product_id: i64) -> Option<&CartItem> {
        self.cart_items
            .iter()
            .find(|item| item.product.as_ref().map(|p| p.id) == Some(product_id))
    }

    /// Sum of price × quantity over every line with a known product
    pub fn total(&self) -> f64 {
        round_amount(self.cart_items.iter().map(CartItem::subtotal).sum())
    }
}

/// One (product, quantity) line of a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    /// Durable identifier used to address the row for update and delete
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub product: Option<Product>,
}

impl CartItem {
    pub fn subtotal(&self) -> f64 {
        self.product
            .as_ref()
            .map(|p| round_amount(p.price * f64::from(self.quantity)))
            .unwrap_or(0.0)
    }
}

/// Checkout record. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "tgID", default)]
    pub tg_id: Option<String>,
    #[serde(default)]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(default)]
    pub quantity: u32,
}

/// Payload for creating an order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
    pub email: String,
    #[serde(rename = "tgID")]
    pub tg_id: String,
    pub total: f64,
}
