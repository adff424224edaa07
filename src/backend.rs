//! # Commerce Backend Module
//!
//! [`CommerceBackend`] is the seam between the cart workflow and the headless
//! CMS. [`StrapiClient`] implements it over HTTP: one method per resource
//! action, a bounded timeout on every request, and every failure mapped into
//! [`BackendError`]. No method retries.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::backend_errors::BackendError;
use crate::config::BotConfig;
use crate::models::{Cart, CartItem, Envelope, NewOrder, Order, OrderItem, Product};

/// Backend handle shared by every conversation
pub type SharedBackend = Arc<dyn CommerceBackend>;

/// Resource actions offered by the commerce backend
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Every product, with images and nested data expanded
    async fn list_products(&self) -> Result<Vec<Product>, BackendError>;

    /// Raw bytes of an uploaded image
    async fn fetch_image(&self, path: &str) -> Result<Vec<u8>, BackendError>;

    /// Carts owned by `user_id`, without their items
    async fn find_carts(&self, user_id: &str) -> Result<Vec<Cart>, BackendError>;

    async fn create_cart(&self, user_id: &str) -> Result<Cart, BackendError>;

    /// First cart owned by `user_id` with items and their products expanded
    async fn cart_with_items(&self, user_id: &str) -> Result<Option<Cart>, BackendError>;

    /// Cart items whose numeric id equals `cart_item_id` (zero or one row)
    async fn find_cart_items(&self, cart_item_id: i64) -> Result<Vec<CartItem>, BackendError>;

    async fn create_cart_item(
        &self,
        cart_id: i64,
        product_id: i64,
        quantity: u32,
    ) -> Result<CartItem, BackendError>;

    async fn update_cart_item(&self, document_id: &str, quantity: u32)
        -> Result<(), BackendError>;

    async fn delete_cart_item(&self, document_id: &str) -> Result<(), BackendError>;

    async fn create_order(&self, order: &NewOrder) -> Result<Order, BackendError>;

    async fn create_order_item(
        &self,
        order_id: i64,
        product_id: i64,
        quantity: u32,
    ) -> Result<OrderItem, BackendError>;

    async fn delete_order(&self, document_id: &str) -> Result<(), BackendError>;

    async fn delete_order_item(&self, document_id: &str) -> Result<(), BackendError>;
}

/// HTTP client for a Strapi-style REST backend
#[derive(Debug, Clone)]
pub struct StrapiClient {
    http: Client,
    base_url: String,
}

impl StrapiClient {
    /// Build an authenticated client
    pub fn new(
        base_url: impl Into<String>,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            BackendError::Request {
                detail: format!("invalid backend token: {e}"),
                source: None,
            }
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::from_transport("failed to build HTTP client", e))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &BotConfig) -> Result<Self, BackendError> {
        Self::new(
            config.backend_url.clone(),
            &config.backend_token,
            config.backend_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Send a request and return the body of a 2xx response
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Vec<u8>, BackendError> {
        debug!("Backend request: {what}");

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::from_transport(format!("{what}: {e}"), e))?;

        let status = response.status();
        if !status.is_success() {
            info!("Backend answered {} for {}", status.as_u16(), what);
            return Err(BackendError::from_status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::from_transport(format!("{what}: {e}"), e))?;
        Ok(body.to_vec())
    }

    /// Send a request and decode the `data` member of the JSON envelope
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, BackendError> {
        let body = self.send(request, what).await?;
        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| BackendError::Malformed {
                detail: what.to_string(),
                source: e,
            })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }
}

#[async_trait]
impl CommerceBackend for StrapiClient {
    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        let request = self
            .request(Method::GET, "/api/products")
            .query(&[("populate", "*")]);
        self.send_json(request, "GET /api/products").await
    }

    async fn fetch_image(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let request = self.request(Method::GET, path);
        self.send(request, &format!("GET {path}")).await
    }

    async fn find_carts(&self, user_id: &str) -> Result<Vec<Cart>, BackendError> {
        let request = self
            .request(Method::GET, "/api/carts")
            .query(&[("filters[telegramId][$eq]", user_id)]);
        self.send_json(request, "GET /api/carts").await
    }

    async fn create_cart(&self, user_id: &str) -> Result<Cart, BackendError> {
        let request = self
            .request(Method::POST, "/api/carts")
            .json(&json!({ "data": { "telegramId": user_id } }));
        self.send_json(request, "POST /api/carts").await
    }

    async fn cart_with_items(&self, user_id: &str) -> Result<Option<Cart>, BackendError> {
        let request = self.request(Method::GET, "/api/carts").query(&[
            ("filters[telegramId][$eq]", user_id),
            ("populate", "cart_items.product"),
        ]);
        let carts: Vec<Cart> = self.send_json(request, "GET /api/carts?populate").await?;
        Ok(carts.into_iter().next())
    }

    async fn find_cart_items(&self, cart_item_id: i64) -> Result<Vec<CartItem>, BackendError> {
        let id = cart_item_id.to_string();
        let request = self
            .request(Method::GET, "/api/cart-items")
            .query(&[("filters[id][$eq]", id.as_str())]);
        self.send_json(request, "GET /api/cart-items").await
    }

    async fn create_cart_item(
        &self,
        cart_id: i64,
        product_id: i64,
        quantity: u32,
    ) -> Result<CartItem, BackendError> {
        let request = self.request(Method::POST, "/api/cart-items").json(&json!({
            "data": {
                "quantity": quantity,
                "cart_item": cart_id,
                "product": product_id,
            }
        }));
        self.send_json(request, "POST /api/cart-items").await
    }

    async fn update_cart_item(
        &self,
        document_id: &str,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let path = format!("/api/cart-items/{document_id}");
        let request = self
            .request(Method::PUT, &path)
            .json(&json!({ "data": { "quantity": quantity } }));
        self.send(request, &format!("PUT {path}")).await.map(|_| ())
    }

    async fn delete_cart_item(&self, document_id: &str) -> Result<(), BackendError> {
        let path = format!("/api/cart-items/{document_id}");
        let request = self.request(Method::DELETE, &path);
        self.send(request, &format!("DELETE {path}")).await.map(|_| ())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        let request = self
            .request(Method::POST, "/api/orders")
            .json(&json!({ "data": order }));
        self.send_json(request, "POST /api/orders").await
    }

    async fn create_order_item(
        &self,
        order_id: i64,
        product_id: i64,
        quantity: u32,
    ) -> Result<OrderItem, BackendError> {
        let payload: Value = json!({
            "data": {
                "quantity": quantity,
                "order": { "connect": order_id },
                "product": { "connect": product_id },
            }
        });
        let request = self.request(Method::POST, "/api/order-items").json(&payload);
        self.send_json(request, "POST /api/order-items").await
    }

    async fn delete_order(&self, document_id: &str) -> Result<(), BackendError> {
        let path = format!("/api/orders/{document_id}");
        let request = self.request(Method::DELETE, &path);
        self.send(request, &format!("DELETE {path}")).await.map(|_| ())
    }

    async fn delete_order_item(&self, document_id: &str) -> Result<(), BackendError> {
        let path = format!("/api/order-items/{document_id}");
        let request = self.request(Method::DELETE, &path);
        self.send(request, &format!("DELETE {path}")).await.map(|_| ())
    }
}
