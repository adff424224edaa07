//! # Cart Workflow Module
//!
//! Sequences backend calls into the cart and checkout operations used by the
//! conversation. Backend errors pass through unchanged inside
//! [`CartError::Backend`]. Nothing here is atomic: the backend offers no
//! transactions, so multi-step operations document what they leave behind
//! when a step fails.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::backend::CommerceBackend;
use crate::backend_errors::BackendError;
use crate::localization::{t_args_lang, t_lang};
use crate::models::{format_amount, round_amount, Cart, NewOrder, Order, OrderItem};

/// Errors raised by cart and checkout operations
#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The user has no cart yet; `get_or_create_cart` must run first
    #[error("no cart exists for user {user_id}")]
    NoCart { user_id: String },

    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The snapshot passed to checkout holds nothing that can be ordered
    #[error("cart is empty")]
    EmptyCart,

    /// The order row was created but not every order item was
    #[error("order {order_id} incomplete: {created} of {expected} items created (rolled back: {rolled_back})")]
    OrderIncomplete {
        order_id: i64,
        created: usize,
        expected: usize,
        rolled_back: bool,
        #[source]
        source: BackendError,
    },
}

/// Human-readable cart contents
#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    pub text: String,
    pub total: f64,
    pub count: usize,
}

/// Return the id of the user's cart, creating the cart if there is none.
///
/// When the backend reports several carts for the user the first one wins.
pub async fn get_or_create_cart(
    backend: &dyn CommerceBackend,
    user_id: &str,
) -> Result<i64, CartError> {
    let carts = backend.find_carts(user_id).await?;
    if let Some(cart) = carts.first() {
        if carts.len() > 1 {
            warn!(user_id = %user_id, carts = carts.len(), "Several carts found for user, using the first");
        }
        return Ok(cart.id);
    }

    let cart = backend.create_cart(user_id).await?;
    info!(user_id = %user_id, cart_id = cart.id, "Created cart");
    Ok(cart.id)
}

/// Add `quantity` of a product to the user's cart.
///
/// An existing line for the product is incremented; otherwise a new line is
/// created. Returns the quantity now held by the line.
pub async fn add_item(
    backend: &dyn CommerceBackend,
    user_id: &str,
    product_id: i64,
    quantity: u32,
) -> Result<u32, CartError> {
    if quantity == 0 {
        return Err(CartError::InvalidQuantity(quantity));
    }

    let cart = backend
        .cart_with_items(user_id)
        .await?
        .ok_or_else(|| CartError::NoCart {
            user_id: user_id.to_string(),
        })?;

    match cart.item_for_product(product_id) {
        Some(existing) => {
            let new_quantity = existing.quantity.saturating_add(quantity);
            backend
                .update_cart_item(&existing.document_id, new_quantity)
                .await?;
            info!(user_id = %user_id, product_id, quantity = new_quantity, "Updated cart item");
            Ok(new_quantity)
        }
        None => {
            backend
                .create_cart_item(cart.id, product_id, quantity)
                .await?;
            info!(user_id = %user_id, product_id, quantity, "Created cart item");
            Ok(quantity)
        }
    }
}

/// Delete a cart item by its numeric id.
///
/// Returns `false` when the item no longer exists; a second removal of the
/// same id is not an error.
pub async fn remove_item(
    backend: &dyn CommerceBackend,
    cart_item_id: i64,
) -> Result<bool, CartError> {
    let items = backend.find_cart_items(cart_item_id).await?;
    let Some(item) = items.first() else {
        warn!(cart_item_id, "Cart item already removed");
        return Ok(false);
    };

    backend.delete_cart_item(&item.document_id).await?;
    info!(cart_item_id, "Removed cart item");
    Ok(true)
}

/// Delete every item of the user's cart, one at a time.
///
/// Best effort: a failure part-way leaves the remaining items in place.
/// Returns how many items were deleted.
pub async fn clear_cart(backend: &dyn CommerceBackend, user_id: &str) -> Result<usize, CartError> {
    let Some(cart) = backend.cart_with_items(user_id).await? else {
        return Ok(0);
    };

    let mut cleared = 0;
    for item in &cart.cart_items {
        if let Err(e) = backend.delete_cart_item(&item.document_id).await {
            warn!(user_id = %user_id, cleared, remaining = cart.cart_items.len() - cleared, error = %e, "Cart only partially cleared");
            return Err(e.into());
        }
        cleared += 1;
    }

    info!(user_id = %user_id, cleared, "Cleared cart");
    Ok(cleared)
}

/// Create an order from a cart snapshot.
///
/// The total is computed from `cart` exactly as given, never from a fresh
/// fetch. If an order item cannot be created, the items created so far and
/// the order itself are deleted again before [`CartError::OrderIncomplete`]
/// is returned.
pub async fn place_order(
    backend: &dyn CommerceBackend,
    user_id: &str,
    email: &str,
    cart: &Cart,
) -> Result<Order, CartError> {
    let lines: Vec<(i64, u32)> = cart
        .cart_items
        .iter()
        .filter_map(|item| match &item.product {
            Some(product) => Some((product.id, item.quantity)),
            None => {
                warn!(user_id = %user_id, cart_item_id = item.id, "Skipping cart item without product");
                None
            }
        })
        .collect();

    if lines.is_empty() {
        return Err(CartError::EmptyCart);
    }

    let order = backend
        .create_order(&NewOrder {
            email: email.to_string(),
            tg_id: user_id.to_string(),
            total: cart.total(),
        })
        .await?;

    let mut created: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for (product_id, quantity) in &lines {
        match backend
            .create_order_item(order.id, *product_id, *quantity)
            .await
        {
            Ok(item) => created.push(item),
            Err(e) => {
                error!(
                    user_id = %user_id,
                    order_id = order.id,
                    created = created.len(),
                    expected = lines.len(),
                    error = %e,
                    "Order placement incomplete, rolling back"
                );
                let rolled_back = roll_back_order(backend, &order, &created).await;
                return Err(CartError::OrderIncomplete {
                    order_id: order.id,
                    created: created.len(),
                    expected: lines.len(),
                    rolled_back,
                    source: e,
                });
            }
        }
    }

    info!(user_id = %user_id, order_id = order.id, items = created.len(), total = order.total, "Order placed");
    Ok(order)
}

async fn roll_back_order(backend: &dyn CommerceBackend, order: &Order, items: &[OrderItem]) -> bool {
    let mut clean = true;
    for item in items.iter().rev() {
        if let Err(e) = backend.delete_order_item(&item.document_id).await {
            error!(order_id = order.id, order_item_id = item.id, error = %e, "Failed to delete order item during rollback");
            clean = false;
        }
    }
    if let Err(e) = backend.delete_order(&order.document_id).await {
        error!(order_id = order.id, error = %e, "Failed to delete order during rollback");
        clean = false;
    }
    clean
}

/// Render the cart for display. No backend call.
pub fn format_cart_for_display(cart: Option<&Cart>, language_code: Option<&str>) -> CartSummary {
    let items = match cart {
        Some(cart) if !cart.is_empty() => &cart.cart_items,
        _ => {
            return CartSummary {
                text: t_lang("cart-empty", language_code),
                total: 0.0,
                count: 0,
            }
        }
    };

    let mut text = String::new();
    let mut total = 0.0;
    for item in items {
        let subtotal = item.subtotal();
        total += subtotal;
        let title = item
            .product
            .as_ref()
            .map(|p| p.title.clone())
            .unwrap_or_else(|| t_lang("product-unavailable", language_code));
        text.push('\n');
        text.push_str(&t_args_lang(
            "cart-line",
            &[
                ("title", &title),
                ("quantity", &item.quantity.to_string()),
                ("subtotal", &format_amount(subtotal)),
            ],
            language_code,
        ));
    }
    let total = round_amount(total);
    text.push_str("\n\n");
    text.push_str(&t_args_lang(
        "cart-total",
        &[("total", &format_amount(total))],
        language_code,
    ));

    CartSummary {
        text,
        total,
        count: items.len(),
    }
}
