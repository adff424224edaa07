//! In-memory commerce backend shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use storefront_bot::backend::CommerceBackend;
use storefront_bot::backend_errors::BackendError;
use storefront_bot::models::{Cart, CartItem, NewOrder, Order, OrderItem, Product};

#[derive(Debug, Clone)]
struct StoredItem {
    id: i64,
    document_id: String,
    cart_id: i64,
    product_id: i64,
    quantity: u32,
}

#[derive(Debug, Clone)]
struct StoredOrderItem {
    id: i64,
    document_id: String,
    order_id: i64,
    product_id: i64,
    quantity: u32,
}

#[derive(Default)]
struct State {
    next_id: i64,
    products: Vec<Product>,
    images: HashMap<String, Vec<u8>>,
    carts: Vec<Cart>,
    cart_items: Vec<StoredItem>,
    orders: Vec<Order>,
    order_items: Vec<StoredOrderItem>,
    calls: HashMap<&'static str, usize>,
    fail_order_item_at: Option<usize>,
    fail_delete_cart_item_at: Option<usize>,
    fail_delete_order: bool,
    fail_delete_order_item: bool,
    fail_list_products: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn count(&mut self, call: &'static str) -> usize {
        let counter = self.calls.entry(call).or_insert(0);
        *counter += 1;
        *counter
    }

    fn product(&self, id: i64) -> Option<Product> {
        self.products.iter().find(|p| p.id == id).cloned()
    }

    fn to_cart_item(&self, item: &StoredItem) -> CartItem {
        CartItem {
            id: item.id,
            document_id: item.document_id.clone(),
            quantity: item.quantity,
            product: self.product(item.product_id),
        }
    }
}

/// Backend double keeping every resource in memory and counting calls
pub struct InMemoryBackend {
    state: Mutex<State>,
}

pub fn product(id: i64, title: &str, price: f64) -> Product {
    Product {
        id,
        document_id: format!("product{id}"),
        title: title.to_string(),
        price,
        description: Some(format!("Fresh {}", title.to_lowercase())),
        image: None,
    }
}

impl InMemoryBackend {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 100,
                products,
                ..State::default()
            }),
        }
    }

    /// Salmon at 500 and cod at 300, the usual fixture
    pub fn with_fish() -> Self {
        Self::new(vec![product(1, "Salmon", 500.0), product(2, "Cod", 300.0)])
    }

    pub fn add_image(&self, path: &str, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .images
            .insert(path.to_string(), bytes.to_vec());
    }

    /// Make the `n`th order item creation (1-based) fail with a 500
    pub fn fail_order_item_at(&self, n: usize) {
        self.state.lock().unwrap().fail_order_item_at = Some(n);
    }

    /// Make the `n`th cart item deletion (1-based) fail with a 500
    pub fn fail_delete_cart_item_at(&self, n: usize) {
        self.state.lock().unwrap().fail_delete_cart_item_at = Some(n);
    }

    /// Make every order deletion fail with a 500
    pub fn fail_delete_order(&self) {
        self.state.lock().unwrap().fail_delete_order = true;
    }

    /// Make every order item deletion fail with a 500
    pub fn fail_delete_order_item(&self) {
        self.state.lock().unwrap().fail_delete_order_item = true;
    }

    pub fn fail_list_products(&self) {
        self.state.lock().unwrap().fail_list_products = true;
    }

    /// Insert a cart row directly, bypassing the call counters
    pub fn seed_cart(&self, user_id: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.carts.push(Cart {
            id,
            document_id: format!("cart{id}"),
            telegram_id: Some(user_id.to_string()),
            cart_items: vec![],
        });
        id
    }

    /// Insert a cart item directly, bypassing the call counters
    pub fn seed_item(&self, cart_id: i64, product_id: i64, quantity: u32) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.cart_items.push(StoredItem {
            id,
            document_id: format!("item{id}"),
            cart_id,
            product_id,
            quantity,
        });
        id
    }

    pub fn calls(&self, call: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(call)
            .copied()
            .unwrap_or(0)
    }

    pub fn cart_count(&self, user_id: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .carts
            .iter()
            .filter(|c| c.telegram_id.as_deref() == Some(user_id))
            .count()
    }

    /// (product id, quantity) lines of every cart owned by `user_id`
    pub fn lines(&self, user_id: &str) -> Vec<(i64, u32)> {
        let state = self.state.lock().unwrap();
        let cart_ids: Vec<i64> = state
            .carts
            .iter()
            .filter(|c| c.telegram_id.as_deref() == Some(user_id))
            .map(|c| c.id)
            .collect();
        state
            .cart_items
            .iter()
            .filter(|i| cart_ids.contains(&i.cart_id))
            .map(|i| (i.product_id, i.quantity))
            .collect()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.state.lock().unwrap().orders.clone()
    }

    /// (order id, product id, quantity) of every stored order item
    pub fn order_items(&self) -> Vec<(i64, i64, u32)> {
        self.state
            .lock()
            .unwrap()
            .order_items
            .iter()
            .map(|i| (i.order_id, i.product_id, i.quantity))
            .collect()
    }
}

#[async_trait]
impl CommerceBackend for InMemoryBackend {
    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("list_products");
        if state.fail_list_products {
            return Err(BackendError::from_status(500));
        }
        Ok(state.products.clone())
    }

    async fn fetch_image(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("fetch_image");
        state
            .images
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::from_status(404))
    }

    async fn find_carts(&self, user_id: &str) -> Result<Vec<Cart>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("find_carts");
        Ok(state
            .carts
            .iter()
            .filter(|c| c.telegram_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn create_cart(&self, user_id: &str) -> Result<Cart, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("create_cart");
        let id = state.next_id();
        let cart = Cart {
            id,
            document_id: format!("cart{id}"),
            telegram_id: Some(user_id.to_string()),
            cart_items: vec![],
        };
        state.carts.push(cart.clone());
        Ok(cart)
    }

    async fn cart_with_items(&self, user_id: &str) -> Result<Option<Cart>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("cart_with_items");
        let Some(cart) = state
            .carts
            .iter()
            .find(|c| c.telegram_id.as_deref() == Some(user_id))
            .cloned()
        else {
            return Ok(None);
        };
        let items = state
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart.id)
            .map(|i| state.to_cart_item(i))
            .collect();
        Ok(Some(Cart {
            cart_items: items,
            ..cart
        }))
    }

    async fn find_cart_items(&self, cart_item_id: i64) -> Result<Vec<CartItem>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("find_cart_items");
        Ok(state
            .cart_items
            .iter()
            .filter(|i| i.id == cart_item_id)
            .map(|i| state.to_cart_item(i))
            .collect())
    }

    async fn create_cart_item(
        &self,
        cart_id: i64,
        product_id: i64,
        quantity: u32,
    ) -> Result<CartItem, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("create_cart_item");
        let id = state.next_id();
        let item = StoredItem {
            id,
            document_id: format!("item{id}"),
            cart_id,
            product_id,
            quantity,
        };
        state.cart_items.push(item.clone());
        Ok(state.to_cart_item(&item))
    }

    async fn update_cart_item(&self, document_id: &str, quantity: u32) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("update_cart_item");
        match state
            .cart_items
            .iter_mut()
            .find(|i| i.document_id == document_id)
        {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(BackendError::from_status(404)),
        }
    }

    async fn delete_cart_item(&self, document_id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        let attempt = state.count("delete_cart_item");
        if state.fail_delete_cart_item_at == Some(attempt) {
            return Err(BackendError::from_status(500));
        }
        let before = state.cart_items.len();
        state.cart_items.retain(|i| i.document_id != document_id);
        if state.cart_items.len() == before {
            return Err(BackendError::from_status(404));
        }
        Ok(())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("create_order");
        let id = state.next_id();
        let order = Order {
            id,
            document_id: format!("order{id}"),
            email: Some(order.email.clone()),
            tg_id: Some(order.tg_id.clone()),
            total: order.total,
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn create_order_item(
        &self,
        order_id: i64,
        product_id: i64,
        quantity: u32,
    ) -> Result<OrderItem, BackendError> {
        let mut state = self.state.lock().unwrap();
        let attempt = state.count("create_order_item");
        if state.fail_order_item_at == Some(attempt) {
            return Err(BackendError::from_status(500));
        }
        let id = state.next_id();
        state.order_items.push(StoredOrderItem {
            id,
            document_id: format!("order-item{id}"),
            order_id,
            product_id,
            quantity,
        });
        Ok(OrderItem {
            id,
            document_id: format!("order-item{id}"),
            quantity,
        })
    }

    async fn delete_order(&self, document_id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("delete_order");
        if state.fail_delete_order {
            return Err(BackendError::from_status(500));
        }
        state.orders.retain(|o| o.document_id != document_id);
        Ok(())
    }

    async fn delete_order_item(&self, document_id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.count("delete_order_item");
        if state.fail_delete_order_item {
            return Err(BackendError::from_status(500));
        }
        state.order_items.retain(|i| i.document_id != document_id);
        Ok(())
    }
}
