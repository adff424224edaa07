//! # Storefront Telegram Bot
//!
//! A Telegram bot that sells products from a headless CMS: a product menu,
//! a per-user cart kept in the backend, and a checkout that turns the cart
//! into an order after asking for a contact email.

pub mod backend;
pub mod backend_errors;
pub mod bot;
pub mod cart;
pub mod config;
pub mod dialogue;
pub mod localization;
pub mod models;
