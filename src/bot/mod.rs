//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Handles incoming text messages and commands
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `callback_data`: Decodes button payloads into actions
//! - `conversation`: The shop's conversation state machine
//! - `ui_builder`: Creates keyboards and formats messages
//! - `dialogue_manager`: Executes turns and manages dialogue state transitions

pub mod callback_data;
pub mod callback_handler;
pub mod conversation;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;
