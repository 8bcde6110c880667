//! API client module for the marketplace backend

mod categories;
pub mod client;
mod items;
mod me;
mod messages;
mod users;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use client::ApiClient;
pub use items::ItemDraft;
pub use users::UserDraft;

// Data-returning functions for TUI integration
pub use me::me;
pub use messages::{get_messages, send_message_with_client};
pub use users::directory;

/// Show current user info
pub async fn whoami() -> Result<()> {
    me::whoami().await
}

/// List users
pub async fn list_users(
    page: u32,
    page_size: u32,
    search: Option<&str>,
    sort_column: Option<&str>,
    sort_desc: bool,
) -> Result<()> {
    users::list_users(page, page_size, search, sort_column, sort_desc).await
}

/// Create a user (admin)
pub async fn create_user(draft: &UserDraft, image: Option<&Path>) -> Result<()> {
    users::create_user(draft, image).await
}

/// Update a user (admin / profile)
pub async fn update_user(id: i64, draft: &UserDraft, image: Option<&Path>) -> Result<()> {
    users::update_user(id, draft, image).await
}

/// Delete a user, optionally confirming with a password
pub async fn delete_user(id: i64, password: Option<&str>) -> Result<()> {
    users::delete_user(id, password).await
}

/// List categories
pub async fn list_categories(page: u32, search: Option<&str>) -> Result<()> {
    categories::list_categories(page, search).await
}

/// Show a category
pub async fn show_category(id: i64) -> Result<()> {
    categories::show_category(id).await
}

/// Create a category
pub async fn create_category(name: &str, description: Option<&str>) -> Result<()> {
    categories::create_category(name, description).await
}

/// Update a category
pub async fn update_category(id: i64, name: &str, description: Option<&str>) -> Result<()> {
    categories::update_category(id, name, description).await
}

/// Delete a category
pub async fn delete_category(id: i64) -> Result<()> {
    categories::delete_category(id).await
}

/// Browse items
pub async fn list_items(page: u32, page_size: u32, search: Option<&str>) -> Result<()> {
    items::list_items(page, page_size, search).await
}

/// Show an item
pub async fn show_item(id: i64) -> Result<()> {
    items::show_item(id).await
}

/// Create an item listing
pub async fn create_item(draft: &ItemDraft, files: &[PathBuf]) -> Result<()> {
    items::create_item(draft, files).await
}

/// Update an item listing
pub async fn update_item(id: i64, draft: &ItemDraft, files: &[PathBuf]) -> Result<()> {
    items::update_item(id, draft, files).await
}

/// Delete an item
pub async fn delete_item(id: i64) -> Result<()> {
    items::delete_item(id).await
}

/// List a user's items
pub async fn list_user_items(user_id: Option<i64>, search: Option<&str>) -> Result<()> {
    items::list_user_items(user_id, search).await
}

/// Read the conversation with a peer
pub async fn read_messages(peer_id: i64) -> Result<()> {
    messages::read_messages(peer_id).await
}

/// Send a direct message
pub async fn send_message(recipient_id: i64, content: &str) -> Result<()> {
    messages::send_message(recipient_id, content).await
}
