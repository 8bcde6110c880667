//! Item listings: browse, show, and the multipart create/update forms

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::client::{ApiClient, DataEnvelope, Page};
use super::users::print_envelope;
use crate::models::Item;

/// Fields for the listing form. `None` fields are omitted from the form,
/// so updates can be partial.
#[derive(Debug, Default)]
pub struct ItemDraft {
    pub title: Option<String>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
}

impl ItemDraft {
    /// Build the multipart form, attaching each file under `files[]`.
    fn form(&self, files: &[PathBuf]) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();

        if let Some(ref title) = self.title {
            form = form.text("title", title.clone());
        }
        if let Some(category_id) = self.category_id {
            form = form.text("category_id", category_id.to_string());
        }
        if let Some(ref description) = self.description {
            form = form.text("description", description.clone());
        }
        if let Some(ref condition) = self.condition {
            form = form.text("condition", condition.clone());
        }
        if let Some(price) = self.price {
            form = form.text("price", price.to_string());
        }
        if let Some(ref location) = self.location {
            form = form.text("location", location.clone());
        }

        for path in files {
            form = form.part("uploaded_files[]", file_part(path)?);
        }

        Ok(form)
    }
}

fn file_part(path: &Path) -> Result<reqwest::multipart::Part> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(reqwest::multipart::Part::bytes(bytes).file_name(file_name))
}

/// Fetch one page of items.
pub async fn items_page(
    client: &ApiClient,
    page: u32,
    page_size: u32,
    search: Option<&str>,
) -> Result<Page<Item>> {
    let mut query: Vec<(&str, String)> = vec![
        ("page", page.to_string()),
        ("page_size", page_size.to_string()),
    ];
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        query.push(("search", search.to_string()));
    }

    let resp = client.get("/api/items", &query).await?;
    let body: DataEnvelope<Page<Item>> = resp
        .json()
        .await
        .context("Failed to parse items response")?;
    Ok(body.data)
}

fn print_item(item: &Item) {
    println!(
        "{:>5}  {}  {}",
        item.id.unwrap_or_default(),
        item.title.as_deref().unwrap_or("(untitled)"),
        item.price.map(|p| format!("P{:.2}", p)).unwrap_or_default(),
    );
    if let Some(ref category) = item.category {
        println!("       category: {}", category.name);
    }
    if let Some(ref condition) = item.condition {
        println!("       condition: {}", condition);
    }
    if let Some(ref location) = item.location {
        println!("       location: {}", location);
    }
    if let Some(ref seller) = item.added_by {
        println!("       seller: {}", seller.full_name());
    }
    for upload in &item.file_uploads {
        println!(
            "       [file] {}",
            upload
                .file_name
                .as_deref()
                .or(upload.path.as_deref())
                .unwrap_or("?")
        );
    }
}

/// Browse items (prints to stdout).
pub async fn list_items(page: u32, page_size: u32, search: Option<&str>) -> Result<()> {
    let client = ApiClient::new()?;
    let result = items_page(&client, page, page_size, search).await?;

    println!(
        "\nItems (page {}/{}):",
        page,
        result.last_page.unwrap_or(page)
    );
    println!("{:-<60}", "");

    if result.data.is_empty() {
        println!("  (no items found)");
        return Ok(());
    }

    for item in &result.data {
        print_item(item);
        println!();
    }

    if let Some(total) = result.total {
        println!("{} total", total);
    }

    Ok(())
}

/// Show a single item with its attachments.
pub async fn show_item(id: i64) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = client.get(&format!("/api/item/{}", id), &[]).await?;
    let body: DataEnvelope<Item> = resp
        .json()
        .await
        .context("Failed to parse item response")?;

    print_item(&body.data);
    if let Some(ref description) = body.data.description {
        println!("\n{}", description);
    }
    Ok(())
}

/// Create an item listing (multipart with attachments).
pub async fn create_item(draft: &ItemDraft, files: &[PathBuf]) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = client.post_multipart("/api/item", draft.form(files)?).await?;
    print_envelope(resp).await
}

/// Update an item listing. The server takes updates as multipart POST on
/// the item path, same as create.
pub async fn update_item(id: i64, draft: &ItemDraft, files: &[PathBuf]) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = client
        .post_multipart(&format!("/api/item/{}", id), draft.form(files)?)
        .await?;
    print_envelope(resp).await
}

/// Delete an item.
pub async fn delete_item(id: i64) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = client.delete(&format!("/api/item/{}", id), None).await?;
    print_envelope(resp).await
}

/// List items posted by a user (defaults to the session user).
pub async fn list_user_items(user_id: Option<i64>, search: Option<&str>) -> Result<()> {
    let client = ApiClient::new()?;
    let user_id = user_id.or_else(|| client.session_user().map(|u| u.id));

    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(user_id) = user_id {
        query.push(("user_id", user_id.to_string()));
    }
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        query.push(("search", search.to_string()));
    }

    let resp = client.get("/api/user-items", &query).await?;
    let body: DataEnvelope<Vec<Item>> = resp
        .json()
        .await
        .context("Failed to parse user items response")?;

    if body.data.is_empty() {
        println!("(no items)");
        return Ok(());
    }

    for item in &body.data {
        print_item(item);
        println!();
    }

    Ok(())
}
