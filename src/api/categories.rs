//! Category listing and admin CRUD

use anyhow::{Context, Result};

use super::client::{ApiClient, DataEnvelope, Page};
use super::users::print_envelope;
use crate::models::Category;

/// Fetch one page of categories.
pub async fn categories_page(
    client: &ApiClient,
    page: u32,
    search: Option<&str>,
) -> Result<Page<Category>> {
    let mut query: Vec<(&str, String)> = vec![("page", page.to_string())];
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        query.push(("search", search.to_string()));
    }

    let resp = client.get("/api/categories", &query).await?;
    let body: DataEnvelope<Page<Category>> = resp
        .json()
        .await
        .context("Failed to parse categories response")?;
    Ok(body.data)
}

/// List categories (prints to stdout).
pub async fn list_categories(page: u32, search: Option<&str>) -> Result<()> {
    let client = ApiClient::new()?;
    let result = categories_page(&client, page, search).await?;

    println!(
        "\nCategories (page {}/{}):",
        page,
        result.last_page.unwrap_or(page)
    );
    println!("{:-<60}", "");

    if result.data.is_empty() {
        println!("  (no categories found)");
        return Ok(());
    }

    for category in &result.data {
        println!("{:>5}  {}", category.id, category.name);
        if let Some(ref description) = category.description {
            if !description.is_empty() {
                println!("       {}", description);
            }
        }
    }

    Ok(())
}

/// Show a single category.
pub async fn show_category(id: i64) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = client.get(&format!("/api/category/{}", id), &[]).await?;
    let body: DataEnvelope<Category> = resp
        .json()
        .await
        .context("Failed to parse category response")?;

    println!("{:>5}  {}", body.data.id, body.data.name);
    if let Some(ref description) = body.data.description {
        println!("       {}", description);
    }
    Ok(())
}

fn category_body(name: &str, description: Option<&str>) -> serde_json::Value {
    match description {
        Some(description) => serde_json::json!({ "name": name, "description": description }),
        None => serde_json::json!({ "name": name }),
    }
}

/// Create a category.
pub async fn create_category(name: &str, description: Option<&str>) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = client
        .post("/api/category", &category_body(name, description))
        .await?;
    print_envelope(resp).await
}

/// Update a category.
pub async fn update_category(id: i64, name: &str, description: Option<&str>) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = client
        .put(
            &format!("/api/category/{}", id),
            &category_body(name, description),
        )
        .await?;
    print_envelope(resp).await
}

/// Delete a category.
pub async fn delete_category(id: i64) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = client
        .delete(&format!("/api/category/{}", id), None)
        .await?;
    print_envelope(resp).await
}
