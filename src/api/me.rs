//! Session resolver endpoint (/api/me)

use anyhow::{Context, Result};

use super::client::{ApiClient, DataEnvelope};
use crate::models::User;

/// Fetch the current user from the API.
pub async fn me(client: &ApiClient) -> Result<User> {
    let resp = client.get("/api/me", &[]).await?;
    let body: DataEnvelope<User> = resp.json().await.context("Failed to parse /api/me response")?;
    Ok(body.data)
}

/// Fetch and display current user info.
pub async fn whoami() -> Result<()> {
    let client = ApiClient::new()?;
    let user = me(&client).await?;

    println!();
    println!("Name:  {}", user.full_name());
    println!("Email: {}", user.email.as_deref().unwrap_or("(none)"));
    println!("Phone: {}", user.phone.as_deref().unwrap_or("(none)"));
    println!("Role:  {:?}", user.role);
    println!("ID:    {}", user.id);

    Ok(())
}
