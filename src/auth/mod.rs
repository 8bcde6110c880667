//! Authentication against the marketplace API
//!
//! Credentials login returning a bearer token, stored in the config file
//! together with the profile of the logged-in user.

pub mod tokens;

pub use tokens::{SessionStore, StoredToken};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::Write;

use crate::config::Config;
use crate::models::User;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: User,
    token: String,
}

/// Log in with email + password and persist the session.
///
/// When `password` is `None` it is read from stdin.
pub async fn login(email: &str, password: Option<&str>) -> Result<()> {
    let mut config = Config::load()?;

    let password = match password {
        Some(p) => p.to_string(),
        None => prompt_password()?,
    };

    let url = format!("{}/api/login", config.api_base_url);
    tracing::debug!("POST {}", url);

    let resp = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .with_context(|| format!("Login request to {} failed", url))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("{} : {}", status.as_u16(), status.canonical_reason().unwrap_or("error")));
        bail!("Login failed: {}", message);
    }

    let login: LoginResponse = resp.json().await.context("Failed to parse login response")?;
    let name = login.user.full_name();

    config.set_session(StoredToken::new(login.token, None), login.user);
    config.save()?;

    println!("Logged in as {}", name);
    Ok(())
}

/// Log out: drop the stored session.
pub fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.clear_session();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Print current authentication status.
pub fn status() -> Result<()> {
    let config = Config::load()?;

    match (config.get_auth_token(), config.get_user()) {
        (Some(token), Some(user)) => {
            println!("Logged in as {} (id {})", user.full_name(), user.id);
            if token.is_expired() {
                println!("Token is expired. Run 'tindahan-cli login'.");
            } else {
                println!("Token is valid.");
            }
        }
        _ => {
            println!("Not logged in. Run 'tindahan-cli login'.");
        }
    }

    println!("API: {}", config.api_base_url);
    Ok(())
}

/// Pull the `message` field out of an error envelope body, if present.
fn extract_error_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(String::from)
}

/// Read the password without echoing it. Falls back to a plain (echoed)
/// line read when stdin is not a terminal, e.g. piped input.
fn prompt_password() -> Result<String> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
    use crossterm::terminal;

    print!("Password: ");
    std::io::stdout().flush().ok();

    if terminal::enable_raw_mode().is_err() {
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("Failed to read password from stdin")?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }

    let mut password = String::new();
    let result = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Enter => break Ok(password),
                KeyCode::Backspace => {
                    password.pop();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    break Err(anyhow::anyhow!("Login cancelled"));
                }
                KeyCode::Char(c) => password.push(c),
                _ => {}
            },
            Ok(_) => {}
            Err(e) => {
                break Err(anyhow::Error::from(e).context("Failed to read password"));
            }
        }
    };

    let _ = terminal::disable_raw_mode();
    println!();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_envelope_field() {
        assert_eq!(
            extract_error_message(r#"{"status":"error","message":"Incorrect password"}"#),
            Some("Incorrect password".to_string())
        );
        assert_eq!(extract_error_message(r#"{"message":""}"#), None);
        assert_eq!(extract_error_message("not json"), None);
    }
}
