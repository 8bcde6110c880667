//! User directory and admin user management

use anyhow::{Context, Result};
use std::path::Path;

use super::client::{ApiClient, DataEnvelope, Envelope, Page};
use crate::models::User;

/// Page size used when the directory backs the chat sidebar. The original
/// screens load one large page rather than paginating the recipient list.
pub const DIRECTORY_PAGE_SIZE: u32 = 100;

/// Fetch one page of users.
pub async fn users_page(
    client: &ApiClient,
    page: u32,
    page_size: u32,
    search: Option<&str>,
    sort_column: Option<&str>,
    sort_desc: bool,
) -> Result<Page<User>> {
    let mut query: Vec<(&str, String)> = vec![
        ("page", page.to_string()),
        ("page_size", page_size.to_string()),
        ("sort_desc", sort_desc.to_string()),
    ];
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        query.push(("search", search.to_string()));
    }
    if let Some(column) = sort_column.filter(|s| !s.is_empty()) {
        query.push(("sort_column", column.to_string()));
    }

    let resp = client.get("/api/users", &query).await?;
    let body: DataEnvelope<Page<User>> = resp
        .json()
        .await
        .context("Failed to parse users response")?;
    Ok(body.data)
}

/// Fetch the conversation directory: first large page matching `search`,
/// with the session user filtered out.
pub async fn directory(client: &ApiClient, search: &str) -> Result<Vec<User>> {
    let own_id = client.session_user().map(|u| u.id);
    let page = users_page(
        client,
        1,
        DIRECTORY_PAGE_SIZE,
        Some(search).filter(|s| !s.is_empty()),
        None,
        false,
    )
    .await?;

    Ok(page
        .data
        .into_iter()
        .filter(|u| Some(u.id) != own_id)
        .collect())
}

/// List users (prints to stdout).
pub async fn list_users(
    page: u32,
    page_size: u32,
    search: Option<&str>,
    sort_column: Option<&str>,
    sort_desc: bool,
) -> Result<()> {
    let client = ApiClient::new()?;
    let result = users_page(&client, page, page_size, search, sort_column, sort_desc).await?;

    println!("\nUsers (page {}/{}):", page, result.last_page.unwrap_or(page));
    println!("{:-<60}", "");

    if result.data.is_empty() {
        println!("  (no users found)");
        return Ok(());
    }

    for user in &result.data {
        println!(
            "{:>5}  {:<30} {:?}",
            user.id,
            user.full_name(),
            user.role
        );
        if let Some(ref email) = user.email {
            println!("       {}", email);
        }
    }

    if let Some(total) = result.total {
        println!("\n{} total", total);
    }

    Ok(())
}

/// Fields for the admin user form.
#[derive(Debug, Default)]
pub struct UserDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

impl UserDraft {
    fn form(&self, image: Option<&Path>) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        let fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("role", &self.role),
            ("password", &self.password),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                form = form.text(name, value.clone());
            }
        }
        if let Some(path) = image {
            form = form.part("image", file_part(path)?);
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

/// Create a user (admin form, multipart).
pub async fn create_user(draft: &UserDraft, image: Option<&Path>) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = client.post_multipart("/api/user", draft.form(image)?).await?;
    print_envelope(resp).await
}

/// Update a user. The route is a PUT regardless of content type: JSON
/// body normally, multipart when an image is attached.
pub async fn update_user(id: i64, draft: &UserDraft, image: Option<&Path>) -> Result<()> {
    let client = ApiClient::new()?;
    let resp = update_user_request(&client, id, draft, image).await?;
    print_envelope(resp).await
}

async fn update_user_request(
    client: &ApiClient,
    id: i64,
    draft: &UserDraft,
    image: Option<&Path>,
) -> Result<reqwest::Response> {
    let path = format!("/api/user/{}", id);

    if image.is_some() {
        client.put_multipart(&path, draft.form(image)?).await
    } else {
        let mut body = serde_json::Map::new();
        let fields = [
            ("first_name", &draft.first_name),
            ("last_name", &draft.last_name),
            ("email", &draft.email),
            ("phone", &draft.phone),
            ("role", &draft.role),
            ("password", &draft.password),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                body.insert(name.to_string(), serde_json::Value::String(value.clone()));
            }
        }
        client.put(&path, &serde_json::Value::Object(body)).await
    }
}

/// Delete a user, with optional password confirmation.
pub async fn delete_user(id: i64, password: Option<&str>) -> Result<()> {
    let client = ApiClient::new()?;

    let body = password.map(|p| serde_json::json!({ "password": p }));
    let resp = client
        .delete(&format!("/api/user/{}", id), body.as_ref())
        .await?;

    print_envelope(resp).await
}

/// Print the status/message envelope of a mutation response.
pub(super) async fn print_envelope(resp: reqwest::Response) -> Result<()> {
    let envelope: Envelope = resp
        .json()
        .await
        .context("Failed to parse response envelope")?;
    println!(
        "{}",
        envelope.message.as_deref().unwrap_or(if envelope.is_success() {
            "Done."
        } else {
            "Request finished."
        })
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StoredToken;
    use crate::config::Config;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Accept one connection, capture the request head, answer with a
    /// success envelope.
    fn one_shot_server(listener: TcpListener) -> std::thread::JoinHandle<String> {
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 8192];
            let n = stream.read(&mut buf).unwrap();
            let head = String::from_utf8_lossy(&buf[..n]).to_string();

            let body = r#"{"status":"success","message":"Saved"}"#;
            let _ = write!(
                stream,
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            head
        })
    }

    fn test_client(addr: std::net::SocketAddr) -> ApiClient {
        ApiClient::from_config(Config {
            api_base_url: format!("http://{}", addr),
            auth_token: Some(StoredToken::new("tok".into(), None)),
            ..Default::default()
        })
    }

    #[test]
    fn update_with_image_keeps_the_put_route() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = one_shot_server(listener);

        let image = std::env::temp_dir().join("tindahan-cli-test-avatar.png");
        std::fs::write(&image, b"png").unwrap();

        let draft = UserDraft {
            first_name: Some("Maria".into()),
            ..Default::default()
        };
        let client = test_client(addr);
        let _ = tokio_test::block_on(update_user_request(&client, 7, &draft, Some(&image)));

        let head = server.join().unwrap();
        assert!(
            head.starts_with("PUT /api/user/7 "),
            "unexpected request line: {}",
            head.lines().next().unwrap_or("")
        );
        assert!(head.contains("multipart/form-data"));
    }

    #[test]
    fn update_without_image_sends_json_put() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = one_shot_server(listener);

        let draft = UserDraft {
            phone: Some("0917".into()),
            ..Default::default()
        };
        let client = test_client(addr);
        let _ = tokio_test::block_on(update_user_request(&client, 7, &draft, None));

        let head = server.join().unwrap();
        assert!(head.starts_with("PUT /api/user/7 "));
        assert!(head.contains("application/json"));
    }
}
