//! Twitch Helix API client for private replies
//!
//! Twitch no longer accepts whispers over IRC, so replies to private
//! messages go through the Helix whispers endpoint instead.

use anyhow::{Result, anyhow};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Twitch User data response
#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Vec<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
}

/// Request body for the send whisper API
#[derive(Debug, Serialize)]
struct WhisperRequest<'a> {
    message: &'a str,
}

/// Helix API client for sending whispers as the bot
pub struct HelixClient {
    /// HTTP client for API calls
    http_client: HttpClient,
    base_url: String,
    client_id: String,
    /// Bearer token, without any `oauth:` prefix
    token: String,
    bot_login: String,
    /// Bot's Twitch user ID, looked up on first use
    bot_user_id: Option<String>,
}

impl HelixClient {
    /// Create a new Helix API client
    ///
    /// # Arguments
    /// * `client_id` - The application's client ID
    /// * `token` - The bot's OAuth token
    /// * `bot_login` - The bot's login name
    pub fn new(client_id: &str, token: &str, bot_login: &str) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            base_url: HELIX_BASE_URL.to_string(),
            client_id: client_id.to_string(),
            token: token.trim_start_matches("oauth:").to_string(),
            bot_login: bot_login.to_lowercase(),
            bot_user_id: None,
        })
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Get the bot's user ID (cached or from API)
    async fn get_bot_user_id(&mut self) -> Result<String> {
        if let Some(id) = &self.bot_user_id {
            return Ok(id.clone());
        }

        let response = self
            .http_client
            .get(format!("{}/users", self.base_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Client-Id", &self.client_id)
            .query(&[("login", self.bot_login.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Failed to get user ID: {}", error_text));
        }

        let users: UserResponse = response.json().await?;
        let user_id = users
            .data
            .into_iter()
            .next()
            .map(|user| user.id)
            .ok_or_else(|| anyhow!("No user data found for {}", self.bot_login))?;

        self.bot_user_id = Some(user_id.clone());
        Ok(user_id)
    }

    /// Send a whisper from the bot to a user
    ///
    /// # Arguments
    /// * `to_user_id` - Recipient's Twitch user ID
    /// * `message` - Message text to send
    pub async fn send_whisper(&mut self, to_user_id: &str, message: &str) -> Result<()> {
        let from_user_id = self.get_bot_user_id().await?;

        let response = self
            .http_client
            .post(format!("{}/whispers", self.base_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Client-Id", &self.client_id)
            .query(&[
                ("from_user_id", from_user_id.as_str()),
                ("to_user_id", to_user_id),
            ])
            .json(&WhisperRequest { message })
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            error!("API error: {}", error_text);
            return Err(anyhow!("Failed to send whisper: {}", error_text));
        }

        info!("Sent whisper to user {}", to_user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn users_body() -> &'static str {
        r#"{"data": [{"id": "42", "login": "ratbot", "display_name": "RatBot"}]}"#
    }

    #[test]
    fn test_whisper_request_body() {
        let body = serde_json::to_value(WhisperRequest { message: "hello" }).unwrap();
        assert_json_eq!(body, json!({ "message": "hello" }));
    }

    #[tokio::test]
    async fn test_send_whisper_looks_up_bot_once() -> Result<()> {
        let mut server = Server::new_async().await;

        let users = server
            .mock("GET", "/users")
            .match_query(Matcher::UrlEncoded("login".into(), "ratbot".into()))
            .match_header("authorization", "Bearer secret")
            .match_header("client-id", "cid")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(users_body())
            .expect(1)
            .create_async()
            .await;

        let whispers = server
            .mock("POST", "/whispers")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("from_user_id".into(), "42".into()),
                Matcher::UrlEncoded("to_user_id".into(), "7".into()),
            ]))
            .match_body(Matcher::Json(json!({ "message": "hello" })))
            .with_status(204)
            .expect(2)
            .create_async()
            .await;

        let mut client = HelixClient::new("cid", "oauth:secret", "RatBot")?.with_base_url(&server.url());
        client.send_whisper("7", "hello").await?;
        client.send_whisper("7", "hello").await?;

        users.assert_async().await;
        whispers.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_send_whisper_reports_api_errors() -> Result<()> {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(users_body())
            .create_async()
            .await;
        server
            .mock("POST", "/whispers")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": "Forbidden", "message": "missing scope"}"#)
            .create_async()
            .await;

        let mut client = HelixClient::new("cid", "secret", "ratbot")?.with_base_url(&server.url());
        let err = client.send_whisper("7", "hello").await.unwrap_err();
        assert!(err.to_string().contains("missing scope"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_bot_login() -> Result<()> {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        let mut client = HelixClient::new("cid", "secret", "ghost")?.with_base_url(&server.url());
        let err = client.send_whisper("7", "hello").await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
        Ok(())
    }
}
