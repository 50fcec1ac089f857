use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::upload::UploadPayload;

/// Single attempt per call, but with an explicit deadline instead of the
/// original client's unbounded wait.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct ChatRequest {
    role: String,
    query: String,
}

#[derive(Deserialize)]
struct ChatReply {
    text: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    reply: ChatReply,
}

#[derive(Serialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    email: Option<String>,
}

/// Error bodies carry an optional human-readable message.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    chat_url: String,
    login_url: String,
    upload_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            chat_url: config.chat_url().to_string(),
            login_url: config.login_url().to_string(),
            upload_url: config.upload_url().to_string(),
        })
    }

    /// Send one free-text query with the caller's role; returns the reply
    /// text. Any non-2xx status or transport failure is an error the caller
    /// maps to the fixed error turn outcome. No retries.
    pub async fn chat(&self, role: &str, query: &str) -> Result<String> {
        let request = ChatRequest {
            role: role.to_string(),
            query: query.to_string(),
        };

        let response = self
            .client
            .post(&self.chat_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Chat request failed with status: {}",
                response.status()
            ));
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response.reply.text)
    }

    /// Authenticate an employee. A successful response optionally echoes the
    /// authenticated email; when absent we fall back to the submitted one.
    /// Server-provided error messages are surfaced verbatim.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self
            .client
            .post(&self.login_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("Login failed with status: {}", status));
            return Err(anyhow!(message));
        }

        let login_response: LoginResponse = response.json().await.unwrap_or(LoginResponse {
            email: None,
        });
        Ok(login_response
            .email
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| email.to_string()))
    }

    /// Submit one knowledge upload. Server-provided error messages are
    /// surfaced verbatim, with a generic fallback.
    pub async fn upload(&self, payload: &UploadPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.upload_url)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| "Upload failed.".to_string());
            return Err(anyhow!(message));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest {
            role: "guest".to_string(),
            query: "How do I reset my password?".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["role"], "guest");
        assert_eq!(json["query"], "How do I reset my password?");
    }

    #[test]
    fn test_chat_response_nested_reply_text() {
        let body = r#"{"reply": {"text": "Here you go."}}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.reply.text, "Here you go.");
    }

    #[test]
    fn test_login_response_email_is_optional() {
        let with: LoginResponse =
            serde_json::from_str(r#"{"email": "jane@example.com"}"#).unwrap();
        assert_eq!(with.email.as_deref(), Some("jane@example.com"));

        let without: LoginResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(without.email, None);
    }

    #[test]
    fn test_error_body_message_is_optional() {
        let with: ErrorBody =
            serde_json::from_str(r#"{"message": "Invalid credentials"}"#).unwrap();
        assert_eq!(with.message.as_deref(), Some("Invalid credentials"));

        let without: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(without.message, None);
    }
}
