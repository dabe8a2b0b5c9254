//! Telegram Bot API sink (`sendMessage`)

use crate::error::SinkError;
use crate::types::Message;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Message sink with its own rate limiting.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send_message(&self, message: &Message) -> Result<(), SinkError>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

pub struct TelegramSink {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(api_url: &str, bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), bot_token),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl ChatSink for TelegramSink {
    async fn send_message(&self, message: &Message) -> Result<(), SinkError> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &message.text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        // without_url: the endpoint embeds the bot token
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SinkError::Http(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|e| SinkError::Http(format!("status {}: {}", status, e.without_url())))?;

        interpret_send_response(status, &body)
    }
}

/// Map a `sendMessage` reply onto the sink error taxonomy.
pub fn interpret_send_response(status: u16, body: &Value) -> Result<(), SinkError> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }

    let code = body
        .get("error_code")
        .and_then(Value::as_i64)
        .unwrap_or(i64::from(status));

    if code == 429 {
        let retry_after = body
            .get("parameters")
            .and_then(|p| p.get("retry_after"))
            .and_then(Value::as_u64)
            .unwrap_or(1);
        return Err(SinkError::RateLimited { retry_after });
    }

    let description = body
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    Err(SinkError::Rejected { code, description })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_response() {
        let body = json!({ "ok": true, "result": { "message_id": 42 } });
        assert!(interpret_send_response(200, &body).is_ok());
    }

    #[test]
    fn test_rate_limited_response() {
        let body = json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 30",
            "parameters": { "retry_after": 30 }
        });
        assert!(matches!(
            interpret_send_response(429, &body),
            Err(SinkError::RateLimited { retry_after: 30 })
        ));
    }

    #[test]
    fn test_other_errors_are_rejections() {
        let body = json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        });
        match interpret_send_response(400, &body) {
            Err(SinkError::Rejected { code, description }) => {
                assert_eq!(code, 400);
                assert_eq!(description, "Bad Request: chat not found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_request_serialization() {
        let request = SendMessageRequest {
            chat_id: "-1001",
            text: "<b>hi</b>",
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["chat_id"], "-1001");
        assert_eq!(value["parse_mode"], "HTML");
        assert_eq!(value["disable_web_page_preview"], true);
    }
}
