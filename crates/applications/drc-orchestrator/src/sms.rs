//! SMS endpoint client
//!
//! Talks to an HTTP relay that forwards messages to Twilio:
//!
//! ```text
//! POST {endpoint}
//! {"to": "...", "body": "...", "accountSid": "...", "authToken": "...", "fromNumber": "..."}
//!
//! 200 {"success": true, "message": "...", "sid": "SM..."}
//! ```
//!
//! A non-2xx status is an error; a 2xx body with `success: false` is a
//! rejected message and is returned as-is.

use crate::error::{OrchestratorError, Result};
use async_trait::async_trait;
use drc_core::{DrcError, SmsGateway, SmsResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default SMS relay endpoint
pub const DEFAULT_SMS_ENDPOINT: &str = "https://twiliosending.azurewebsites.net/api/sendSMS";

/// SMS relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Relay URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Twilio account SID
    #[serde(default)]
    pub account_sid: String,

    /// Twilio auth token
    #[serde(default)]
    pub auth_token: String,

    /// Sender phone number
    #[serde(default)]
    pub from_number: String,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_SMS_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SmsConfig {
    /// Set the relay URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set Twilio credentials
    pub fn with_credentials(
        mut self,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        self.account_sid = account_sid.into();
        self.auth_token = auth_token.into();
        self.from_number = from_number.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Credentials may be blank (the relay decides), the endpoint may not
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(OrchestratorError::config(format!(
                "SMS endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.timeout_secs == 0 {
            return Err(OrchestratorError::config("SMS timeout must be positive"));
        }
        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

/// Request body accepted by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsRequest {
    pub to: String,
    pub body: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// HTTP client for the SMS relay
#[derive(Debug, Clone)]
pub struct SmsClient {
    client: reqwest::Client,
    config: SmsConfig,
}

impl SmsClient {
    pub fn new(config: SmsConfig) -> Result<Self> {
        config.validate()?;
        if !config.has_credentials() {
            warn!("SMS credentials incomplete, relay may reject messages");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SmsConfig {
        &self.config
    }

    fn request(&self, to: &str, body: &str) -> SmsRequest {
        SmsRequest {
            to: to.to_string(),
            body: body.to_string(),
            account_sid: self.config.account_sid.clone(),
            auth_token: self.config.auth_token.clone(),
            from_number: self.config.from_number.clone(),
        }
    }

    /// Send one message
    pub async fn send(&self, to: &str, body: &str) -> Result<SmsResponse> {
        debug!(to, endpoint = %self.config.endpoint, "Sending SMS");

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&self.request(to, body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrchestratorError::sms(format!("HTTP error! Status: {}", status.as_u16())));
        }

        let parsed: SmsResponse = response.json().await?;
        if parsed.success {
            info!(to, sid = ?parsed.sid, "SMS sent");
        } else {
            warn!(to, error = ?parsed.error, "SMS rejected by relay");
        }
        Ok(parsed)
    }
}

#[async_trait]
impl SmsGateway for SmsClient {
    async fn send_sms(&self, to: &str, body: &str) -> drc_core::Result<SmsResponse> {
        self.send(to, body).await.map_err(DrcError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP responder. Returns the endpoint URL and a handle yielding
    /// the raw request body it received.
    async fn mock_relay(
        status: &'static str,
        reply: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            // Read headers, then Content-Length bytes of body
            let body = loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    let body = &text[split + 4..];
                    if body.len() >= length || n == 0 {
                        break body.to_string();
                    }
                }
                if n == 0 {
                    break String::new();
                }
            };

            let response = format!(
                "HTTP/1.1 {}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status,
                reply.len(),
                reply
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            body
        });

        (format!("http://{}/api/sendSMS", addr), handle)
    }

    #[test]
    fn test_config_defaults() {
        let config: SmsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SmsConfig::default());
        assert_eq!(config.endpoint, DEFAULT_SMS_ENDPOINT);
        assert_eq!(config.timeout_secs, 10);
        assert!(!config.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(SmsConfig::default().with_endpoint("ftp://relay").validate().is_err());
        assert!(SmsConfig::default().with_endpoint("").validate().is_err());
        assert!(SmsConfig::default().with_timeout_secs(0).validate().is_err());
        assert!(SmsClient::new(SmsConfig::default().with_endpoint("relay")).is_err());
    }

    #[test]
    fn test_request_wire_format() {
        let config = SmsConfig::default().with_credentials("AC1", "tok", "+15550001");
        let client = SmsClient::new(config).unwrap();
        let json = serde_json::to_value(client.request("+15551234", "hello")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "to": "+15551234",
                "body": "hello",
                "accountSid": "AC1",
                "authToken": "tok",
                "fromNumber": "+15550001",
            })
        );
    }

    #[tokio::test]
    async fn test_send_success() {
        let (endpoint, relay) =
            mock_relay("200 OK", r#"{"success":true,"message":"sent","sid":"SM123"}"#).await;
        let client = SmsClient::new(
            SmsConfig::default()
                .with_endpoint(endpoint)
                .with_credentials("AC1", "tok", "+15550001"),
        )
        .unwrap();

        let response = client.send_sms("+15551234", "hello").await.unwrap();
        assert!(response.success);
        assert_eq!(response.sid.as_deref(), Some("SM123"));

        let sent: SmsRequest = serde_json::from_str(&relay.await.unwrap()).unwrap();
        assert_eq!(sent.to, "+15551234");
        assert_eq!(sent.body, "hello");
        assert_eq!(sent.account_sid, "AC1");
    }

    #[tokio::test]
    async fn test_send_rejected_body_is_ok() {
        let reply = r#"{"success":false,"message":"bad number","error":"invalid"}"#;
        let (endpoint, _relay) = mock_relay("200 OK", reply).await;
        let client = SmsClient::new(SmsConfig::default().with_endpoint(endpoint)).unwrap();

        let response = client.send("+1", "hello").await.unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("invalid"));
    }

    #[tokio::test]
    async fn test_send_http_error() {
        let (endpoint, _relay) = mock_relay("500 Internal Server Error", "{}").await;
        let client = SmsClient::new(SmsConfig::default().with_endpoint(endpoint)).unwrap();

        let err = client.send("+1", "hello").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Sms(ref m) if m == "HTTP error! Status: 500"));

        let (endpoint, _relay) = mock_relay("503 Service Unavailable", "{}").await;
        let client = SmsClient::new(SmsConfig::default().with_endpoint(endpoint)).unwrap();
        let err = client.send_sms("+1", "hello").await.unwrap_err();
        assert!(matches!(err, DrcError::Gateway(_)));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_network_error() {
        // Bind then release a port so nothing is listening on it
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = format!("http://{}/api/sendSMS", addr);
        let client = SmsClient::new(SmsConfig::default().with_endpoint(endpoint)).unwrap();

        let err = client.send("+1", "hello").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Http(ref e) if e.is_connect()));

        let err = client.send_sms("+1", "hello").await.unwrap_err();
        assert!(matches!(err, DrcError::Network(_)));
    }

    #[tokio::test]
    async fn test_malformed_reply_counts_as_failed_delivery() {
        let (endpoint, _relay) = mock_relay("200 OK", "<html>gateway timeout</html>").await;
        let client = SmsClient::new(SmsConfig::default().with_endpoint(endpoint)).unwrap();

        let err = client.send_sms("+1", "hello").await.unwrap_err();
        assert!(matches!(err, DrcError::Network(_)));

        let (endpoint, _relay) = mock_relay("200 OK", "not json").await;
        let client = SmsClient::new(SmsConfig::default().with_endpoint(endpoint)).unwrap();
        let numbers = vec!["+1".to_string()];

        let result = crate::messaging::send_bulk(&client, &numbers, "hello").await.unwrap();
        assert!(result.success.is_empty());
        assert_eq!(result.failed, numbers);
    }
}
