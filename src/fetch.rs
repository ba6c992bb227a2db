use crate::config::AisegConfig;
use crate::error::AppError;
use async_trait::async_trait;
use diqwest::WithDigestAuth;
use reqwest::StatusCode;
use std::time::Duration;

/// AISEG2 page showing the daily energy flow totals and the circuit table.
const STATUS_PAGE: &str = "/page/electricflow/111";

/// Contract the poll loop needs from the transport layer: one authenticated
/// page fetch with three outcomes (body / auth rejection / network failure).
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(&self) -> Result<String, AppError>;
}

/// Fetches the status page from the monitor's embedded web server, which only
/// speaks HTTP Digest authentication.
pub struct AisegClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl AisegClient {
    pub fn new(cfg: &AisegConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| AppError::Network(format!("build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: format!("http://{}", cfg.host),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
        })
    }
}

#[async_trait]
impl StatusFetcher for AisegClient {
    async fn fetch_status(&self) -> Result<String, AppError> {
        let url = format!("{}{STATUS_PAGE}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send_with_digest_auth(&self.username, &self.password)
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Auth(format!(
                "monitor rejected credentials ({})",
                response.status()
            ))),
            status if !status.is_success() => Err(AppError::Network(format!(
                "unexpected status {status} from {url}"
            ))),
            _ => response
                .text()
                .await
                .map_err(|e| AppError::Network(format!("read body: {e}"))),
        }
    }
}
