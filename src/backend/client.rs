//! HTTP client for the WithYou backend.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

use super::BackendError;

const REGISTER_PATH: &str = "/v1/devices/register";
const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApnsEnvironment {
    Sandbox,
    Production,
}

impl ApnsEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApnsEnvironment::Sandbox => "sandbox",
            ApnsEnvironment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRegisterPayload {
    pub install_id: String,
    pub device_token: String,
    pub timezone: String,
    pub push_enabled: bool,
    pub apns_environment: Option<ApnsEnvironment>,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BackendClient {
    /// `base_url` is expected without a trailing slash.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Any 2xx counts as success; the response body is ignored.
    pub async fn register_device(&self, payload: &DeviceRegisterPayload) -> Result<(), BackendError> {
        let url = format!("{}{}", self.base_url, REGISTER_PATH);
        let mut request = self.http.post(url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let body = if body.trim().is_empty() {
            "<empty>".to_string()
        } else {
            body
        };
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
