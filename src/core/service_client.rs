// src/core/service_client.rs
//! HTTP client for the authenticated CV endpoints of the INTOWORK backend

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{info, trace};

use crate::types::envelope::{CvAnalytics, RemoteCv, RemoteCvUpdate, Visibility};
use crate::types::{CvData, TemplateId};

const CV_ENDPOINT: &str = "/api/cv/me";
const VISIBILITY_ENDPOINT: &str = "/api/cv/me/visibility";
const ANALYTICS_ENDPOINT: &str = "/api/cv/me/analytics";

/// Remote CV backend as seen by a session
#[async_trait]
pub trait CvApi: Send + Sync {
    /// `None` when the user has no saved CV yet
    async fn fetch_cv(&self) -> Result<Option<RemoteCv>>;
    async fn save_cv(&self, cv_data: &CvData, template: TemplateId, is_public: bool) -> Result<()>;
    async fn toggle_visibility(&self) -> Result<Visibility>;
    async fn fetch_analytics(&self) -> Result<CvAnalytics>;
}

pub struct RemoteCvClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RemoteCvClient {
    /// Create new client; `timeout_seconds` of `None` leaves requests unbounded
    pub fn new(base_url: &str, token: &str, timeout_seconds: Option<u64>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn error_for(response: reqwest::Response, action: &str) -> anyhow::Error {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        anyhow::anyhow!("{} failed with status {}: {}", action, status, error_text)
    }
}

#[async_trait]
impl CvApi for RemoteCvClient {
    async fn fetch_cv(&self) -> Result<Option<RemoteCv>> {
        let url = self.url(CV_ENDPOINT);
        info!("Fetching remote CV: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to GET from {}", url))?;

        let status = response.status();
        trace!("Response status: {}", status);

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::error_for(response, "CV fetch").await);
        }

        let remote: RemoteCv = response
            .json()
            .await
            .context("Failed to parse remote CV response")?;
        Ok(Some(remote))
    }

    async fn save_cv(&self, cv_data: &CvData, template: TemplateId, is_public: bool) -> Result<()> {
        let url = self.url(CV_ENDPOINT);
        let payload = RemoteCvUpdate {
            cv_data,
            template,
            is_public,
        };

        trace!("Saving remote CV: {}", url);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to PUT to {}", url))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response, "CV save").await)
        }
    }

    async fn toggle_visibility(&self) -> Result<Visibility> {
        let url = self.url(VISIBILITY_ENDPOINT);
        info!("Toggling CV visibility: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to POST to {}", url))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, "Visibility toggle").await);
        }

        response
            .json::<Visibility>()
            .await
            .context("Failed to parse visibility response")
    }

    async fn fetch_analytics(&self) -> Result<CvAnalytics> {
        let url = self.url(ANALYTICS_ENDPOINT);
        trace!("Fetching CV analytics: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to GET from {}", url))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, "Analytics fetch").await);
        }

        response
            .json::<CvAnalytics>()
            .await
            .context("Failed to parse analytics response")
    }
}
