//! HTTP implementation of [`ClusterApi`]

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use super::models::{Cluster, ClusterStatus, LogEntry, Project};
use super::ClusterApi;
use crate::config::ApiConfig;

/// HTTP client errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to build HTTP client: {0}")]
    ClientError(String),

    #[error("Request to {url} failed: {message}")]
    RequestError { url: String, message: String },

    #[error("{url} returned status {status}")]
    StatusError { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    DecodeError { url: String, message: String },
}

/// List endpoints answer either with a bare array or with `{ "results": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Wrapped { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Wrapped { results } => results,
            Self::Bare(items) => items,
        }
    }
}

/// Console API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("clusterwatch/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.resolve_token(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let url = self.url(path);
        let mut request = self.client.get(&url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| ApiError::RequestError {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::StatusError {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| ApiError::RequestError {
            url: url.clone(),
            message: e.to_string(),
        })?;

        decode_list(&body).map_err(|e| ApiError::DecodeError {
            url,
            message: e.to_string(),
        })
    }
}

fn decode_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, serde_json::Error> {
    serde_json::from_str::<ListResponse<T>>(body).map(ListResponse::into_vec)
}

#[async_trait]
impl ClusterApi for ApiClient {
    async fn clusters(&self, organization_id: &str) -> Result<Vec<Cluster>, ApiError> {
        self.get_list(&format!("/organization/{}/cluster", organization_id))
            .await
    }

    async fn cluster_statuses(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ClusterStatus>, ApiError> {
        self.get_list(&format!("/organization/{}/cluster/status", organization_id))
            .await
    }

    async fn cluster_logs(
        &self,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<Vec<LogEntry>, ApiError> {
        self.get_list(&format!(
            "/organization/{}/cluster/{}/logs",
            organization_id, cluster_id
        ))
        .await
    }

    async fn projects(&self, organization_id: &str) -> Result<Vec<Project>, ApiError> {
        self.get_list(&format!("/organization/{}/project", organization_id))
            .await
    }
}
