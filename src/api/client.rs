//! HTTP client for the evaluation backend.

use crate::api::{EvaluationSource, FetchError};
use crate::models::{RawPayload, RunStatus, RunsListResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    /// Bearer token sent with every request when set.
    pub auth_token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            auth_token: None,
            timeout_seconds: 30,
        }
    }
}

/// Sort direction for the runs listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filters for [`ApiClient::list_runs`]. Unset fields are left to the backend.
#[derive(Debug, Clone, Default)]
pub struct RunsQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub status: Option<RunStatus>,
    pub order_by: Option<String>,
    pub order: Option<SortOrder>,
}

impl RunsQuery {
    /// Newest runs first.
    pub fn latest(limit: Option<u32>) -> Self {
        Self {
            limit,
            order_by: Some("created_at".to_string()),
            order: Some(SortOrder::Desc),
            ..Self::default()
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset.filter(|o| *o > 0) {
            params.push(("offset", offset.to_string()));
        }
        if let Some(status) = self.status.filter(|s| *s != RunStatus::Unknown) {
            params.push(("status", status.to_string()));
        }
        if let Some(ref order_by) = self.order_by {
            params.push(("order_by", order_by.clone()));
        }
        if let Some(order) = self.order {
            params.push(("order", order.as_str().to_string()));
        }
        params
    }
}

/// Client for the evaluation backend REST API.
pub struct ApiClient {
    base_url: String,
    auth_token: Option<String>,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("uxlens/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
            timeout_seconds: config.timeout_seconds,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the detailed evaluation of a run.
    pub async fn get_evaluation(&self, run_id: &str) -> Result<RawPayload, FetchError> {
        let endpoint = format!("/api/evaluation/{}", run_id);
        self.get_json(&endpoint, &[("include_details", "true".to_string())])
            .await
    }

    /// List analysis runs visible to the authenticated user.
    pub async fn list_runs(&self, query: &RunsQuery) -> Result<RunsListResponse, FetchError> {
        let body = self
            .get_json("/api/runs", &query.params())
            .await
            .map_err(|e| match e {
                FetchError::NotFoundYet => FetchError::Http {
                    status: 404,
                    detail: "runs endpoint not found".to_string(),
                },
                other => other,
            })?;

        serde_json::from_value(body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {}", url);

        let mut request = self.http_client.get(&url).query(query);
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Transport(format!(
                    "request timed out after {}s",
                    self.timeout_seconds
                ))
            } else if e.is_connect() {
                FetchError::Transport(format!(
                    "cannot connect to evaluation backend at {}",
                    self.base_url
                ))
            } else {
                FetchError::Transport(format!("failed to send request: {}", e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFoundYet);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    FetchError::Unauthorized(detail)
                }
                _ => FetchError::Http {
                    status: status.as_u16(),
                    detail,
                },
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl EvaluationSource for ApiClient {
    async fn fetch_evaluation(&self, run_id: &str) -> Result<RawPayload, FetchError> {
        self.get_evaluation(run_id).await
    }
}

/// Extract the `detail` message from an error body, if it has one.
fn error_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    match json.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(r#"{"detail":"Token expired"}"#).as_deref(),
            Some("Token expired")
        );
        assert_eq!(error_detail("<html>502</html>"), None);
        assert_eq!(error_detail(r#"{"message":"x"}"#), None);
    }

    #[test]
    fn test_runs_query_params() {
        let query = RunsQuery {
            status: Some(RunStatus::Completed),
            ..RunsQuery::latest(Some(20))
        };

        let params = query.params();
        assert_eq!(
            params,
            vec![
                ("limit", "20".to_string()),
                ("status", "completed".to_string()),
                ("order_by", "created_at".to_string()),
                ("order", "desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_runs_query_skips_zero_values() {
        let query = RunsQuery {
            limit: Some(0),
            offset: Some(0),
            ..RunsQuery::default()
        };
        assert!(query.params().is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new(ApiClientConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..ApiClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
