//! Vercel deployment status client.
//!
//! Two read-only endpoints, bearer-token authenticated, no retries.
//! Non-200 responses surface as errors the router converts to reply text.
#![allow(dead_code)]

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Settings;
use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.vercel.com";

/// How many deployments a status report shows by default.
pub const DEFAULT_DEPLOY_LIMIT: usize = 3;

/// One recent deployment as the API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentsResponse {
    #[serde(default)]
    deployments: Vec<Deployment>,
}

#[derive(Debug, Deserialize)]
struct Project {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    #[serde(default)]
    projects: Vec<Project>,
}

/// Read-only view of the deployment platform.
#[async_trait]
pub trait DeployStatus: Send + Sync {
    async fn latest_deployments(&self, limit: usize) -> Result<Vec<Deployment>>;
    async fn project_names(&self) -> Result<Vec<String>>;
}

pub struct VercelClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl VercelClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: settings.vercel_token(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: Some(token.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| Error::Vercel("VERCEL_TOKEN not set".to_string()))
    }
}

#[async_trait]
impl DeployStatus for VercelClient {
    async fn latest_deployments(&self, limit: usize) -> Result<Vec<Deployment>> {
        let token = self.token()?;
        let response = self
            .client
            .get(format!("{}/v6/deployments?limit={}", self.base_url, limit))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Vercel(format!("HTTP {}: {}", status, body)));
        }

        let data: DeploymentsResponse = response.json().await?;
        Ok(data.deployments)
    }

    async fn project_names(&self) -> Result<Vec<String>> {
        let token = self.token()?;
        let response = self
            .client
            .get(format!("{}/v9/projects", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Vercel(format!("HTTP {}: {}", status, body)));
        }

        let data: ProjectsResponse = response.json().await?;
        Ok(data.projects.into_iter().map(|p| p.name).collect())
    }
}

/// Glyph for a deployment state: ready, failed, or still in flight.
pub fn state_glyph(state: &str) -> &'static str {
    match state {
        "READY" => "✅",
        "ERROR" => "❌",
        _ => "⏳",
    }
}

/// Render deployments as the status report body.
pub fn format_status_report(deployments: &[Deployment]) -> String {
    if deployments.is_empty() {
        return "No recent deployments found.".to_string();
    }

    deployments
        .iter()
        .map(|d| {
            format!(
                "{} **{}**: {} (https://{})",
                state_glyph(&d.state),
                d.name,
                d.state,
                d.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the project list as one line.
pub fn format_project_list(names: &[String]) -> String {
    format!("Projects ({}): {}", names.len(), names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_state_glyphs() {
        assert_eq!(state_glyph("READY"), "✅");
        assert_eq!(state_glyph("ERROR"), "❌");
        assert_eq!(state_glyph("BUILDING"), "⏳");
        assert_eq!(state_glyph("QUEUED"), "⏳");
    }

    #[test]
    fn test_format_status_report() {
        let deployments = vec![Deployment {
            name: "site".to_string(),
            state: "READY".to_string(),
            url: "site.example.com".to_string(),
        }];
        let report = format_status_report(&deployments);
        assert!(report.contains("✅"));
        assert!(report.contains("site"));
        assert!(report.contains("READY"));
        assert!(report.contains("https://site.example.com"));
    }

    #[test]
    fn test_format_empty_report() {
        assert_eq!(format_status_report(&[]), "No recent deployments found.");
    }

    #[test]
    fn test_format_project_list() {
        let names = vec!["octavia".to_string(), "site".to_string()];
        assert_eq!(format_project_list(&names), "Projects (2): octavia, site");
    }

    #[tokio::test]
    async fn test_latest_deployments_fetches_and_parses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/deployments"))
            .and(query_param("limit", "3"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "deployments": [
                    {"name": "site", "state": "READY", "url": "site.example.com"}
                ]
            })))
            .mount(&server)
            .await;

        let client = VercelClient::with_token("tok").with_base_url(server.uri());
        let deployments = client.latest_deployments(3).await.unwrap();
        assert_eq!(deployments.len(), 1);
        assert_eq!(deployments[0].state, "READY");
    }

    #[tokio::test]
    async fn test_non_200_becomes_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v9/projects"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = VercelClient::with_token("tok").with_base_url(server.uri());
        let err = client.project_names().await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_missing_token_is_error() {
        let client = VercelClient {
            client: reqwest::Client::new(),
            token: None,
            base_url: "http://unused".to_string(),
        };
        assert!(client.latest_deployments(3).await.is_err());
    }
}
