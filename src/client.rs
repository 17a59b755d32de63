//! HTTP client for a running goalboard server.
//!
//! Configuration is via environment variables:
//! - `GOALBOARD_URL` - Base URL (default: `http://localhost:3001/api`)

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::models::*;
use crate::store::Persistence;

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://localhost:3001/api";

/// HTTP client for the goalboard API.
#[derive(Debug, Clone)]
pub struct GoalboardClient {
    base_url: String,
    client: Client,
}

impl GoalboardClient {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url = std::env::var("GOALBOARD_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url)
    }

    /// Handle response, converting HTTP errors to StoreError.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, body))
        }
    }

    /// Handle response that may return empty body (204 No Content).
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, body))
        }
    }

    // ============================================================
    // Board queries
    // ============================================================

    /// Goals matching `filter`, filtered server-side.
    pub async fn filtered_goals(&self, filter: &GoalFilter) -> Result<Vec<Goal>> {
        let response = self
            .request(reqwest::Method::GET, "/goals")
            .query(&GoalQuery::from(filter))
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn summary(&self, filter: &GoalFilter) -> Result<BoardSummary> {
        let response = self
            .request(reqwest::Method::GET, "/summary")
            .query(&GoalQuery::from(filter))
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn owners(&self) -> Result<Vec<String>> {
        let response = self.request(reqwest::Method::GET, "/owners").send().await?;
        self.handle_response(response).await
    }

    pub async fn get_goal(&self, id: Uuid) -> Result<Goal> {
        let response = self
            .request(reqwest::Method::GET, &format!("/goals/{}", id))
            .send()
            .await?;
        self.handle_response(response).await
    }
}

/// Map a failed response back onto the error the server raised.
fn status_error(status: StatusCode, body: String) -> StoreError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => StoreError::Validation(body),
        StatusCode::NOT_FOUND => not_found_error(&body),
        StatusCode::CONFLICT => StoreError::Conflict(body),
        _ => StoreError::Transport(anyhow::anyhow!("{}: {}", status, body)),
    }
}

/// Recover entity and id from a "Goal not found: <id>" body.
fn not_found_error(body: &str) -> StoreError {
    const ENTITIES: [&str; 4] = ["Goal", "Category", "Sub-goal", "Note"];

    if let Some((entity, id)) = body.split_once(" not found") {
        if let Some(entity) = ENTITIES.iter().find(|e| **e == entity.trim()) {
            return StoreError::not_found(*entity, id.trim_start_matches(':').trim());
        }
    }
    StoreError::not_found("Resource", body.trim())
}

impl Persistence for GoalboardClient {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let response = self.request(reqwest::Method::GET, "/categories").send().await?;
        self.handle_response(response).await
    }

    async fn create_category(&self, input: CreateCategoryInput) -> Result<Category> {
        let response = self
            .request(reqwest::Method::POST, "/categories")
            .json(&input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn update_category(&self, id: Uuid, input: UpdateCategoryInput) -> Result<Category> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/categories/{}", id))
            .json(&input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn delete_category(&self, id: Uuid) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/categories/{}", id))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    async fn list_goals(&self) -> Result<Vec<Goal>> {
        let response = self.request(reqwest::Method::GET, "/goals").send().await?;
        self.handle_response(response).await
    }

    async fn create_goal(&self, input: GoalInput) -> Result<Goal> {
        let response = self
            .request(reqwest::Method::POST, "/goals")
            .json(&input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn update_goal(&self, id: Uuid, input: GoalInput) -> Result<Goal> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/goals/{}", id))
            .json(&input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn delete_goal(&self, id: Uuid) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/goals/{}", id))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    async fn reorder_goals(&self, entries: Vec<ReorderEntry>) -> Result<()> {
        let response = self
            .request(reqwest::Method::PUT, "/goals/reorder")
            .json(&ReorderInput { goals: entries })
            .send()
            .await?;
        self.handle_empty_response(response).await
    }
}
