//! HTTP client for the scheduler API.
//!
//! Thin typed wrapper over reqwest. Every method is a single
//! request/response exchange; failures map to [`ApiError`] and are
//! propagated to the caller without retries.

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::types::{
    Cluster, Execution, ExecutionPage, ListSessionOpts, Node, NodePatch, Session,
    SessionPatch, SessionSpec,
};

/// Typed client for the scheduler API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl ApiClient {
    /// Create a client for the service at `address` authenticating with
    /// the given user token.
    ///
    /// # Errors
    ///
    /// Returns an error if `address` is not a valid absolute URL.
    pub fn new(address: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        let base = Url::parse(address).map_err(|e| {
            ApiError::InvalidAddress(format!("{address}: {e}"))
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token: token.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ApiError::InvalidAddress(format!("{path}: {e}")))?;
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }

    /// Execute a request and deserialize a successful JSON response.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_body<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(builder.json(body)).await
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Create a new session.
    pub async fn create_session(&self, spec: &SessionSpec) -> Result<Session, ApiError> {
        debug!(node = %spec.node, "creating session");
        self.send_body(self.request(Method::POST, "api/v3/sessions")?, spec)
            .await
    }

    /// Fetch a session by ID.
    pub async fn get_session(&self, id: &str) -> Result<Session, ApiError> {
        self.send(self.request(Method::GET, &format!("api/v3/sessions/{id}"))?)
            .await
    }

    /// Apply a partial state update to a session.
    ///
    /// Patching an already-canceled session is not an error at this
    /// layer; the service owns that semantics.
    pub async fn patch_session(
        &self,
        id: &str,
        patch: &SessionPatch,
    ) -> Result<Session, ApiError> {
        debug!(session = %id, "patching session");
        self.send_body(
            self.request(Method::PATCH, &format!("api/v3/sessions/{id}"))?,
            patch,
        )
        .await
    }

    /// List sessions matching the given filters.
    pub async fn list_sessions(&self, opts: &ListSessionOpts) -> Result<Vec<Session>, ApiError> {
        let builder = self
            .request(Method::GET, "api/v3/sessions")?
            .query(&opts.to_query());
        self.send(builder).await
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Fetch a node by ID.
    pub async fn get_node(&self, id: &str) -> Result<Node, ApiError> {
        self.send(self.request(Method::GET, &format!("api/v3/nodes/{id}"))?)
            .await
    }

    /// Apply a partial update to a node.
    pub async fn patch_node(&self, id: &str, patch: &NodePatch) -> Result<(), ApiError> {
        debug!(node = %id, "patching node");
        let builder = self
            .request(Method::PATCH, &format!("api/v3/nodes/{id}"))?
            .json(patch);
        check(builder.send().await?).await?;
        Ok(())
    }

    /// List the executions of a node.
    pub async fn list_executions(&self, node_id: &str) -> Result<Vec<Execution>, ApiError> {
        let page: ExecutionPage = self
            .send(self.request(
                Method::GET,
                &format!("api/v3/nodes/{node_id}/executions"),
            )?)
            .await?;
        Ok(page.data)
    }

    // ========================================================================
    // Clusters
    // ========================================================================

    /// Fetch a cluster by reference (`account/name` or ID).
    pub async fn get_cluster(&self, reference: &str) -> Result<Cluster, ApiError> {
        self.send(self.request(Method::GET, &format!("api/v3/clusters/{reference}"))?)
            .await
    }
}

/// Map a non-success response to [`ApiError::Api`] with the body text.
async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.text().await {
        Ok(body) if !body.is_empty() => body,
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    Err(ApiError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Whether a status code indicates the resource does not exist.
#[must_use]
pub fn is_not_found(err: &ApiError) -> bool {
    matches!(
        err,
        ApiError::Api { status, .. } if *status == StatusCode::NOT_FOUND.as_u16()
    )
}
