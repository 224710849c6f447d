//! REST client for a remote diagram document service.
//!
//! Thin wrapper over `{base}/diagrams/{id}/shapes|connectors`. Status handling
//! and body parsing are pure functions so they can be tested without a server.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{
    Connector, ConnectorId, Diagram, DiagramId, DiagramStore, NewConnector, NewShape, Shape, ShapeId, ShapePatch,
    StoreError,
};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const STATUS_NOT_FOUND: u16 = 404;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    /// # Errors
    ///
    /// Returns [`StoreError::HttpClientBuild`] if the client cannot be built.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self, diagram: DiagramId, path: &str) -> String {
        diagram_url(&self.base_url, diagram, path)
    }

    /// Send and read the whole body. Transport failures become `Request`.
    async fn send(&self, request: RequestBuilder) -> Result<(u16, String), StoreError> {
        let response = request.send().await.map_err(|e| StoreError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| StoreError::Request(e.to_string()))?;
        Ok((status, text))
    }

    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<&B>,
    ) -> Result<Option<T>, StoreError> {
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let (status, text) = self.send(request).await?;
        parse_optional(status, &text)
    }

    async fn call_required<B: Serialize + Sync>(
        &self,
        diagram: DiagramId,
        path: &str,
        body: &B,
    ) -> Result<Diagram, StoreError> {
        self.call(Method::POST, self.url(diagram, path), Some(body))
            .await?
            .ok_or(StoreError::DiagramNotFound(diagram))
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct ShapesBody<'a, T> {
    shapes: &'a [T],
}

#[derive(Serialize)]
struct ConnectorsBody<'a, T> {
    connectors: &'a [T],
}

#[derive(Serialize)]
struct IdsBody<'a, T> {
    ids: &'a [T],
}

// =============================================================================
// PARSING
// =============================================================================

fn diagram_url(base: &str, diagram: DiagramId, path: &str) -> String {
    format!("{base}/diagrams/{diagram}/{path}")
}

/// Classify a response: 404 is `None`, other non-2xx statuses are errors.
fn parse_optional<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>, StoreError> {
    if status == STATUS_NOT_FOUND {
        return Ok(None);
    }
    if !(200..300).contains(&status) {
        return Err(StoreError::Response { status, body: body.to_owned() });
    }
    serde_json::from_str(body).map(Some).map_err(|e| StoreError::Parse(e.to_string()))
}

// =============================================================================
// STORE
// =============================================================================

#[async_trait::async_trait]
impl DiagramStore for HttpStore {
    fn supports_batch(&self) -> bool {
        true
    }

    async fn get_diagram(&self, diagram: DiagramId) -> Result<Option<Diagram>, StoreError> {
        let url = format!("{}/diagrams/{diagram}", self.base_url);
        self.call::<(), _>(Method::GET, url, None).await
    }

    async fn add_shape(&self, diagram: DiagramId, shape: NewShape) -> Result<Diagram, StoreError> {
        self.call_required(diagram, "shapes", &shape).await
    }

    async fn add_shapes_batch(&self, diagram: DiagramId, shapes: Vec<NewShape>) -> Result<Diagram, StoreError> {
        self.call_required(diagram, "shapes/batch", &ShapesBody { shapes: &shapes }).await
    }

    async fn update_shape(
        &self,
        diagram: DiagramId,
        shape: ShapeId,
        patch: ShapePatch,
    ) -> Result<Option<Diagram>, StoreError> {
        let url = self.url(diagram, &format!("shapes/{shape}"));
        self.call(Method::PATCH, url, Some(&patch)).await
    }

    async fn delete_shape(&self, diagram: DiagramId, shape: ShapeId) -> Result<Option<Diagram>, StoreError> {
        let url = self.url(diagram, &format!("shapes/{shape}"));
        self.call::<(), _>(Method::DELETE, url, None).await
    }

    async fn delete_shapes(&self, diagram: DiagramId, shapes: &[ShapeId]) -> Result<Option<Diagram>, StoreError> {
        let url = self.url(diagram, "shapes/delete");
        self.call(Method::POST, url, Some(&IdsBody { ids: shapes })).await
    }

    async fn get_shape(&self, diagram: DiagramId, shape: ShapeId) -> Result<Option<Shape>, StoreError> {
        let url = self.url(diagram, &format!("shapes/{shape}"));
        self.call::<(), _>(Method::GET, url, None).await
    }

    async fn restore_shapes(&self, diagram: DiagramId, shapes: Vec<Shape>) -> Result<Diagram, StoreError> {
        self.call_required(diagram, "shapes/restore", &ShapesBody { shapes: &shapes }).await
    }

    async fn add_connector(&self, diagram: DiagramId, connector: NewConnector) -> Result<Diagram, StoreError> {
        self.call_required(diagram, "connectors", &connector).await
    }

    async fn add_connectors_batch(
        &self,
        diagram: DiagramId,
        connectors: Vec<NewConnector>,
    ) -> Result<Diagram, StoreError> {
        self.call_required(diagram, "connectors/batch", &ConnectorsBody { connectors: &connectors }).await
    }

    async fn delete_connector(
        &self,
        diagram: DiagramId,
        connector: ConnectorId,
    ) -> Result<Option<Diagram>, StoreError> {
        let url = self.url(diagram, &format!("connectors/{connector}"));
        self.call::<(), _>(Method::DELETE, url, None).await
    }

    async fn delete_connectors(
        &self,
        diagram: DiagramId,
        connectors: &[ConnectorId],
    ) -> Result<Option<Diagram>, StoreError> {
        let url = self.url(diagram, "connectors/delete");
        self.call(Method::POST, url, Some(&IdsBody { ids: connectors })).await
    }

    async fn restore_connectors(&self, diagram: DiagramId, connectors: Vec<Connector>) -> Result<Diagram, StoreError> {
        self.call_required(diagram, "connectors/restore", &ConnectorsBody { connectors: &connectors }).await
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
