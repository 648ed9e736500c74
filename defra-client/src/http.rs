/// HTTP transport for the GraphQL, schema-load and peer-id routes
///
/// Stateless: every call is one request/response. Connection reuse is left
/// to the pool inside `reqwest::Client`.
use crate::config::{ClientConfig, ROUTE_GRAPHQL, ROUTE_PEERID, ROUTE_SCHEMA_LOAD};
use crate::error::{ClientError, Result};
use crate::query::GraphQLRequest;
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// A GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    graphql_url: Url,
    schema_url: Url,
    peerid_url: Url,
}

impl HttpTransport {
    /// Build the transport. Does not contact the node.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            graphql_url: config.route_url(ROUTE_GRAPHQL)?,
            schema_url: config.route_url(ROUTE_SCHEMA_LOAD)?,
            peerid_url: config.route_url(ROUTE_PEERID)?,
        })
    }

    pub fn graphql_url(&self) -> &Url {
        &self.graphql_url
    }

    /// Execute a GraphQL request and return its `data` member.
    ///
    /// Fails on non-2xx status, a body that is not a GraphQL response, or a
    /// non-empty `errors` list.
    pub async fn execute(&self, request: &GraphQLRequest) -> Result<Value> {
        debug!(url = %self.graphql_url, "Executing GraphQL request");

        let response = self
            .http
            .post(self.graphql_url.clone())
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let text = response.text().await?;

        graphql_data(&text)
    }

    /// POST raw schema text and return the parsed JSON body, errors included.
    pub async fn post_schema(&self, schema: &str) -> Result<Value> {
        debug!(url = %self.schema_url, bytes = schema.len(), "Loading schema");

        let response = self
            .http
            .post(self.schema_url.clone())
            .body(schema.to_string())
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        schema_body(status, &text)
    }

    /// GET the node's own peer ID (base-58) from `data.peerID`.
    pub async fn peer_id(&self) -> Result<String> {
        debug!(url = %self.peerid_url, "Fetching peer ID");

        let response = self.http.get(self.peerid_url.clone()).send().await?;
        if response.status() != StatusCode::OK {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::QueryExecution(format!(
                "Failed to get peer ID ({}): {}",
                status, text
            )));
        }

        let body: Value = response.json().await?;
        body.pointer("/data/peerID")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::QueryExecution(format!("peer ID missing from response: {}", body))
            })
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ClientError::QueryExecution(format!("HTTP {}: {}", status, text)))
}

fn malformed(text: &str) -> ClientError {
    ClientError::QueryExecution(format!("malformed response: {}", text))
}

/// Interpret a 2xx GraphQL body: the `data` member, or the first error.
fn graphql_data(text: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(text).map_err(|_| malformed(text))?;
    if !value.is_object() {
        return Err(malformed(text));
    }
    let body: GraphQLResponse = serde_json::from_value(value).map_err(|_| malformed(text))?;

    if let Some(first) = body.errors.as_ref().and_then(|errors| errors.first()) {
        let message = first
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| first.to_string());
        return Err(ClientError::QueryExecution(message));
    }

    Ok(body.data.unwrap_or(Value::Null))
}

/// Interpret a schema-load reply.
///
/// A body carrying an `errors` array is handed back whatever the status, so
/// the "already exists" check sees it. Anything else needs a 2xx status.
fn schema_body(status: StatusCode, text: &str) -> Result<Value> {
    let parsed = serde_json::from_str::<Value>(text).ok();
    let has_errors = parsed
        .as_ref()
        .and_then(|body| body.get("errors"))
        .map_or(false, Value::is_array);

    if !status.is_success() && !has_errors {
        return Err(ClientError::QueryExecution(format!("HTTP {}: {}", status, text)));
    }

    parsed.ok_or_else(|| malformed(text))
}
