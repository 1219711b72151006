//! GraphQL transport for the Monday.com API.

use futures::future::BoxFuture;
use serde_json::{json, Value};

use super::MondayError;

/// Monday.com GraphQL endpoint.
pub const API_URL: &str = "https://api.monday.com/v2";

/// API version pinned for stable column-value semantics.
pub const API_VERSION: &str = "2023-10";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP transport for GraphQL POSTs.
///
/// This abstraction allows dependency injection and easier testing by
/// enabling mock transports in tests.
pub trait GraphqlHttp: Send + Sync {
    /// POST a GraphQL request body, returning the parsed response document.
    fn post_json(&self, body: Value) -> BoxFuture<'_, Result<Value, MondayError>>;
}

/// Real transport using reqwest.
pub struct ReqwestGraphqlHttp {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl ReqwestGraphqlHttp {
    /// Create a transport against the production endpoint.
    pub fn new(token: impl Into<String>) -> Result<Self, MondayError> {
        Self::with_timeout(token, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a transport with a custom request timeout.
    pub fn with_timeout(token: impl Into<String>, timeout_secs: u64) -> Result<Self, MondayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MondayError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: API_URL.to_string(),
            token: token.into(),
        })
    }

    /// Override the endpoint URL (for self-hosted proxies).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl GraphqlHttp for ReqwestGraphqlHttp {
    fn post_json(&self, body: Value) -> BoxFuture<'_, Result<Value, MondayError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .header("Content-Type", "application/json")
                .header("Authorization", &self.token)
                .header("API-Version", API_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(|e| MondayError::Http(format!("Request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(MondayError::Http(format!(
                    "HTTP {} from {}",
                    response.status(),
                    self.url
                )));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| MondayError::Http(format!("Failed to read response: {}", e)))
        })
    }
}

/// Monday.com GraphQL client.
///
/// Wraps a transport and handles the GraphQL envelope: request bodies are
/// `{query, variables}`, responses carry either a `data` document or an
/// `errors` array.
pub struct MondayClient {
    http: std::sync::Arc<dyn GraphqlHttp>,
}

impl MondayClient {
    /// Create a client over the given transport.
    pub fn new(http: std::sync::Arc<dyn GraphqlHttp>) -> Self {
        Self { http }
    }

    /// Create a client over the production reqwest transport.
    pub fn connect(token: impl Into<String>) -> Result<Self, MondayError> {
        Ok(Self::new(std::sync::Arc::new(ReqwestGraphqlHttp::new(
            token,
        )?)))
    }

    /// Execute a query or mutation and return the `data` document.
    ///
    /// # Errors
    ///
    /// `MondayError::Api` when the response carries an `errors` array,
    /// `MondayError::MissingData` when it has neither errors nor data.
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value, MondayError> {
        let body = json!({ "query": query, "variables": variables });
        let response = self.http.post_json(body).await?;

        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string()
                })
                .collect();
            return Err(MondayError::Api(messages.join("; ")));
        }

        match response.get("data") {
            Some(data) if !data.is_null() => Ok(data.clone()),
            _ => Err(MondayError::MissingData(
                "response has neither data nor errors".to_string(),
            )),
        }
    }
}

/// Parse an opaque item id into the numeric form the API expects.
pub(super) fn numeric_id(id: &str) -> Result<i64, MondayError> {
    id.parse::<i64>()
        .map_err(|_| MondayError::MissingData(format!("item id '{}' is not numeric", id)))
}

/// Extract an item id from a response value (the API returns ids as
/// strings, older versions as numbers).
pub(super) fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub mod tests {
    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::*;

    /// Mock transport replaying canned responses and recording requests.
    #[derive(Default)]
    pub struct MockGraphqlHttp {
        pub responses: Mutex<VecDeque<Result<Value, MondayError>>>,
        pub requests: Mutex<Vec<Value>>,
    }

    impl MockGraphqlHttp {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_response(&self, response: Result<Value, MondayError>) {
            self.responses.lock().push_back(response);
        }

        pub fn requests(&self) -> Vec<Value> {
            self.requests.lock().clone()
        }
    }

    impl GraphqlHttp for MockGraphqlHttp {
        fn post_json(&self, body: Value) -> BoxFuture<'_, Result<Value, MondayError>> {
            Box::pin(async move {
                self.requests.lock().push(body);
                self.responses
                    .lock()
                    .pop_front()
                    .unwrap_or_else(|| Err(MondayError::Http("no canned response".to_string())))
            })
        }
    }

    #[tokio::test]
    async fn test_execute_returns_data() {
        let http = std::sync::Arc::new(MockGraphqlHttp::new());
        http.push_response(Ok(json!({ "data": { "boards": [] } })));

        let client = MondayClient::new(http.clone());
        let data = client.execute("query { boards { id } }", json!({})).await.unwrap();
        assert_eq!(data, json!({ "boards": [] }));

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["query"], "query { boards { id } }");
    }

    #[tokio::test]
    async fn test_execute_surfaces_api_errors() {
        let http = std::sync::Arc::new(MockGraphqlHttp::new());
        http.push_response(Ok(json!({
            "errors": [ { "message": "Board not found" } ]
        })));

        let client = MondayClient::new(http);
        let err = client.execute("query {}", json!({})).await.unwrap_err();
        assert!(matches!(err, MondayError::Api(ref m) if m.contains("Board not found")));
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_response() {
        let http = std::sync::Arc::new(MockGraphqlHttp::new());
        http.push_response(Ok(json!({})));

        let client = MondayClient::new(http);
        let err = client.execute("query {}", json!({})).await.unwrap_err();
        assert!(matches!(err, MondayError::MissingData(_)));
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id("12345").unwrap(), 12345);
        assert!(numeric_id("abc").is_err());
    }

    #[test]
    fn test_id_from_value() {
        assert_eq!(id_from_value(&json!("42")), Some("42".to_string()));
        assert_eq!(id_from_value(&json!(42)), Some("42".to_string()));
        assert_eq!(id_from_value(&json!(null)), None);
    }
}
