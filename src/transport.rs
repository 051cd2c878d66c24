//! HTTP transport against the bridge control surface.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// HTTP operations the handler needs against a bridge.
///
/// This trait is the seam between the pairing/polling state machine and the
/// network: production code uses [`HttpTransport`], tests substitute scripted
/// implementations. Bodies are returned as parsed JSON when the bridge sends
/// JSON and as a raw string value otherwise; callers must handle both.
pub trait Transport: Send + Sync + 'static {
    /// Issue a GET and return the response body.
    fn get(&self, url: &str, timeout: Duration) -> impl Future<Output = Result<Value>> + Send;

    /// Issue a POST with a JSON body and return the response body.
    fn post(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// Issue a PUT with a JSON body and return the response body.
    fn put(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// reqwest-backed [`Transport`] used outside of tests.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_body(action: &str, response: reqwest::Response) -> Result<Value> {
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(action, e))?;
        // Bridges answer JSON, but keep raw strings readable for the caller.
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::http("get", e))?;
        Self::read_body("get", response).await
    }

    async fn post(&self, url: &str, body: &Value, timeout: Duration) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::http("post", e))?;
        Self::read_body("post", response).await
    }

    async fn put(&self, url: &str, body: &Value, timeout: Duration) -> Result<Value> {
        let response = self
            .client
            .put(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::http("put", e))?;
        Self::read_body("put", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_parses_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/testkey/lights"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"1": {"name": "Desk"}})))
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let body = transport
            .get(
                &format!("{}/api/testkey/lights", server.uri()),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(body["1"]["name"], "Desk");
    }

    #[tokio::test]
    async fn test_non_json_body_becomes_raw_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/plain"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let body = transport
            .get(&format!("{}/plain", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, Value::String("not json".to_string()));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .and(body_json(json!({"devicetype": "app#dev user"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"success": {"username": "abc123"}}])),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let body = transport
            .post(
                &format!("{}/api", server.uri()),
                &json!({"devicetype": "app#dev user"}),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(body[0]["success"]["username"], "abc123");
    }

    #[tokio::test]
    async fn test_put_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/testkey/lights/1/state"))
            .and(body_json(json!({"on": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"success": {"/lights/1/state/on": true}}])),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let body = transport
            .put(
                &format!("{}/api/testkey/lights/1/state", server.uri()),
                &json!({"on": true}),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert!(body[0]["success"].is_object());
    }
}
