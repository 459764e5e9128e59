use anyhow::Context;
use reqwest::{header::HeaderMap, Method, RequestBuilder, StatusCode};
use serde_json::Value;

/// Thin reqwest wrapper for calling `/functions/v1/<name>` on a playground server.
#[derive(Clone)]
pub struct FunctionsClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// A function reply; non-JSON bodies are kept as a JSON string.
#[derive(Debug)]
pub struct FunctionResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl FunctionResponse {
    /// The `error` message of a failed call, if the server sent one.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

impl FunctionsClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Request builder for a function, carrying the bearer token when one is set.
    pub fn request(&self, method: Method, name: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.function_url(name));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn invoke(&self, method: Method, name: &str, body: Option<&Value>) -> anyhow::Result<FunctionResponse> {
        let mut builder = self.request(method, name);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await
    }

    /// PUT raw bytes to an absolute URL, such as a signed upload URL.
    pub async fn put_bytes(&self, url: &str, bytes: Vec<u8>) -> anyhow::Result<FunctionResponse> {
        let builder = self
            .http
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        self.send(builder).await
    }

    pub async fn send(&self, builder: RequestBuilder) -> anyhow::Result<FunctionResponse> {
        let response = builder.send().await.context("request failed")?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.context("failed to read response body")?;

        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(FunctionResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_function_urls() {
        let client = FunctionsClient::new("http://127.0.0.1:3000/", None);
        assert_eq!(client.function_url("db-ops"), "http://127.0.0.1:3000/functions/v1/db-ops");
        assert!(!client.has_token());
    }

    #[test]
    fn reads_error_messages() {
        let response = FunctionResponse {
            status: StatusCode::BAD_REQUEST,
            headers: HeaderMap::new(),
            body: serde_json::json!({"error": "Missing 'table' field", "code": "INVALID_REQUEST"}),
        };
        assert_eq!(response.error_message(), Some("Missing 'table' field"));
    }
}
