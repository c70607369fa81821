//! Request and response values passed through [`ApiClient::send`](super::ApiClient::send).

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use rim_core::Result;
use rim_core::error::{InvalidInputError, TransportError};

use super::endpoints::is_refresh_path;

/// A replayable API request.
///
/// Unlike `reqwest::Request` this keeps the body as JSON so the same request
/// can be sent a second time after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Set a header. `Authorization` is overwritten at send time when a
    /// token is stored.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| InvalidInputError::Other {
            message: format!("request body is not serializable: {}", e),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub(crate) fn is_refresh(&self) -> bool {
        is_refresh_path(&self.path)
    }
}

/// A successful (2xx) API response with its body already read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            TransportError::Decode {
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::ACCEPT;

    #[test]
    fn builder_collects_parts() {
        let request = ApiRequest::get("/maintenance")
            .query("bike_id", 7)
            .query("limit", 20)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/maintenance");
        assert_eq!(
            request.query_pairs(),
            &[
                ("bike_id".to_string(), "7".to_string()),
                ("limit".to_string(), "20".to_string())
            ]
        );
        assert_eq!(request.headers()[ACCEPT], "application/json");
        assert!(request.body().is_none());
        assert!(!request.is_refresh());
    }

    #[test]
    fn json_body() {
        let request = ApiRequest::post("/chat")
            .json(&serde_json::json!({"message": "chain noise at 60 km/h"}))
            .unwrap();
        assert_eq!(request.body().unwrap()["message"], "chain noise at 60 km/h");
    }

    #[test]
    fn refresh_request_is_flagged() {
        assert!(ApiRequest::post("/auth/refresh").is_refresh());
    }

    #[test]
    fn response_decoding() {
        let response = ApiResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            br#"{"mileage": 12840}"#.to_vec(),
        );
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["mileage"], 12840);
        assert_eq!(response.text(), r#"{"mileage": 12840}"#);

        let bad = ApiResponse::new(StatusCode::OK, HeaderMap::new(), b"<html>".to_vec());
        assert!(bad.json::<serde_json::Value>().is_err());
    }
}
