//! Resource client: the single funnel for every backend call.
//!
//! Attaches the bearer token and a request id, and normalizes the
//! response shape once at this boundary: bodies wrapped in a
//! `{success, data, pagination}` envelope are unwrapped, anything else
//! is taken as the payload itself. Call sites never re-check shapes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::session::TokenProvider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-side error taxonomy
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network unavailable: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// HTTP 429; the only kind the retry executor retries
    #[error("rate limited")]
    RateLimited,

    #[error("client error ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("server error ({status})")]
    Server { status: u16 },

    /// Response body did not match the expected shape
    #[error("unexpected payload: {0}")]
    Payload(String),
}

/// Pagination block of the response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    pagination: Option<Pagination>,
    #[serde(default)]
    message: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    /// POST /auth/login and remember the returned token
    pub async fn login(&self, username: &str, password: &str) -> Result<Value, ApiError> {
        let body = serde_json::json!({ "username": username, "password": password });
        let (payload, _) = self
            .request(Method::POST, "/auth/login", &[], Some(&body))
            .await?;
        let token = payload
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Payload("login response carries no token".to_string()))?;
        self.session.set_token(token.to_string()).await;
        Ok(payload)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let (payload, _) = self.request(Method::GET, path, query, None).await?;
        decode(payload)
    }

    /// GET returning the payload plus the envelope's pagination block
    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(T, Option<Pagination>), ApiError> {
        let (payload, pagination) = self.request(Method::GET, path, query, None).await?;
        Ok((decode(payload)?, pagination))
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode(body)?;
        let (payload, _) = self.request(Method::POST, path, &[], Some(&body)).await?;
        decode(payload)
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode(body)?;
        let (payload, _) = self.request(Method::PUT, path, &[], Some(&body)).await?;
        decode(payload)
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode(body)?;
        let (payload, _) = self.request(Method::PATCH, path, &[], Some(&body)).await?;
        decode(payload)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    /// GET a raw byte stream (exports)
    pub async fn get_bytes(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<u8>, ApiError> {
        let response = self.send(Method::GET, path, query, None).await?;
        let status = response.status();
        if let Some(err) = Self::status_error(status, None) {
            return Err(err);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Perform a request and normalize the response body
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<(Value, Option<Pagination>), ApiError> {
        let response = self.send(method, path, query, body).await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok((Value::Null, None));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let parsed: Option<Value> = serde_json::from_str(&raw).ok();

        if let Some(err) = Self::status_error(status, parsed.as_ref()) {
            return Err(err);
        }

        let value = parsed
            .ok_or_else(|| ApiError::Payload(format!("response is not JSON: {:.120}", raw)))?;
        normalize(value)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .http
            .request(method, url)
            .header("X-Request-Id", Uuid::new_v4().to_string());

        if let Some(token) = self.session.token().await {
            builder = builder.bearer_auth(token);
        }
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Network(e.to_string())
            }
        })
    }

    /// Map a non-success HTTP status to an error kind
    fn status_error(status: StatusCode, body: Option<&Value>) -> Option<ApiError> {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Some(ApiError::RateLimited);
        }
        if status.is_client_error() {
            let message = body
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(Value::as_str)
                })
                .unwrap_or("request rejected")
                .to_string();
            return Some(ApiError::Client {
                status: status.as_u16(),
                message,
            });
        }
        if status.is_server_error() {
            return Some(ApiError::Server {
                status: status.as_u16(),
            });
        }
        None
    }
}

/// Unwrap a `{success, data, pagination}` envelope when present;
/// otherwise the body itself is the payload.
fn normalize(body: Value) -> Result<(Value, Option<Pagination>), ApiError> {
    let is_envelope = body
        .as_object()
        .map(|o| o.get("success").map(Value::is_boolean).unwrap_or(false))
        .unwrap_or(false);
    if !is_envelope {
        return Ok((body, None));
    }

    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| ApiError::Payload(format!("malformed envelope: {}", e)))?;
    if !envelope.success {
        return Err(ApiError::Payload(
            envelope
                .message
                .unwrap_or_else(|| "server reported failure without a message".to_string()),
        ));
    }
    Ok((envelope.data.unwrap_or(Value::Null), envelope.pagination))
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::Payload(e.to_string()))
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Payload(e.to_string()))
}
