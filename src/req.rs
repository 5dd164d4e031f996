use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, IntoUrl, RequestBuilder, Url};
use serde_json::Value;
use tracing::trace;

use crate::errors::{ChainbaseError, Result};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const BODY_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

pub(crate) const DEFAULT_API_ERROR: &str =
    "An unexpected error occurred while calling the Chainbase API.";

/// Request/response capability shared by both dialect clients.
///
/// Implementations send an authenticated request and decode the response
/// through the uniform envelope validation. The dialect clients are generic
/// over this so tests can script responses without a live server.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// POST a JSON body, optionally to a URL other than the configured base.
    async fn post(&self, body: &Value, url: Option<&str>) -> Result<Value>;

    /// GET, optionally from a URL other than the configured base.
    async fn get(&self, url: Option<&str>) -> Result<Value>;
}

#[derive(Debug, Default)]
pub struct ChainbaseClientBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ChainbaseClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    pub fn build<U: IntoUrl>(
        self,
        base_url: U,
        api_key: &str,
        success_code: i64,
    ) -> Result<ChainbaseClient> {
        let mut key = HeaderValue::from_str(api_key).map_err(|_| ChainbaseError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(API_KEY_HEADER, key);
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(BODY_CONTENT_TYPE));

        let mut builder = Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(default_headers);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder.build()?;
        Ok(ChainbaseClient {
            base_url: base_url.into_url()?,
            success_code,
            inner: client,
        })
    }
}

/// Authenticated HTTP transport against a single Chainbase endpoint.
///
/// The API key travels as a default header on every request. Responses are
/// validated through [`validate_payload`] before any caller sees them; retry
/// policy belongs to the dialect clients, not here.
#[derive(Debug, Clone)]
pub struct ChainbaseClient {
    base_url: Url,
    success_code: i64,
    inner: Client,
}

impl ChainbaseClient {
    pub fn builder() -> ChainbaseClientBuilder {
        ChainbaseClientBuilder::default()
    }

    fn resolve_url(&self, url: Option<&str>) -> Result<Url> {
        match url {
            Some(url) => {
                // The URL crate we use is from the "reqwest" crate which
                // doesn't expose the error and hence we cast it to a string.
                Url::parse(url).map_err(|e| ChainbaseError::UrlParseError(format!("{e}")))
            }
            None => Ok(self.base_url.clone()),
        }
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Value> {
        let res = req.send().await?;
        if !res.status().is_success() {
            return Err(ChainbaseError::HttpError(res.status()));
        }

        let res = res.text().await?;
        trace!(%res, "response");

        let payload: Value = serde_json::from_str(&res)?;
        validate_payload(payload, self.success_code)
    }
}

impl Transport for ChainbaseClient {
    async fn post(&self, body: &Value, url: Option<&str>) -> Result<Value> {
        let url = self.resolve_url(url)?;
        self.execute(self.inner.post(url).json(body)).await
    }

    async fn get(&self, url: Option<&str>) -> Result<Value> {
        let url = self.resolve_url(url)?;
        self.execute(self.inner.get(url)).await
    }
}

/// Validate a decoded response envelope, returning the full payload on
/// success.
///
/// A payload is accepted only when its top-level "code" equals the endpoint's
/// success code and "data" is present and non-null. Some responses report a
/// secondary failure inside an object-shaped "data" via "err_msg"; those are
/// rejected too.
pub(crate) fn validate_payload(payload: Value, success_code: i64) -> Result<Value> {
    if payload.get("code").and_then(Value::as_i64) != Some(success_code) {
        let error = payload
            .get("error")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_API_ERROR);
        return Err(ChainbaseError::ApiError(error.to_string()));
    }

    match payload.get("data") {
        None | Some(Value::Null) => return Err(ChainbaseError::ApiError(DEFAULT_API_ERROR.to_string())),
        Some(data) if !data.is_array() => {
            if let Some(err_msg) = data
                .get("err_msg")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
            {
                return Err(ChainbaseError::ApiError(err_msg.to_string()));
            }
        }
        Some(_) => (),
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_success_payload() {
        let payload = json!({"code": 0, "data": {"result": []}});
        let out = validate_payload(payload.clone(), 0).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn rejects_wrong_code_with_server_error() {
        let payload = json!({"code": 429, "error": "quota exceeded"});
        let err = validate_payload(payload, 0).unwrap_err();
        assert!(matches!(err, ChainbaseError::ApiError(msg) if msg == "quota exceeded"));
    }

    #[test]
    fn rejects_wrong_code_with_fallback_message() {
        // Empty and missing "error" both fall back to the generic message.
        for payload in [json!({"code": 1, "error": ""}), json!({"code": 1})] {
            let err = validate_payload(payload, 0).unwrap_err();
            assert!(matches!(err, ChainbaseError::ApiError(msg) if msg == DEFAULT_API_ERROR));
        }
    }

    #[test]
    fn rejects_missing_code() {
        let err = validate_payload(json!({"data": []}), 0).unwrap_err();
        assert!(matches!(err, ChainbaseError::ApiError(_)));
    }

    #[test]
    fn rejects_null_data() {
        for payload in [json!({"code": 200, "data": null}), json!({"code": 200})] {
            let err = validate_payload(payload, 200).unwrap_err();
            assert!(matches!(err, ChainbaseError::ApiError(msg) if msg == DEFAULT_API_ERROR));
        }
    }

    #[test]
    fn rejects_embedded_err_msg() {
        let payload = json!({"code": 0, "data": {"err_msg": "bad table"}});
        let err = validate_payload(payload, 0).unwrap_err();
        assert!(matches!(err, ChainbaseError::ApiError(msg) if msg == "bad table"));
    }

    #[test]
    fn accepts_array_data_unchecked() {
        // "err_msg" is only looked for inside object-shaped data.
        let payload = json!({"code": 200, "data": [{"err_msg": "ignored"}]});
        assert!(validate_payload(payload, 200).is_ok());
    }
}
