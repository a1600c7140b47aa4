//! Common utilities for the cloud API clients
//!
//! Every service (container engine, VPC, EIP, NAT, DNS, VPC endpoint) is
//! reached through an [`HttpClient`] bound to that service's regional
//! endpoint. Requests are signed with the account's AK/SK and error
//! responses are turned into [`ProviderError`]s.

use crate::auth::{self, ClientAuth, DATE_HEADER, PROJECT_HEADER};
use crate::error::{CloudError, ProviderError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Default endpoint domain for public regions
pub const DEFAULT_DOMAIN: &str = "myhuaweicloud.com";

/// Regional endpoint of a service, e.g. `https://cce.ap-southeast-1.myhuaweicloud.com`
pub fn service_endpoint(service: &str, region: &str, domain: &str) -> String {
    format!("https://{}.{}.{}", service, region, domain)
}

/// Error body as sent by the different services
///
/// The services disagree on field names, so every known spelling is
/// accepted.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "errorCode", alias = "code")]
    error_code: Option<serde_json::Value>,

    #[serde(default, alias = "errorMessage", alias = "message")]
    error_msg: Option<String>,

    #[serde(default)]
    error: Option<NestedErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct NestedErrorBody {
    #[serde(default)]
    code: Option<String>,

    #[serde(default)]
    message: Option<String>,
}

/// Signed HTTP client for one service endpoint
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth: Arc<ClientAuth>,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: impl Into<String>, auth: Arc<ClientAuth>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Project the credentials are scoped to
    pub fn project_id(&self) -> &str {
        self.auth.project_id()
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> Result<Url, CloudError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| CloudError::InvalidRequest(format!("invalid URL for {}: {}", path, e)))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CloudError> {
        let response = self.send(Method::GET, path, None).await?;
        decode(path, response).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, CloudError> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        decode(path, response).await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, CloudError> {
        let response = self.send(Method::PUT, path, Some(body)).await?;
        decode(path, response).await
    }

    /// Make a DELETE request, discarding any response body
    pub async fn delete(&self, path: &str) -> Result<(), CloudError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, CloudError> {
        let url = self.build_url(path)?;
        let payload = match body {
            Some(value) => serde_json::to_vec(value)?,
            None => Vec::new(),
        };
        debug!("{} {}", method, url);

        let host = url
            .host_str()
            .ok_or_else(|| CloudError::InvalidRequest(format!("URL has no host: {}", url)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let timestamp = auth::format_timestamp(chrono::Utc::now());

        let mut signed = BTreeMap::new();
        signed.insert("Host".to_string(), host);
        signed.insert(DATE_HEADER.to_string(), timestamp.clone());
        if !self.auth.project_id().is_empty() {
            signed.insert(PROJECT_HEADER.to_string(), self.auth.project_id().to_string());
        }
        if body.is_some() {
            signed.insert("Content-Type".to_string(), "application/json".to_string());
        }
        let authorization =
            self.auth
                .authorization(method.as_str(), &url, &signed, &payload, &timestamp)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &signed {
            headers.insert(header_name(name)?, header_value(value)?);
        }
        headers.insert(reqwest::header::AUTHORIZATION, header_value(&authorization)?);
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("application/json"));

        let mut request = self.client.request(method.clone(), url).headers(headers);
        if body.is_some() {
            request = request.body(payload);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error = provider_error(response).await;
            debug!("{} {} failed: {}", method, path, error);
            return Err(CloudError::Provider(error));
        }
        Ok(response)
    }
}

fn header_name(name: &str) -> Result<HeaderName, CloudError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| CloudError::InvalidRequest(format!("invalid header {}: {}", name, e)))
}

fn header_value(value: &str) -> Result<HeaderValue, CloudError> {
    HeaderValue::from_str(value)
        .map_err(|e| CloudError::InvalidRequest(format!("invalid header value: {}", e)))
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, CloudError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        CloudError::InvalidResponse(format!(
            "error decoding response from {}: {} - Response (first 500 chars): {}",
            path,
            e,
            text.chars().take(500).collect::<String>()
        ))
    })
}

/// Build a structured error from a failed response
///
/// The status is always kept, even when the body cannot be parsed, so a 404
/// with an unexpected body is still recognised as "not found".
pub(crate) async fn provider_error(response: Response) -> ProviderError {
    let status_code = response.status().as_u16();
    let request_id = response
        .headers()
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let text = response.text().await.unwrap_or_default();
    let mut error = parse_error_body(status_code, &text);
    error.request_id = request_id;
    error
}

pub(crate) fn parse_error_body(status_code: u16, text: &str) -> ProviderError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let nested = body.error.unwrap_or_default();

    let error_code = match body.error_code {
        Some(serde_json::Value::String(code)) => code,
        Some(serde_json::Value::Number(code)) => code.to_string(),
        _ => nested.code.unwrap_or_default(),
    };
    let error_message = body
        .error_msg
        .or(nested.message)
        .unwrap_or_else(|| text.chars().take(500).collect());

    ProviderError::new(status_code, error_code, error_message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cce_error_body() {
        let err = parse_error_body(
            400,
            r#"{"errorCode":"CCE.01400001","errorMessage":"Invalid request."}"#,
        );
        assert_eq!(err.error_code, "CCE.01400001");
        assert_eq!(err.error_message, "Invalid request.");
    }

    #[test]
    fn test_parse_vpc_error_body() {
        let err = parse_error_body(
            404,
            r#"{"error":{"code":"VPC.0202","message":"Query resource by id failed."}}"#,
        );
        assert!(err.is_not_found());
        assert_eq!(err.error_code, "VPC.0202");
    }

    #[test]
    fn test_unparsable_body_keeps_status() {
        let err = parse_error_body(404, "<html>not found</html>");
        assert!(err.is_not_found());
        assert_eq!(err.error_message, "<html>not found</html>");
    }

    #[test]
    fn test_service_endpoint() {
        assert_eq!(
            service_endpoint("cce", "ap-southeast-1", DEFAULT_DOMAIN),
            "https://cce.ap-southeast-1.myhuaweicloud.com"
        );
    }
}
