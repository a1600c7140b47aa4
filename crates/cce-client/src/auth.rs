//! AK/SK request signing
//!
//! Every provider request is signed with `SDK-HMAC-SHA256`: a canonical
//! form of the request (method, path, sorted query, signed headers and the
//! body digest) is hashed, wrapped in a string-to-sign together with the
//! request timestamp, and HMAC'd with the secret key.

use crate::error::CloudError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Signing algorithm name, also the `Authorization` scheme
pub const SIGNING_ALGORITHM: &str = "SDK-HMAC-SHA256";

/// Header carrying the signing timestamp
pub const DATE_HEADER: &str = "X-Sdk-Date";

/// Header carrying the project the request is scoped to
pub const PROJECT_HEADER: &str = "X-Project-Id";

const DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Access key, secret key and project of one cloud account
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub project_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Region plus credentials; everything needed to build and sign a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAuth {
    pub region: String,
    pub credentials: Credentials,
}

impl ClientAuth {
    pub fn new(region: impl Into<String>, credentials: Credentials) -> Result<Self, CloudError> {
        let region = region.into();
        if region.is_empty() {
            return Err(CloudError::InvalidRequest("region cannot be empty".to_string()));
        }
        if credentials.access_key.is_empty() || credentials.secret_key.is_empty() {
            return Err(CloudError::Authentication(
                "access key and secret key are required".to_string(),
            ));
        }
        Ok(Self { region, credentials })
    }

    pub fn project_id(&self) -> &str {
        &self.credentials.project_id
    }

    /// Sign a request
    ///
    /// `headers` must already contain every header to be signed, including
    /// `Host` and [`DATE_HEADER`]. Returns the `Authorization` header value.
    pub fn authorization(
        &self,
        method: &str,
        url: &Url,
        headers: &BTreeMap<String, String>,
        body: &[u8],
        timestamp: &str,
    ) -> Result<String, CloudError> {
        let signed = signed_headers(headers);
        let canonical = canonical_request(method, url, headers, body);
        let to_sign = format!(
            "{}\n{}\n{}",
            SIGNING_ALGORITHM,
            timestamp,
            hex::encode(Sha256::digest(canonical.as_bytes()))
        );

        let mut mac = Hmac::<Sha256>::new_from_slice(self.credentials.secret_key.as_bytes())
            .map_err(|e| CloudError::Authentication(format!("invalid secret key: {}", e)))?;
        mac.update(to_sign.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!(
            "{} Access={}, SignedHeaders={}, Signature={}",
            SIGNING_ALGORITHM, self.credentials.access_key, signed, signature
        ))
    }
}

/// Signing timestamp in the format the gateway expects
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format(DATE_FORMAT).to_string()
}

pub(crate) fn canonical_request(
    method: &str,
    url: &Url,
    headers: &BTreeMap<String, String>,
    body: &[u8],
) -> String {
    let mut canonical_headers = String::new();
    for (name, value) in lowercase_headers(headers) {
        canonical_headers.push_str(&name);
        canonical_headers.push(':');
        canonical_headers.push_str(value.trim());
        canonical_headers.push('\n');
    }

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        canonical_uri(url),
        canonical_query(url),
        canonical_headers,
        signed_headers(headers),
        hex::encode(Sha256::digest(body))
    )
}

fn canonical_uri(url: &Url) -> String {
    let mut uri = url
        .path_segments()
        .map(|segments| {
            segments
                .map(|s| urlencoding::encode(s).into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();
    uri.insert(0, '/');
    if !uri.ends_with('/') {
        uri.push('/');
    }
    uri
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (urlencoding::encode(&k).into_owned(), urlencoding::encode(&v).into_owned()))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn lowercase_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, &str> {
    headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.as_str()))
        .collect()
}

fn signed_headers(headers: &BTreeMap<String, String>) -> String {
    lowercase_headers(headers)
        .into_keys()
        .collect::<Vec<_>>()
        .join(";")
}
