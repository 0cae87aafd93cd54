use chrono::{DateTime, Utc};
use reqwest::{StatusCode, header::HeaderMap};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

/// Result of a header-only probe.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub url_final: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ProbeResponse {
    pub fn content_type(&self) -> Option<&str> {
        content_type(&self.headers)
    }
}

/// Result of a full GET, body decoded to UTF-8.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub url_final: Url,
    pub status: StatusCode,
    pub body_utf8: String,
}

pub(crate) fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
}

/// Canonical media label stored with an item.
#[derive(
    sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[sqlx(type_name = "mime_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MimeType {
    Text,
    Image,
    Video,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for a response's media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Article,
    Image,
    Video,
    Unsupported,
}

impl ContentKind {
    pub fn mime_type(&self) -> Option<MimeType> {
        match self {
            Self::Article => Some(MimeType::Text),
            Self::Image => Some(MimeType::Image),
            Self::Video => Some(MimeType::Video),
            Self::Unsupported => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    pub title: String,
    pub has_image: bool,
    pub has_video: bool,
}

/// Everything learned about a submitted URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMetadata {
    pub normal_url: String,
    pub resolved_url: Url,
    pub mime_type: MimeType,
    pub title: String,
    pub has_image: bool,
    pub has_video: bool,
    pub date_resolved: DateTime<Utc>,
}
