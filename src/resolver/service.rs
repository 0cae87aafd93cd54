use async_trait::async_trait;
use chrono::Utc;
use percent_encoding::percent_decode_str;
use reqwest::StatusCode;
use std::{future::Future, time::Duration};
use tracing::{info, instrument, warn};
use url::Url;

use crate::{
    config::Config,
    resolver::{
        classifier::classify,
        errors::{RetrievalError, TransportError},
        scanner::scan,
        transport::{HttpTransport, ReqwestTransport},
        types::{ContentKind, ResolvedMetadata},
    },
};

/// Anything that can turn a submitted URL into [`ResolvedMetadata`].
#[async_trait]
pub trait MetadataRetriever: Send + Sync {
    async fn retrieve(&self, raw_url: &str) -> Result<ResolvedMetadata, RetrievalError>;
}

/// Resolves, classifies and titles URLs.
///
/// A HEAD probe decides what the resource is; only text resources are
/// downloaded and scanned. Every transport call is bounded by `timeout`.
/// No retries are attempted.
pub struct UrlResolver<T> {
    transport: T,
    timeout: Duration,
}

impl UrlResolver<ReqwestTransport> {
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let transport = ReqwestTransport::new(config.resolver_timeout(), config.user_agent())?;
        Ok(Self::new(transport, config.resolver_timeout()))
    }
}

impl<T: HttpTransport> UrlResolver<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    #[instrument(skip(self), fields(url = %raw_url))]
    pub async fn retrieve(&self, raw_url: &str) -> Result<ResolvedMetadata, RetrievalError> {
        match self.resolve(raw_url).await {
            Ok(metadata) => {
                info!(
                    resolved_url = %metadata.resolved_url,
                    mime_type = %metadata.mime_type,
                    "resolved url"
                );
                Ok(metadata)
            }
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "failed to resolve url");
                Err(err)
            }
        }
    }

    async fn resolve(&self, raw_url: &str) -> Result<ResolvedMetadata, RetrievalError> {
        let url = Url::parse(raw_url.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RetrievalError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let probe = self
            .bounded(self.transport.head(&url))
            .await
            .map_err(RetrievalError::from_probe)?;

        check_status(probe.status)?;

        let content_type = probe.content_type().unwrap_or_default();
        let kind = classify(Some(content_type));
        let Some(mime_type) = kind.mime_type() else {
            return Err(RetrievalError::UnsupportedContentType(
                content_type.to_string(),
            ));
        };

        let (title, has_image, has_video) = match kind {
            ContentKind::Image => (file_title(&probe.url_final), true, false),
            ContentKind::Video => (file_title(&probe.url_final), false, true),
            _ => {
                let page = self
                    .bounded(self.transport.get(&probe.url_final))
                    .await
                    .map_err(RetrievalError::from_fetch)?;

                if !page.status.is_success() {
                    return Err(RetrievalError::FetchFailed(format!(
                        "http {}",
                        page.status.as_u16()
                    )));
                }

                let scanned = scan(&page.body_utf8);
                (scanned.title, scanned.has_image, scanned.has_video)
            }
        };

        Ok(ResolvedMetadata {
            normal_url: raw_url.to_string(),
            resolved_url: probe.url_final,
            mime_type,
            title,
            has_image,
            has_video,
            date_resolved: Utc::now(),
        })
    }

    async fn bounded<R>(
        &self,
        request: impl Future<Output = Result<R, TransportError>>,
    ) -> Result<R, TransportError> {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}

#[async_trait]
impl<T: HttpTransport> MetadataRetriever for UrlResolver<T> {
    async fn retrieve(&self, raw_url: &str) -> Result<ResolvedMetadata, RetrievalError> {
        UrlResolver::retrieve(self, raw_url).await
    }
}

fn check_status(status: StatusCode) -> Result<(), RetrievalError> {
    match status.as_u16() {
        200..=299 => Ok(()),
        401 | 404 => Err(RetrievalError::NotFound { status }),
        100..=599 => Err(RetrievalError::Unreachable {
            status: Some(status),
            reason: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }),
        _ => Err(RetrievalError::Unreachable {
            status: Some(status),
            reason: "unrecognized status".to_string(),
        }),
    }
}

/// Last non-empty path segment, percent-decoded. Falls back to the host for
/// URLs without a usable path.
fn file_title(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_default()
}
