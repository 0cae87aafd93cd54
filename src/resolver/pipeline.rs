use crate::resolver::types::PageResponse;
use bytes::Bytes;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::{StatusCode, header::HeaderMap};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

const SNIFF_LEN: usize = 4096;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static META_HTTP_EQUIV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap()
});

/// Turns a raw GET response body into a [`PageResponse`] with UTF-8 text.
///
/// Bytes that are invalid in the detected charset become U+FFFD; a page is
/// never rejected for its encoding.
pub fn process_response(
    url_final: Url,
    status: StatusCode,
    headers: &HeaderMap,
    body_bytes: &Bytes,
) -> PageResponse {
    let content_type = crate::resolver::types::content_type(headers).unwrap_or_default();
    let encoding = detect_charset(content_type, body_bytes);
    let body_utf8 = decode_to_utf8(body_bytes, encoding);

    PageResponse {
        url_final,
        status,
        body_utf8,
    }
}

fn label_charset(regex: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

fn detect_charset(content_type: &str, body_bytes: &[u8]) -> &'static Encoding {
    // 1. Content-Type header
    if let Some(encoding) = label_charset(&CHARSET_REGEX, content_type) {
        return encoding;
    }

    // 2. <meta charset> / <meta http-equiv> near the top of the document
    let search_bytes = &body_bytes[..body_bytes.len().min(SNIFF_LEN)];
    let search_str = String::from_utf8_lossy(search_bytes);

    if let Some(encoding) = label_charset(&META_CHARSET_REGEX, &search_str)
        .or_else(|| label_charset(&META_HTTP_EQUIV_REGEX, &search_str))
    {
        return encoding;
    }

    // 3. Heuristic detection
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(search_bytes, body_bytes.len() <= SNIFF_LEN);
    detector.guess(None, true)
}

fn decode_to_utf8(body_bytes: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, used, had_errors) = encoding.decode(body_bytes);

    if had_errors {
        debug!(encoding = used.name(), "replaced malformed bytes while decoding body");
    }

    decoded.into_owned()
}
