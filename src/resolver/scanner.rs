use regex::Regex;
use std::sync::LazyLock;

use crate::resolver::types::ScanResult;

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());

static IMG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b").unwrap());

static VIDEO_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<video\b").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Tolerant scan of raw markup for the page title and embedded media.
///
/// This is not a parser: unclosed or malformed markup simply yields an empty
/// title and/or `false` flags.
pub fn scan(html: &str) -> ScanResult {
    ScanResult {
        title: extract_title(html),
        has_image: IMG_REGEX.is_match(html),
        has_video: VIDEO_REGEX.is_match(html),
    }
}

fn extract_title(html: &str) -> String {
    let Some(raw) = TITLE_REGEX.captures(html).and_then(|caps| caps.get(1)) else {
        return String::new();
    };

    let decoded = decode_entities(raw.as_str());
    WHITESPACE_REGEX
        .replace_all(decoded.trim(), " ")
        .into_owned()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    // &amp; last so "&amp;lt;" stays literal "&lt;"
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
