use crate::resolver::types::ContentKind;

/// Maps a `Content-Type` header value to the kind of resource it describes.
///
/// Parameters such as `charset` are ignored and the comparison is
/// case-insensitive. A missing or blank header is unsupported.
pub fn classify(content_type: Option<&str>) -> ContentKind {
    let Some(content_type) = content_type else {
        return ContentKind::Unsupported;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.starts_with("image/") {
        ContentKind::Image
    } else if essence.starts_with("video/") {
        ContentKind::Video
    } else if essence.starts_with("text/") {
        ContentKind::Article
    } else {
        ContentKind::Unsupported
    }
}
