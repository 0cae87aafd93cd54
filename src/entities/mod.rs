use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::resolver::{MimeType, ResolvedMetadata};

/// --- Tables ---

/// Row of the `items` table. Tags live in `item_tags` and are attached by the
/// repository.
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub resolved_url: String,
    pub mime_type: MimeType,
    pub title: String,
    pub has_image: bool,
    pub has_video: bool,
    pub date_resolved: DateTime<Utc>,
    pub unread: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub resolved_url: String,
    pub mime_type: MimeType,
    pub title: String,
    pub has_image: bool,
    pub has_video: bool,
    pub date_resolved: DateTime<Utc>,
    pub unread: bool,
    pub tags: BTreeSet<String>,
}

impl Item {
    /// New unread item for `user_id` built from freshly resolved metadata.
    pub fn from_metadata(
        user_id: Uuid,
        metadata: ResolvedMetadata,
        tags: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            url: metadata.normal_url,
            resolved_url: metadata.resolved_url.to_string(),
            mime_type: metadata.mime_type,
            title: metadata.title,
            has_image: metadata.has_image,
            has_video: metadata.has_video,
            date_resolved: metadata.date_resolved,
            unread: true,
            tags: tags.into_iter().collect(),
        }
    }

    pub fn from_row(row: ItemRow, tags: BTreeSet<String>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            url: row.url,
            resolved_url: row.resolved_url,
            mime_type: row.mime_type,
            title: row.title,
            has_image: row.has_image,
            has_video: row.has_video,
            date_resolved: row.date_resolved,
            unread: row.unread,
            tags,
        }
    }
}
