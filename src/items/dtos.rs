use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    entities::Item,
    items::{
        filter::{ContentTypeFilter, DEFAULT_LIMIT, FilterError, FilterRequest, ReadState, SortOrder},
        service::ItemChanges,
    },
    resolver::MimeType,
};

const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub url: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl AddItemRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("URL cannot be empty".to_string());
        }
        if self.url.len() > MAX_URL_LENGTH {
            return Err("URL too long".to_string());
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err("Tags cannot be blank".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModifyItemRequest {
    pub read: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub replace_tags: bool,
}

impl From<ModifyItemRequest> for ItemChanges {
    fn from(request: ModifyItemRequest) -> Self {
        ItemChanges {
            read: request.read,
            tags: request.tags,
            replace_tags: request.replace_tags,
        }
    }
}

/// Query string of `GET /items`. Values are parsed by [`ListItemsQuery::into_filter`]
/// so bad values surface as 400s with a useful message.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListItemsQuery {
    /// `unread` (default), `read` or `all`
    pub state: Option<String>,
    /// `article`, `image`, `video` or `all` (default)
    pub content_type: Option<String>,
    /// `newest` (default), `oldest`, `title` or `site`
    pub sort: Option<String>,
    pub limit: Option<i64>,
    /// Comma separated; matches items carrying any of them
    pub tags: Option<String>,
}

impl ListItemsQuery {
    pub fn into_filter(self, user_id: Uuid) -> Result<FilterRequest, FilterError> {
        let state = match self.state.as_deref() {
            Some(state) => state.parse::<ReadState>()?,
            None => ReadState::default(),
        };
        let content_type = match self.content_type.as_deref() {
            Some(content_type) => content_type.parse::<ContentTypeFilter>()?,
            None => ContentTypeFilter::default(),
        };
        let sort = self
            .sort
            .as_deref()
            .map(SortOrder::parse_lenient)
            .unwrap_or_default();
        let tags = self
            .tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(FilterRequest {
            user_id,
            state,
            content_type,
            sort,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            tags,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: Uuid,
    pub normal_url: String,
    pub resolved_url: String,
    pub mime_type: MimeType,
    pub title: String,
    pub has_image: bool,
    pub has_video: bool,
    pub unread: bool,
    pub date_resolved: DateTime<Utc>,
    pub tags: Vec<String>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            normal_url: item.url,
            resolved_url: item.resolved_url,
            mime_type: item.mime_type,
            title: item.title,
            has_image: item.has_image,
            has_video: item.has_video,
            unread: item.unread,
            date_resolved: item.date_resolved,
            tags: item.tags.into_iter().collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemListResponse {
    pub items: Vec<ItemResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_item_request_valid() {
        let request = AddItemRequest {
            url: "https://example.com".to_string(),
            tags: BTreeSet::from(["rust".to_string()]),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_add_item_request_empty_url() {
        let request = AddItemRequest {
            url: "  ".to_string(),
            tags: BTreeSet::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_add_item_request_url_too_long() {
        let request = AddItemRequest {
            url: "a".repeat(2049),
            tags: BTreeSet::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_add_item_request_blank_tag() {
        let request = AddItemRequest {
            url: "https://example.com".to_string(),
            tags: BTreeSet::from([" ".to_string()]),
        };
        assert_eq!(request.validate(), Err("Tags cannot be blank".to_string()));
    }

    #[test]
    fn test_modify_request_defaults() {
        let request: ModifyItemRequest = serde_json::from_str(r#"{"read": true}"#).unwrap();
        let changes = ItemChanges::from(request);
        assert!(changes.read);
        assert!(changes.tags.is_empty());
        assert!(!changes.replace_tags);

        let request: ModifyItemRequest =
            serde_json::from_str(r#"{"read": false, "tags": ["a"], "replaceTags": true}"#).unwrap();
        assert!(request.replace_tags);
    }

    #[test]
    fn test_empty_query_uses_defaults() {
        let user_id = Uuid::new_v4();
        let filter = ListItemsQuery::default().into_filter(user_id).unwrap();
        assert_eq!(filter, FilterRequest::new(user_id));
    }

    #[test]
    fn test_query_parsing() {
        let query = ListItemsQuery {
            state: Some("READ".to_string()),
            content_type: Some("video".to_string()),
            sort: Some("nonsense".to_string()),
            limit: Some(3),
            tags: Some("a, b,,".to_string()),
        };

        let filter = query.into_filter(Uuid::new_v4()).unwrap();
        assert_eq!(filter.state, ReadState::Read);
        assert_eq!(filter.content_type, ContentTypeFilter::Video);
        assert_eq!(filter.sort, SortOrder::Newest);
        assert_eq!(filter.limit, 3);
        assert_eq!(
            filter.tags,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_query_rejects_unknown_state() {
        let query = ListItemsQuery {
            state: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            query.into_filter(Uuid::new_v4()),
            Err(FilterError::InvalidArgument(_))
        ));
    }
}
