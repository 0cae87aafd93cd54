use std::{collections::BTreeSet, sync::Arc};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::Item,
    items::filter::{FilterError, FilterRequest, compose},
    repositories::{DuplicateItem, ItemRepositoryTrait},
    resolver::{MetadataRetriever, RetrievalError},
};

#[derive(Error, Debug)]
pub enum ItemServiceError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("item {0} not found")]
    ItemNotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Changes requested for an existing item.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub read: bool,
    pub tags: BTreeSet<String>,
    pub replace_tags: bool,
}

#[derive(Clone)]
pub struct ItemService {
    repo: Arc<dyn ItemRepositoryTrait>,
    retriever: Arc<dyn MetadataRetriever>,
}

impl ItemService {
    pub fn new(repo: Arc<dyn ItemRepositoryTrait>, retriever: Arc<dyn MetadataRetriever>) -> Self {
        Self { repo, retriever }
    }

    /// Resolves `url` and stores it for `user_id`.
    ///
    /// Submitting a URL that resolves to one the user already saved does not
    /// create a second item: the new tags are merged into the existing one and
    /// it is returned unchanged otherwise.
    #[instrument(skip(self, tags), fields(user_id = %user_id))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        url: &str,
        tags: BTreeSet<String>,
    ) -> Result<Item, ItemServiceError> {
        let metadata = self.retriever.retrieve(url).await?;

        let existing = self
            .repo
            .find_by_user_and_resolved_url(user_id, metadata.resolved_url.as_str())
            .await?;

        if let Some(item) = existing {
            return self.merge_tags(item, tags).await;
        }

        let resolved_url = metadata.resolved_url.to_string();
        match self
            .repo
            .insert(&Item::from_metadata(user_id, metadata, tags.clone()))
            .await
        {
            Ok(item) => {
                info!(item_id = %item.id, resolved_url = %item.resolved_url, "saved new item");
                Ok(item)
            }
            // A concurrent add of the same URL won the insert
            Err(err) if err.is::<DuplicateItem>() => {
                let item = self
                    .repo
                    .find_by_user_and_resolved_url(user_id, &resolved_url)
                    .await?
                    .ok_or(err)?;
                self.merge_tags(item, tags).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn merge_tags(
        &self,
        mut item: Item,
        tags: BTreeSet<String>,
    ) -> Result<Item, ItemServiceError> {
        if tags.is_empty() {
            return Ok(item);
        }
        item.tags.extend(tags);
        info!(item_id = %item.id, "merged tags into existing item");
        Ok(self.repo.update(&item).await?)
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn list_items(&self, request: &FilterRequest) -> Result<Vec<Item>, ItemServiceError> {
        let query = compose(request)?;
        Ok(self.repo.find_all(&query).await?)
    }

    #[instrument(skip(self, changes), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn modify_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        changes: ItemChanges,
    ) -> Result<Item, ItemServiceError> {
        let mut item = self
            .repo
            .find_by_user_and_id(user_id, item_id)
            .await?
            .ok_or(ItemServiceError::ItemNotFound(item_id))?;

        item.unread = !changes.read;
        if changes.replace_tags {
            item.tags.clear();
        }
        item.tags.extend(changes.tags);

        Ok(self.repo.update(&item).await?)
    }

    /// Deleting an item that does not exist is not an error.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn delete_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ItemServiceError> {
        let deleted = self.repo.delete_by_user_and_id(user_id, item_id).await?;
        if deleted {
            info!("deleted item");
        }
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), ItemServiceError> {
        Ok(self.repo.ping().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        items::filter::ReadState,
        repositories::{InMemoryItemRepository, item::MockItemRepositoryTrait},
        resolver::{MimeType, ResolvedMetadata},
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use url::Url;

    /// Resolves URLs from a fixed table; unknown URLs are 404s.
    struct StaticRetriever {
        resolved: HashMap<&'static str, &'static str>,
    }

    impl StaticRetriever {
        fn new(pairs: &[(&'static str, &'static str)]) -> Self {
            Self {
                resolved: pairs.iter().copied().collect(),
            }
        }
    }

    #[async_trait]
    impl MetadataRetriever for StaticRetriever {
        async fn retrieve(&self, raw_url: &str) -> Result<ResolvedMetadata, RetrievalError> {
            let resolved = self
                .resolved
                .get(raw_url)
                .ok_or(RetrievalError::NotFound {
                    status: StatusCode::NOT_FOUND,
                })?;
            Ok(ResolvedMetadata {
                normal_url: raw_url.to_string(),
                resolved_url: Url::parse(resolved).unwrap(),
                mime_type: MimeType::Text,
                title: format!("Title of {resolved}"),
                has_image: false,
                has_video: false,
                date_resolved: Utc::now(),
            })
        }
    }

    fn service(pairs: &[(&'static str, &'static str)]) -> ItemService {
        ItemService::new(
            Arc::new(InMemoryItemRepository::new()),
            Arc::new(StaticRetriever::new(pairs)),
        )
    }

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_item_stores_resolved_metadata() {
        let service = service(&[("http://short.link/x", "https://example.com/article")]);
        let user_id = Uuid::new_v4();

        let item = service
            .add_item(user_id, "http://short.link/x", tags(&["news"]))
            .await
            .unwrap();

        assert_eq!(item.user_id, user_id);
        assert_eq!(item.url, "http://short.link/x");
        assert_eq!(item.resolved_url, "https://example.com/article");
        assert_eq!(item.title, "Title of https://example.com/article");
        assert!(item.unread);
        assert_eq!(item.tags, tags(&["news"]));
    }

    #[tokio::test]
    async fn test_add_duplicate_resolved_url_merges_tags() {
        let service = service(&[
            ("http://short.link/x", "https://example.com/article"),
            ("https://example.com/article", "https://example.com/article"),
        ]);
        let user_id = Uuid::new_v4();

        let first = service
            .add_item(user_id, "http://short.link/x", tags(&["news"]))
            .await
            .unwrap();
        let second = service
            .add_item(user_id, "https://example.com/article", tags(&["later"]))
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.tags, tags(&["later", "news"]));

        let all = service
            .list_items(&FilterRequest {
                state: ReadState::All,
                ..FilterRequest::new(user_id)
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_add_duplicate_without_tags_returns_existing() {
        let service = service(&[("https://example.com/a", "https://example.com/a")]);
        let user_id = Uuid::new_v4();

        let first = service
            .add_item(user_id, "https://example.com/a", tags(&["keep"]))
            .await
            .unwrap();
        let again = service
            .add_item(user_id, "https://example.com/a", BTreeSet::new())
            .await
            .unwrap();

        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn test_add_item_propagates_retrieval_error() {
        let service = service(&[]);

        let err = service
            .add_item(Uuid::new_v4(), "https://gone.example.com", BTreeSet::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ItemServiceError::Retrieval(RetrievalError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_modify_item() {
        let service = service(&[("https://example.com/a", "https://example.com/a")]);
        let user_id = Uuid::new_v4();
        let item = service
            .add_item(user_id, "https://example.com/a", tags(&["one"]))
            .await
            .unwrap();

        let merged = service
            .modify_item(
                user_id,
                item.id,
                ItemChanges {
                    read: true,
                    tags: tags(&["two"]),
                    replace_tags: false,
                },
            )
            .await
            .unwrap();
        assert!(!merged.unread);
        assert_eq!(merged.tags, tags(&["one", "two"]));

        let replaced = service
            .modify_item(
                user_id,
                item.id,
                ItemChanges {
                    read: false,
                    tags: tags(&["three"]),
                    replace_tags: true,
                },
            )
            .await
            .unwrap();
        assert!(replaced.unread);
        assert_eq!(replaced.tags, tags(&["three"]));
    }

    #[tokio::test]
    async fn test_modify_missing_item() {
        let service = service(&[]);
        let item_id = Uuid::new_v4();

        let err = service
            .modify_item(Uuid::new_v4(), item_id, ItemChanges::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ItemServiceError::ItemNotFound(id) if id == item_id));
    }

    #[tokio::test]
    async fn test_list_items_rejects_bad_limit_before_querying() {
        let mut repo = MockItemRepositoryTrait::new();
        repo.expect_find_all().never();
        let service = ItemService::new(Arc::new(repo), Arc::new(StaticRetriever::new(&[])));

        let err = service
            .list_items(&FilterRequest {
                limit: 0,
                ..FilterRequest::new(Uuid::new_v4())
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ItemServiceError::Filter(FilterError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let mut repo = MockItemRepositoryTrait::new();
        repo.expect_find_by_user_and_resolved_url()
            .returning(|_, _| Err(anyhow::anyhow!("Database connection failed")));
        repo.expect_insert().never();
        let service = ItemService::new(
            Arc::new(repo),
            Arc::new(StaticRetriever::new(&[(
                "https://example.com/a",
                "https://example.com/a",
            )])),
        );

        let err = service
            .add_item(Uuid::new_v4(), "https://example.com/a", BTreeSet::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ItemServiceError::Storage(_)));
    }

    #[tokio::test]
    async fn test_add_item_merges_when_concurrent_insert_wins() {
        let user_id = Uuid::new_v4();
        let winner = Item {
            tags: tags(&["first"]),
            ..Item::from_metadata(
                user_id,
                ResolvedMetadata {
                    normal_url: "https://example.com/a".to_string(),
                    resolved_url: Url::parse("https://example.com/a").unwrap(),
                    mime_type: MimeType::Text,
                    title: "A".to_string(),
                    has_image: false,
                    has_video: false,
                    date_resolved: Utc::now(),
                },
                BTreeSet::new(),
            )
        };

        let mut repo = MockItemRepositoryTrait::new();
        let mut lookups = 0;
        let stored = winner.clone();
        repo.expect_find_by_user_and_resolved_url()
            .times(2)
            .returning(move |_, _| {
                lookups += 1;
                // Absent before our insert, present after the rival's commit
                Ok((lookups > 1).then(|| stored.clone()))
            });
        repo.expect_insert().times(1).returning(|item| {
            Err(DuplicateItem {
                user_id: item.user_id,
                resolved_url: item.resolved_url.clone(),
            }
            .into())
        });
        repo.expect_update()
            .times(1)
            .returning(|item| Ok(item.clone()));
        let service = ItemService::new(
            Arc::new(repo),
            Arc::new(StaticRetriever::new(&[(
                "https://example.com/a",
                "https://example.com/a",
            )])),
        );

        let item = service
            .add_item(user_id, "https://example.com/a", tags(&["second"]))
            .await
            .unwrap();

        assert_eq!(item.id, winner.id);
        assert_eq!(item.tags, tags(&["first", "second"]));
    }

    #[tokio::test]
    async fn test_insert_failure_other_than_duplicate_is_storage_error() {
        let mut repo = MockItemRepositoryTrait::new();
        repo.expect_find_by_user_and_resolved_url()
            .times(1)
            .returning(|_, _| Ok(None));
        repo.expect_insert()
            .returning(|_| Err(anyhow::anyhow!("disk full")));
        repo.expect_update().never();
        let service = ItemService::new(
            Arc::new(repo),
            Arc::new(StaticRetriever::new(&[(
                "https://example.com/a",
                "https://example.com/a",
            )])),
        );

        let err = service
            .add_item(Uuid::new_v4(), "https://example.com/a", tags(&["x"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ItemServiceError::Storage(_)));
    }

    #[tokio::test]
    async fn test_delete_item_is_idempotent() {
        let service = service(&[("https://example.com/a", "https://example.com/a")]);
        let user_id = Uuid::new_v4();
        let item = service
            .add_item(user_id, "https://example.com/a", BTreeSet::new())
            .await
            .unwrap();

        service.delete_item(user_id, item.id).await.unwrap();
        service.delete_item(user_id, item.id).await.unwrap();

        let remaining = service
            .list_items(&FilterRequest::new(user_id))
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }
}
