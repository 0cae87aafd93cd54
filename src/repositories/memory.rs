use crate::{
    entities::Item,
    items::filter::ItemQuery,
    repositories::{DuplicateItem, ItemRepositoryTrait},
};
use anyhow::Result;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local item store. Evaluates composed queries directly against the
/// stored items.
#[derive(Clone, Default)]
pub struct InMemoryItemRepository {
    items: Arc<RwLock<HashMap<Uuid, Item>>>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemRepositoryTrait for InMemoryItemRepository {
    async fn find_by_user_and_resolved_url(
        &self,
        user_id: Uuid,
        resolved_url: &str,
    ) -> Result<Option<Item>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .find(|item| item.user_id == user_id && item.resolved_url == resolved_url)
            .cloned())
    }

    async fn find_by_user_and_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Item>> {
        let items = self.items.read().await;
        Ok(items
            .get(&id)
            .filter(|item| item.user_id == user_id)
            .cloned())
    }

    async fn insert(&self, item: &Item) -> Result<Item> {
        let mut items = self.items.write().await;

        if items.values().any(|existing| {
            existing.user_id == item.user_id && existing.resolved_url == item.resolved_url
        }) {
            return Err(DuplicateItem {
                user_id: item.user_id,
                resolved_url: item.resolved_url.clone(),
            }
            .into());
        }

        items.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn update(&self, item: &Item) -> Result<Item> {
        let mut items = self.items.write().await;

        let Some(existing) = items
            .get_mut(&item.id)
            .filter(|existing| existing.user_id == item.user_id)
        else {
            anyhow::bail!("Item {} not found", item.id);
        };

        existing.unread = item.unread;
        existing.tags = item.tags.clone();
        Ok(existing.clone())
    }

    async fn delete_by_user_and_id(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let mut items = self.items.write().await;

        if items.get(&id).is_some_and(|item| item.user_id == user_id) {
            items.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn find_all(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let items = self.items.read().await;

        let mut matching: Vec<Item> = items
            .values()
            .filter(|item| query.predicate.matches(item))
            .cloned()
            .collect();
        matching.sort_by(|a, b| query.ordering.compare(a, b));
        matching.truncate(usize::try_from(query.limit).unwrap_or(usize::MAX));

        Ok(matching)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
