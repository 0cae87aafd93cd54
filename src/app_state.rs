use crate::{items::ItemService, repositories::ItemRepositoryTrait, resolver::MetadataRetriever};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub items: ItemService,
}

impl AppState {
    pub fn new(repo: Arc<dyn ItemRepositoryTrait>, retriever: Arc<dyn MetadataRetriever>) -> Self {
        Self {
            items: ItemService::new(repo, retriever),
        }
    }
}
