#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::Request,
    response::Response,
};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use later::{
    app_state::AppState,
    auth::USER_ID_HEADER,
    repositories::{InMemoryItemRepository, ItemRepository, ItemRepositoryTrait},
    resolver::{ReqwestTransport, UrlResolver},
    router::router,
};

fn resolver() -> Arc<UrlResolver<ReqwestTransport>> {
    let timeout = Duration::from_secs(5);
    let transport = ReqwestTransport::new(timeout, "LaterBot/test").unwrap();
    Arc::new(UrlResolver::new(transport, timeout))
}

pub fn memory_app() -> Router {
    let repo: Arc<dyn ItemRepositoryTrait> = Arc::new(InMemoryItemRepository::new());
    router(AppState::new(repo, resolver()))
}

pub fn postgres_app(pool: Pool<Postgres>) -> Router {
    let repo: Arc<dyn ItemRepositoryTrait> = Arc::new(ItemRepository::new(pool));
    router(AppState::new(repo, resolver()))
}

pub fn json_request(method: &str, uri: &str, user_id: Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user_id.to_string())
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str, user_id: Uuid) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}
