use axum::{
    Json, Router,
    http::HeaderName,
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    app_state::AppState,
    auth::dtos::ErrorResponse,
    health::{self, HealthResponse},
    items::{
        dtos::{AddItemRequest, ItemListResponse, ItemResponse, ModifyItemRequest},
        handlers,
    },
    resolver::MimeType,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        handlers::add_item,
        handlers::list_items,
        handlers::modify_item,
        handlers::delete_item
    ),
    components(schemas(
        AddItemRequest,
        ModifyItemRequest,
        ItemResponse,
        ItemListResponse,
        MimeType,
        ErrorResponse,
        HealthResponse
    )),
    tags(
        (name = "items", description = "Saved items"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/healthz", get(health::health_check))
        .route("/items", post(handlers::add_item).get(handlers::list_items))
        .route(
            "/items/{id}",
            patch(handlers::modify_item).delete(handlers::delete_item),
        )
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
}
