use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    auth::{LaterUser, dtos::ErrorResponse},
    items::{
        dtos::{AddItemRequest, ItemListResponse, ItemResponse, ListItemsQuery, ModifyItemRequest},
        service::ItemServiceError,
    },
    resolver::RetrievalErrorKind,
};

impl IntoResponse for ItemServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ItemServiceError::Retrieval(err) => match err.kind() {
                RetrievalErrorKind::InvalidUrl => StatusCode::BAD_REQUEST,
                RetrievalErrorKind::NotFound => StatusCode::UNPROCESSABLE_ENTITY,
                RetrievalErrorKind::UnsupportedContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                RetrievalErrorKind::UnreachableOrUnexpectedStatus
                | RetrievalErrorKind::FetchFailed => StatusCode::BAD_GATEWAY,
                RetrievalErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                RetrievalErrorKind::Interrupted => StatusCode::SERVICE_UNAVAILABLE,
            },
            ItemServiceError::Filter(_) => StatusCode::BAD_REQUEST,
            ItemServiceError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            ItemServiceError::Storage(err) => {
                error!(error = %err, "item store failure");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("Database error")),
                )
                    .into_response();
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    request_body = AddItemRequest,
    params(("X-Later-User-Id" = Uuid, Header, description = "User the item belongs to")),
    responses(
        (status = 201, description = "Item saved (or existing item with merged tags)", body = ItemResponse),
        (status = 400, description = "Invalid URL", body = ErrorResponse),
        (status = 401, description = "Missing user id", body = ErrorResponse),
        (status = 415, description = "Unsupported content type", body = ErrorResponse),
        (status = 422, description = "URL does not resolve to a resource", body = ErrorResponse),
        (status = 502, description = "Upstream unreachable", body = ErrorResponse),
        (status = 504, description = "Upstream timed out", body = ErrorResponse)
    )
)]
pub async fn add_item(
    user: LaterUser,
    State(state): State<AppState>,
    Json(payload): Json<AddItemRequest>,
) -> Response {
    if let Err(error) = payload.validate() {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response();
    }

    match state
        .items
        .add_item(user.user_id, payload.url.trim(), payload.tags)
        .await
    {
        Ok(item) => (StatusCode::CREATED, Json(ItemResponse::from(item))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(
        ("X-Later-User-Id" = Uuid, Header, description = "Owner of the listed items"),
        ListItemsQuery
    ),
    responses(
        (status = 200, description = "Matching items", body = ItemListResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Missing user id", body = ErrorResponse)
    )
)]
pub async fn list_items(
    user: LaterUser,
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> Response {
    let request = match query.into_filter(user.user_id) {
        Ok(request) => request,
        Err(err) => return ItemServiceError::from(err).into_response(),
    };

    match state.items.list_items(&request).await {
        Ok(items) => Json(ItemListResponse {
            items: items.into_iter().map(ItemResponse::from).collect(),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/items/{id}",
    tag = "items",
    request_body = ModifyItemRequest,
    params(
        ("X-Later-User-Id" = Uuid, Header, description = "Owner of the item"),
        ("id" = Uuid, Path, description = "Item id")
    ),
    responses(
        (status = 200, description = "Updated item", body = ItemResponse),
        (status = 401, description = "Missing user id", body = ErrorResponse),
        (status = 404, description = "No such item", body = ErrorResponse)
    )
)]
pub async fn modify_item(
    user: LaterUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModifyItemRequest>,
) -> Response {
    match state
        .items
        .modify_item(user.user_id, id, payload.into())
        .await
    {
        Ok(item) => Json(ItemResponse::from(item)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    params(
        ("X-Later-User-Id" = Uuid, Header, description = "Owner of the item"),
        ("id" = Uuid, Path, description = "Item id")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 401, description = "Missing user id", body = ErrorResponse)
    )
)]
pub async fn delete_item(
    user: LaterUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.items.delete_item(user.user_id, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
