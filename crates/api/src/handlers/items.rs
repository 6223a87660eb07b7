//! Handlers for item CRUD.
//!
//! Each handler parses the request, delegates to [`ItemService`] and wraps
//! the result in the `{ "data": ... }` envelope. Status mapping for
//! failures lives in [`AppError`].
//!
//! [`ItemService`]: crate::services::ItemService
//! [`AppError`]: crate::error::AppError

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use itemkit_core::types::DbId;
use itemkit_db::models::item::{BulkCreateItems, NewItem, UpdateItem};

use crate::error::AppResult;
use crate::query::PaginationParams;
use crate::response::{DataResponse, DeletedResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/items
pub async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<NewItem>,
) -> AppResult<impl IntoResponse> {
    let item = state.items.create(input).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// POST /api/v1/items/bulk
///
/// All-or-nothing: either every item is created or none is.
pub async fn bulk_create_items(
    State(state): State<AppState>,
    Json(input): Json<BulkCreateItems>,
) -> AppResult<impl IntoResponse> {
    let items = state.items.bulk_create(input.items).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: items })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/items?page=&limit=
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let page = state.items.list(params.page, params.limit).await?;

    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/items/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let item = state.items.get(id).await?;

    Ok(Json(DataResponse { data: item }))
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

/// PUT /api/v1/items/{id}
///
/// Partial update; omitted fields keep their current value.
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateItem>,
) -> AppResult<impl IntoResponse> {
    let item = state.items.update(id, input).await?;

    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/items/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.items.delete(id).await?;

    Ok(Json(DataResponse {
        data: DeletedResponse {
            message: "item deleted successfully",
            id,
        },
    }))
}
