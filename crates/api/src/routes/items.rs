//! Route definitions for items, mounted at `/items`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::items;
use crate::state::AppState;

/// Item routes.
///
/// ```text
/// GET    /          -> list_items
/// POST   /          -> create_item
/// POST   /bulk      -> bulk_create_items
/// GET    /{id}      -> get_item
/// PUT    /{id}      -> update_item
/// DELETE /{id}      -> delete_item
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(items::list_items).post(items::create_item))
        .route("/bulk", post(items::bulk_create_items))
        .route(
            "/{id}",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
}
