pub mod health;
pub mod items;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /items                 list (paginated), create
/// /items/bulk            bulk create
/// /items/{id}            get, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/items", items::router())
}
