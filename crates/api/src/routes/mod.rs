pub mod health;
pub mod tasks;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                      service and store health
///
/// /users                       list, create (202)
/// /users/{id}                  get, update, delete (202)
///
/// /tasks                       list records (filters, paging)
/// /tasks/{id}                  stored record
/// /tasks/{id}/status           reconciled record
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/users", users::router())
        .nest("/tasks", tasks::router())
}
