use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminUser, AuthUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::videos())
        .merge(routes::media())
        .merge(routes::uploads(state.upload_max_bytes))
        .merge(routes::admin())
        .merge(routes::users())
        .merge(routes::search());

    Router::new()
        .nest("/v1", api)
        .layer(cors)
        .with_state(state)
}
