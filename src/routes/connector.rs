//! Connector routes built from the shared state. Handlers resolve the resource by its descriptor key.

use crate::handlers::connector::{create, delete, descriptor, list, option, options, read, update};
use crate::settings::DEFAULT_BODY_LIMIT;
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

pub fn connector_routes(state: AppState) -> Router {
    connector_routes_with_limit(state, DEFAULT_BODY_LIMIT)
}

pub fn connector_routes_with_limit(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(descriptor))
        .route("/:type_key", get(list).post(create))
        .route("/:type_key/options", get(options))
        .route("/:type_key/options/:id", get(option))
        .route(
            "/:type_key/:id",
            get(read).patch(update).put(update).delete(delete),
        )
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
