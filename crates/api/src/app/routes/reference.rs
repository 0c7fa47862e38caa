//! Read-only reference data used to fill item forms and filters.

use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/brands", get(list_brands))
        .route("/locations", get(list_locations))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store().list_categories().await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_brands(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.store().list_brands().await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_locations(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store().list_locations().await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
