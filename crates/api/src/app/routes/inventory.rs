use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use stockroom_auth::CurrentUser;
use stockroom_infra::UsageRequest;
use stockroom_inventory::{ItemDetails, ItemId, UsagePeriod};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).put(update_item))
        .route("/items/:id/usage", post(record_usage))
}

fn parse_item_id(id: &str) -> Result<ItemId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ListItemsParams>,
) -> axum::response::Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.store().list_items(&query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ItemDetails>,
) -> axum::response::Response {
    let details = match body.validated() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().create_item(details).await {
        Ok(item) => {
            tracing::info!(item_id = %item.id, ref_num = %item.ref_num, "item created");
            (StatusCode::CREATED, Json(item)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.store().get_item(item_id).await {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<ItemDetails>,
) -> axum::response::Response {
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let details = match body.validated() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().update_item(item_id, details).await {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// The single entry point for stock usage: decrement stock and log the usage.
pub async fn record_usage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<dto::UsageRequestBody>,
) -> axum::response::Response {
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let period = match body.period.as_deref().map(str::parse::<UsagePeriod>).transpose() {
        Ok(p) => p.unwrap_or_default(),
        Err(e) => return errors::domain_error_to_response(e),
    };

    let request = UsageRequest {
        item_id,
        amount: body.amount,
        date: body.date.unwrap_or_else(|| Utc::now().date_naive()),
        period,
        expected_qty: body.expected_qty,
    };

    match services.adjuster().adjust(&user, request).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(e) => errors::adjust_error_to_response(e),
    }
}
