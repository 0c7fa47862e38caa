//! Dashboard: stock totals plus low-stock and expiring alerts.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::DashboardParams>,
) -> axum::response::Response {
    let query = match params.into_query(Utc::now().date_naive()) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let store = services.store();

    let summary = match store.stock_summary().await {
        Ok(s) => s,
        Err(e) => return errors::store_error_to_response(e),
    };
    let low_stock = match store.low_stock_items(query.low_stock_threshold, query.limit).await {
        Ok(items) => items,
        Err(e) => return errors::store_error_to_response(e),
    };
    let expiring = match store.expiring_items(query.expiring_on_or_before, query.limit).await {
        Ok(items) => items,
        Err(e) => return errors::store_error_to_response(e),
    };

    Json(json!({
        "summary": summary,
        "low_stock_threshold": query.low_stock_threshold,
        "low_stock": low_stock,
        "expiring_on_or_before": query.expiring_on_or_before,
        "expiring": expiring,
    }))
    .into_response()
}
