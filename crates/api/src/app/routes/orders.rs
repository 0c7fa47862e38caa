//! Purchase orders: placing them and receiving stock against them.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use stockroom_auth::CurrentUser;
use stockroom_inventory::OrderId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id/receive", post(receive_order))
}

pub async fn list_orders(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.store().list_orders().await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateOrderBody>,
) -> axum::response::Response {
    let order = match body.into_new_order(Utc::now().date_naive()).validated() {
        Ok(o) => o,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().create_order(order).await {
        Ok(order) => {
            tracing::info!(
                order_id = %order.id,
                item_id = %order.item_id,
                qty_ordered = order.qty_ordered,
                "order placed"
            );
            (StatusCode::CREATED, Json(order)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Mark the order received and add its quantity to the item's stock.
pub async fn receive_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Option<Json<dto::ReceiveOrderBody>>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id");
        }
    };
    let received_date = body
        .and_then(|Json(b)| b.received_date)
        .unwrap_or_else(|| Utc::now().date_naive());

    match services
        .adjuster()
        .receive_order(&user, order_id, received_date)
        .await
    {
        Ok(receipt) => Json(receipt).into_response(),
        Err(e) => errors::adjust_error_to_response(e),
    }
}
