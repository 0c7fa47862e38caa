use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tower::BoxError;
use tower::timeout::error::Elapsed;

use stockroom_core::DomainError;
use stockroom_infra::{AdjustError, StoreError};
use stockroom_inventory::{SortDirection, SortField};

pub fn adjust_error_to_response(err: AdjustError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        AdjustError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        AdjustError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        AdjustError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        AdjustError::ReadFailure(_) => json_error(StatusCode::BAD_GATEWAY, "read_failure", message),
        AdjustError::WriteFailure(_) => json_error(StatusCode::BAD_GATEWAY, "write_failure", message),
        AdjustError::RolledBack { .. } => json_error(StatusCode::BAD_GATEWAY, "rolled_back", message),
        AdjustError::PartialCommit { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "partial_commit", message)
        }
        AdjustError::UnknownState { .. } => {
            json_error(StatusCode::GATEWAY_TIMEOUT, "unknown_state", message)
        }
        AdjustError::OrderUnresolved { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "order_unresolved", message)
        }
        AdjustError::Interrupted(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "interrupted", message)
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Conflict(_) | StoreError::Duplicate(_) => {
            json_error(StatusCode::CONFLICT, "conflict", message)
        }
        StoreError::Constraint(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "constraint_violation", message)
        }
        StoreError::Backend(_) => json_error(StatusCode::BAD_GATEWAY, "store_error", message),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

/// Errors raised by the tower middleware stack rather than a handler.
pub async fn handle_middleware_error(err: BoxError) -> axum::response::Response {
    if err.is::<Elapsed>() {
        tracing::warn!("request timed out");
        return json_error(StatusCode::SERVICE_UNAVAILABLE, "timeout", "request timed out");
    }
    tracing::error!(error = %err, "unhandled middleware error");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_sort_field(s: &str) -> Result<SortField, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "name" => Ok(SortField::Name),
        "ref_num" => Ok(SortField::RefNum),
        "qty_in_stock" => Ok(SortField::QtyInStock),
        "expiry_date" => Ok(SortField::ExpiryDate),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_sort",
            "sort must be one of: name, ref_num, qty_in_stock, expiry_date",
        )),
    }
}

pub fn parse_sort_direction(s: &str) -> Result<SortDirection, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "asc" => Ok(SortDirection::Asc),
        "desc" => Ok(SortDirection::Desc),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_direction",
            "direction must be one of: asc, desc",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stockroom_inventory::{ItemId, OrderId};

    #[test]
    fn adjust_errors_map_to_statuses() {
        let id = ItemId::new();
        let cases = [
            (AdjustError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AdjustError::NotFound("item"), StatusCode::NOT_FOUND),
            (AdjustError::NotFound("order"), StatusCode::NOT_FOUND),
            (AdjustError::Conflict("x".into()), StatusCode::CONFLICT),
            (AdjustError::ReadFailure("x".into()), StatusCode::BAD_GATEWAY),
            (AdjustError::WriteFailure("x".into()), StatusCode::BAD_GATEWAY),
            (
                AdjustError::RolledBack { attempts: 3, reason: "x".into() },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AdjustError::PartialCommit { item_id: id, committed_qty: 1, reason: "x".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AdjustError::UnknownState { item_id: id, timeout: Duration::from_secs(5) },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                AdjustError::OrderUnresolved { order_id: OrderId::new(), reason: "x".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AdjustError::Interrupted("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(adjust_error_to_response(err).status(), status);
        }
    }

    #[tokio::test]
    async fn elapsed_requests_are_service_unavailable() {
        let timed_out = handle_middleware_error(Box::new(Elapsed::new())).await;
        assert_eq!(timed_out.status(), StatusCode::SERVICE_UNAVAILABLE);

        let other = handle_middleware_error("boom".into()).await;
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn sort_parameters_parse_case_insensitively() {
        assert_eq!(parse_sort_field("Qty_In_Stock").unwrap(), SortField::QtyInStock);
        assert_eq!(parse_sort_direction("DESC").unwrap(), SortDirection::Desc);
        assert_eq!(
            parse_sort_field("price").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
