use axum::http::StatusCode;
use axum::response::Response;
use chrono::{Days, NaiveDate};
use serde::Deserialize;

use stockroom_core::DomainError;
use stockroom_inventory::dashboard::{
    DEFAULT_ALERT_LIMIT, DEFAULT_EXPIRY_WINDOW_DAYS, DEFAULT_LOW_STOCK_THRESHOLD,
};
use stockroom_inventory::{
    BrandId, CategoryId, InventoryFilters, ItemId, ItemQuery, ItemSort, LocationId, NewOrder,
    Page,
};

use crate::app::errors;

/// Query string of `GET /inventory/items`. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ListItemsParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub location: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id<T>(value: &Option<String>) -> Result<Option<T>, Response>
where
    T: std::str::FromStr<Err = DomainError>,
{
    present(value)
        .map(|v| v.parse::<T>())
        .transpose()
        .map_err(errors::domain_error_to_response)
}

impl ListItemsParams {
    pub fn into_query(self) -> Result<ItemQuery, Response> {
        let filters = InventoryFilters {
            search: present(&self.search).map(str::to_string),
            category: parse_id::<CategoryId>(&self.category)?,
            brand: parse_id::<BrandId>(&self.brand)?,
            location: parse_id::<LocationId>(&self.location)?,
        };

        let mut sort = ItemSort::default();
        if let Some(field) = present(&self.sort) {
            sort.field = errors::parse_sort_field(field)?;
        }
        if let Some(direction) = present(&self.direction) {
            sort.direction = errors::parse_sort_direction(direction)?;
        }

        let page = Page::new(
            self.page.unwrap_or(0),
            self.page_size.unwrap_or(Page::DEFAULT_SIZE),
        )
        .map_err(errors::domain_error_to_response)?;

        Ok(ItemQuery { filters, sort, page })
    }
}

/// Body of `POST /inventory/items/:id/usage`.
#[derive(Debug, Deserialize)]
pub struct UsageRequestBody {
    pub amount: i64,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// `daily`, `weekly` or `monthly`; defaults to `daily`.
    #[serde(default)]
    pub period: Option<String>,
    /// Stock the client last displayed.
    #[serde(default)]
    pub expected_qty: Option<i64>,
}

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub item_id: ItemId,
    pub qty_ordered: i64,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub order_placed_date: Option<NaiveDate>,
}

impl CreateOrderBody {
    pub fn into_new_order(self, today: NaiveDate) -> NewOrder {
        NewOrder {
            item_id: self.item_id,
            qty_ordered: self.qty_ordered,
            order_placed_date: self.order_placed_date.unwrap_or(today),
        }
    }
}

/// Body of `POST /orders/:id/receive`. An empty object receives today.
#[derive(Debug, Default, Deserialize)]
pub struct ReceiveOrderBody {
    #[serde(default)]
    pub received_date: Option<NaiveDate>,
}

/// Query string of `GET /dashboard`.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub low_stock_threshold: Option<i64>,
    pub expiring_within_days: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardQuery {
    pub low_stock_threshold: i64,
    pub expiring_on_or_before: NaiveDate,
    pub limit: u32,
}

impl DashboardParams {
    pub fn into_query(self, today: NaiveDate) -> Result<DashboardQuery, Response> {
        let low_stock_threshold = self.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        if low_stock_threshold < 0 {
            return Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "low_stock_threshold must not be negative",
            ));
        }

        let limit = self.limit.unwrap_or(DEFAULT_ALERT_LIMIT);
        if limit == 0 || limit > Page::MAX_SIZE {
            return Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                format!("limit must be between 1 and {}", Page::MAX_SIZE),
            ));
        }

        let days = self.expiring_within_days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
        let expiring_on_or_before = today
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| {
                errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    "expiring_within_days is out of range",
                )
            })?;

        Ok(DashboardQuery {
            low_stock_threshold,
            expiring_on_or_before,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_inventory::{SortDirection, SortField};

    #[test]
    fn empty_params_give_default_query() {
        let query = ListItemsParams {
            search: Some("  ".to_string()),
            category: Some(String::new()),
            ..Default::default()
        }
        .into_query()
        .unwrap();

        assert_eq!(query, ItemQuery::default());
    }

    #[test]
    fn params_are_parsed() {
        let category = CategoryId::new();
        let query = ListItemsParams {
            search: Some("flour".to_string()),
            category: Some(category.to_string()),
            sort: Some("expiry_date".to_string()),
            direction: Some("desc".to_string()),
            page: Some(2),
            page_size: Some(5),
            ..Default::default()
        }
        .into_query()
        .unwrap();

        assert_eq!(query.filters.search.as_deref(), Some("flour"));
        assert_eq!(query.filters.category, Some(category));
        assert_eq!(query.sort.field, SortField::ExpiryDate);
        assert_eq!(query.sort.direction, SortDirection::Desc);
        assert_eq!(query.page.offset(), 10);
    }

    #[test]
    fn bad_ids_and_page_sizes_are_rejected() {
        let bad_id = ListItemsParams { brand: Some("nope".to_string()), ..Default::default() };
        assert_eq!(bad_id.into_query().unwrap_err().status(), StatusCode::BAD_REQUEST);

        let too_big = ListItemsParams { page_size: Some(1_000), ..Default::default() };
        assert_eq!(too_big.into_query().unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dashboard_defaults_look_a_month_ahead() {
        let query = DashboardParams::default().into_query(day(2024, 1, 20)).unwrap();

        assert_eq!(
            query,
            DashboardQuery {
                low_stock_threshold: 10,
                expiring_on_or_before: day(2024, 2, 19),
                limit: 10,
            }
        );
    }

    #[test]
    fn dashboard_params_are_bounded() {
        let today = day(2024, 1, 20);
        for params in [
            DashboardParams { low_stock_threshold: Some(-1), ..Default::default() },
            DashboardParams { limit: Some(0), ..Default::default() },
            DashboardParams { limit: Some(Page::MAX_SIZE + 1), ..Default::default() },
            DashboardParams { expiring_within_days: Some(u32::MAX), ..Default::default() },
        ] {
            assert_eq!(params.into_query(today).unwrap_err().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn order_placed_date_defaults_to_today() {
        let body: CreateOrderBody = serde_json::from_value(serde_json::json!({
            "item_id": ItemId::new(),
            "qty_ordered": 4,
        }))
        .unwrap();

        assert_eq!(body.into_new_order(day(2024, 5, 1)).order_placed_date, day(2024, 5, 1));
    }
}
