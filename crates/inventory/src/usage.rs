//! Usage records and the pure planning step of a stock usage adjustment.

use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, UserId};

use crate::{Item, ItemId, UsageRecordId};

/// Kind of stock movement a usage record describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// Stock arriving with a purchase order.
    Received,
    /// Stock consumed through a usage entry.
    Shipped,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Received => "received",
            UpdateType::Shipped => "shipped",
        }
    }
}

impl FromStr for UpdateType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(UpdateType::Received),
            "shipped" => Ok(UpdateType::Shipped),
            other => Err(DomainError::validation(format!("unknown update type '{other}'"))),
        }
    }
}

/// Reporting period a usage entry is booked under.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsagePeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl UsagePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsagePeriod::Daily => "daily",
            UsagePeriod::Weekly => "weekly",
            UsagePeriod::Monthly => "monthly",
        }
    }

    /// Human-readable remark stored on the usage record, e.g. "Weekly usage update".
    pub fn remark(&self) -> String {
        let label = match self {
            UsagePeriod::Daily => "Daily",
            UsagePeriod::Weekly => "Weekly",
            UsagePeriod::Monthly => "Monthly",
        };
        format!("{label} usage update")
    }
}

impl FromStr for UsagePeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(UsagePeriod::Daily),
            "weekly" => Ok(UsagePeriod::Weekly),
            "monthly" => Ok(UsagePeriod::Monthly),
            other => Err(DomainError::validation(format!(
                "period must be one of daily, weekly, monthly (got '{other}')"
            ))),
        }
    }
}

/// Append-only log entry describing one stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: UsageRecordId,
    pub item_id: ItemId,
    pub qty_change: i64,
    pub update_type: UpdateType,
    pub update_date: NaiveDate,
    pub remarks: String,
    pub recorded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for UsageRecord {
    type Id = UsageRecordId;

    fn id(&self) -> UsageRecordId {
        self.id
    }
}

/// A usage record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUsageRecord {
    pub id: UsageRecordId,
    pub item_id: ItemId,
    pub qty_change: i64,
    pub update_type: UpdateType,
    pub update_date: NaiveDate,
    pub remarks: String,
    pub recorded_by: Option<UserId>,
}

impl NewUsageRecord {
    pub fn into_record(self, created_at: DateTime<Utc>) -> UsageRecord {
        UsageRecord {
            id: self.id,
            item_id: self.item_id,
            qty_change: self.qty_change,
            update_type: self.update_type,
            update_date: self.update_date,
            remarks: self.remarks,
            recorded_by: self.recorded_by,
            created_at,
        }
    }
}

/// The two writes an accepted stock movement consists of: a conditional stock
/// update and the usage record describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub item_id: ItemId,
    /// Stock the plan was computed from; the update is conditional on it.
    pub observed_qty: i64,
    pub new_qty: i64,
    pub record: NewUsageRecord,
}

/// Check a usage adjustment against an item's current stock and plan its effects.
///
/// `amount` must be positive and no larger than the stock on hand. No IO happens
/// here; a rejected plan means nothing must be written.
pub fn plan_usage(
    item: &Item,
    amount: i64,
    date: NaiveDate,
    period: UsagePeriod,
    recorded_by: Option<UserId>,
) -> DomainResult<StockMovement> {
    if amount <= 0 {
        return Err(DomainError::validation("usage amount must be greater than zero"));
    }
    if amount > item.qty_in_stock {
        return Err(DomainError::validation(format!(
            "usage amount {amount} exceeds stock on hand ({} {})",
            item.qty_in_stock, item.unit
        )));
    }

    Ok(StockMovement {
        item_id: item.id,
        observed_qty: item.qty_in_stock,
        new_qty: item.qty_in_stock - amount,
        record: NewUsageRecord {
            id: UsageRecordId::new(),
            item_id: item.id,
            qty_change: -amount,
            update_type: UpdateType::Shipped,
            update_date: date,
            remarks: period.remark(),
            recorded_by,
        },
    })
}
