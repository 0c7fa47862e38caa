//! Dashboard summaries: stock totals, low-stock alerts and expiring items.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Item;

/// Items at or below this quantity count as low on stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Items expiring within this many days count as expiring.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: u32 = 30;

/// Longest alert list returned by default.
pub const DEFAULT_ALERT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub item_count: u64,
    /// Sum of `qty_in_stock` over all items, regardless of unit.
    pub total_units: i64,
    pub out_of_stock: u64,
}

impl StockSummary {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        items.into_iter().fold(Self::default(), |mut summary, item| {
            summary.item_count += 1;
            summary.total_units = summary.total_units.saturating_add(item.qty_in_stock);
            if item.qty_in_stock == 0 {
                summary.out_of_stock += 1;
            }
            summary
        })
    }
}

/// Items with `qty_in_stock <= threshold`, emptiest first, then by name.
pub fn low_stock<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    threshold: i64,
    limit: u32,
) -> Vec<Item> {
    let mut matched: Vec<&Item> = items
        .into_iter()
        .filter(|item| item.qty_in_stock <= threshold)
        .collect();
    matched.sort_by(|a, b| {
        a.qty_in_stock
            .cmp(&b.qty_in_stock)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    });
    matched.into_iter().take(limit as usize).cloned().collect()
}

/// Items whose expiry date is on or before `on_or_before` (already expired
/// included), soonest first. Items without an expiry date never match.
pub fn expiring<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    on_or_before: NaiveDate,
    limit: u32,
) -> Vec<Item> {
    let mut matched: Vec<(NaiveDate, &Item)> = items
        .into_iter()
        .filter_map(|item| item.expiry_date.map(|date| (date, item)))
        .filter(|(date, _)| *date <= on_or_before)
        .collect();
    matched.sort_by(|(da, a), (db, b)| {
        da.cmp(db)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    });
    matched
        .into_iter()
        .take(limit as usize)
        .map(|(_, item)| item.clone())
        .collect()
}
