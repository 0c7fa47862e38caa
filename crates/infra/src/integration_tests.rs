//! Integration tests for the adjustment pipeline.
//!
//! Tests: StockAdjuster → InventoryStore (in-memory) under concurrent load.
//!
//! Verifies:
//! - Concurrent adjustments on one item never drive stock negative
//! - Exactly one usage record exists per successful adjustment
//! - Adjustments on different items do not interfere
//! - A purchase order is received exactly once under concurrent receipts

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use stockroom_auth::CurrentUser;
    use stockroom_core::UserId;
    use stockroom_inventory::{Item, ItemDetails, NewOrder, OrderStatus, UpdateType, UsagePeriod};

    use crate::adjuster::{AdjustError, AdjusterConfig, StockAdjuster, UsageRequest};
    use crate::store::{InMemoryInventoryStore, InventoryStore};

    async fn seed_item(store: &InMemoryInventoryStore, name: &str, qty: i64) -> Item {
        let details = ItemDetails {
            ref_num: format!("REF-{name}"),
            name: name.to_string(),
            category_id: store.add_category("Dry goods").unwrap().id,
            brand_id: store.add_brand("House").unwrap().id,
            location_id: store.add_location("Back store").unwrap().id,
            qty_in_stock: qty,
            unit: "kg".to_string(),
            lot_num: None,
            expiry_date: None,
            pack_size: None,
            remarks: None,
        };
        store.create_item(details).await.unwrap()
    }

    fn usage(item: &Item, amount: i64) -> UsageRequest {
        UsageRequest {
            item_id: item.id,
            amount,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            period: UsagePeriod::Weekly,
            expected_qty: None,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adjustments_never_oversell() {
        let store = Arc::new(InMemoryInventoryStore::new());
        let item = seed_item(&store, "rice", 100).await;
        let adjuster = Arc::new(StockAdjuster::new(store.clone(), AdjusterConfig::default()));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let adjuster = adjuster.clone();
            let req = usage(&item, 10);
            handles.push(tokio::spawn(async move {
                let user = CurrentUser::new(UserId::new(), vec![]);
                adjuster.adjust(&user, req).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(AdjustError::Validation(_)) => {}
                Err(other) => panic!("unexpected adjustment failure: {other}"),
            }
        }

        assert_eq!(succeeded, 10);
        let after = store.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(after.qty_in_stock, 0);

        let records = store.usage_records_for(item.id).unwrap();
        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| r.qty_change == -10));
        assert!(records.iter().all(|r| r.remarks == "Weekly usage update"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn adjustments_on_different_items_are_independent() {
        let store = Arc::new(InMemoryInventoryStore::new());
        let rice = seed_item(&store, "rice", 50).await;
        let oats = seed_item(&store, "oats", 30).await;
        let adjuster = Arc::new(StockAdjuster::new(store.clone(), AdjusterConfig::default()));

        let mut handles = Vec::new();
        for (item, amount) in [(&rice, 5), (&oats, 3)] {
            for _ in 0..5 {
                let adjuster = adjuster.clone();
                let req = usage(item, amount);
                handles.push(tokio::spawn(async move {
                    let user = CurrentUser::new(UserId::new(), vec![]);
                    adjuster.adjust(&user, req).await
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get_item(rice.id).await.unwrap().unwrap().qty_in_stock, 25);
        assert_eq!(store.get_item(oats.id).await.unwrap().unwrap().qty_in_stock, 15);
        assert_eq!(store.usage_records_for(rice.id).unwrap().len(), 5);
        assert_eq!(store.usage_records_for(oats.id).unwrap().len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_receipts_of_one_order_add_stock_once() {
        let store = Arc::new(InMemoryInventoryStore::new());
        let item = seed_item(&store, "beans", 5).await;
        let placed = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let order = store
            .create_order(NewOrder {
                item_id: item.id,
                qty_ordered: 20,
                order_placed_date: placed,
            })
            .await
            .unwrap();
        let adjuster = StockAdjuster::new(store.clone(), AdjusterConfig::default());
        let order_id = order.id;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let adjuster = adjuster.clone();
            handles.push(tokio::spawn(async move {
                let user = CurrentUser::new(UserId::new(), vec![]);
                adjuster.receive_order(&user, order_id, placed).await
            }));
        }

        let mut received = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => received += 1,
                Err(AdjustError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(received, 1);
        assert_eq!(store.get_item(item.id).await.unwrap().unwrap().qty_in_stock, 25);
        let records = store.usage_records_for(item.id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].update_type, UpdateType::Received);
        let stored = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Received);
        assert_eq!(stored.order_received_date, Some(placed));
    }
}
