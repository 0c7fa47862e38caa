//! Postgres-backed inventory store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (foreign key violation) | `23503` | `Constraint` |
//! | Database (check constraint violation) | `23514` | `Constraint` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |
//!
//! ## Conditional writes
//!
//! `set_stock` is a single `UPDATE ... WHERE id = $1 AND qty_in_stock = $expected`
//! statement, so the check and the write are atomic on the server. When no row
//! comes back the store reads the item once more to tell `NotFound` from `Conflict`.
//! `set_order_status` follows the same pattern on the order's status.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::{Span, instrument};

use stockroom_core::{Expected, UserId};
use stockroom_inventory::{
    Brand, BrandId, Category, CategoryId, Item, ItemDetails, ItemId, ItemPage, ItemQuery,
    Location, LocationId, NewOrder, NewUsageRecord, Order, OrderId, OrderStatus, SortDirection,
    SortField, StockSummary, UpdateType, UsageRecord, UsageRecordId,
};

use super::r#trait::{InventoryStore, StoreError};

const ITEM_COLUMNS: &str = "id, ref_num, name, category_id, brand_id, location_id, \
     qty_in_stock, unit, lot_num, expiry_date, pack_size, remarks";

const RECORD_COLUMNS: &str =
    "id, item_id, qty_change, update_type, update_date, remarks, recorded_by, created_at";

const ORDER_COLUMNS: &str =
    "id, item_id, qty_ordered, order_placed_date, order_received_date, status, created_at";

/// Schema scripts, applied in order. Each one is idempotent.
const MIGRATIONS: [(&str, &str); 2] = [
    ("0001_inventory", include_str!("../../migrations/0001_inventory.sql")),
    ("0002_orders", include_str!("../../migrations/0002_orders.sql")),
];

/// Postgres-backed inventory store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the inventory tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for (name, script) in MIGRATIONS {
            sqlx::raw_sql(script)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(name, e))?;
            tracing::debug!(migration = name, "schema script applied");
        }
        Ok(())
    }

    async fn fetch_item(&self, operation: &str, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        row.map(|r| item_from_row(&r)).transpose()
    }

    async fn fetch_record(&self, id: UsageRecordId) -> Result<Option<UsageRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM usage_records WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_usage_record", e))?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    async fn fetch_order(&self, operation: &str, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        row.map(|r| order_from_row(&r)).transpose()
    }

    async fn fetch_items(
        &self,
        operation: &str,
        sql: &str,
        bind: ItemBind,
        limit: u32,
    ) -> Result<Vec<Item>, StoreError> {
        let query = sqlx::query(sql);
        let query = match bind {
            ItemBind::Qty(qty) => query.bind(qty),
            ItemBind::Date(date) => query.bind(date),
        };
        let rows = query
            .bind(i64::from(limit))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let items = rows.iter().map(item_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("returned", items.len());
        Ok(items)
    }
}

/// First parameter of a dashboard item query.
enum ItemBind {
    Qty(i64),
    Date(NaiveDate),
}

fn order_expression(field: SortField) -> &'static str {
    match field {
        SortField::Name => "LOWER(name)",
        SortField::RefNum => "LOWER(ref_num)",
        SortField::QtyInStock => "qty_in_stock",
        // Postgres puts NULLs last ascending and first descending.
        SortField::ExpiryDate => "expiry_date",
    }
}

/// Turn a search term into an `ILIKE` substring pattern.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR name ILIKE $1 OR ref_num ILIKE $1)
        AND ($2::uuid IS NULL OR category_id = $2)
        AND ($3::uuid IS NULL OR brand_id = $3)
        AND ($4::uuid IS NULL OR location_id = $4)
"#;

#[async_trait::async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.fetch_item("get_item", id).await
    }

    #[instrument(
        skip(self, query),
        fields(
            page = query.page.index(),
            page_size = query.page.size(),
            returned = tracing::field::Empty
        ),
        err
    )]
    async fn list_items(&self, query: &ItemQuery) -> Result<ItemPage, StoreError> {
        let filters = &query.filters;
        let pattern = filters.search_term().map(|t| like_pattern(&t));
        let category = filters.category.map(|c| *c.as_uuid());
        let brand = filters.brand.map(|b| *b.as_uuid());
        let location = filters.location.map(|l| *l.as_uuid());

        let count_row = sqlx::query(&format!("SELECT COUNT(*) AS total FROM items {FILTER_CLAUSE}"))
            .bind(pattern.as_deref())
            .bind(category)
            .bind(brand)
            .bind(location)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_items", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Backend(format!("failed to read count: {e}")))?;

        let direction: SortDirection = query.sort.direction;

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items {FILTER_CLAUSE} \
             ORDER BY {} {}, id ASC LIMIT $5 OFFSET $6",
            order_expression(query.sort.field),
            direction.keyword(),
        );

        let rows = sqlx::query(&sql)
            .bind(pattern.as_deref())
            .bind(category)
            .bind(brand)
            .bind(location)
            .bind(i64::from(query.page.size()))
            .bind(i64::try_from(query.page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;

        let items = rows.iter().map(item_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("returned", items.len());

        Ok(ItemPage {
            items,
            total: total.max(0) as u64,
            page_index: query.page.index(),
            page_size: query.page.size(),
        })
    }

    #[instrument(skip(self, details), fields(ref_num = %details.ref_num), err)]
    async fn create_item(&self, details: ItemDetails) -> Result<Item, StoreError> {
        let id = ItemId::new();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO items (
                id, ref_num, name, category_id, brand_id, location_id,
                qty_in_stock, unit, lot_num, expiry_date, pack_size, remarks
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&details.ref_num)
        .bind(&details.name)
        .bind(details.category_id.as_uuid())
        .bind(details.brand_id.as_uuid())
        .bind(details.location_id.as_uuid())
        .bind(details.qty_in_stock)
        .bind(&details.unit)
        .bind(details.lot_num.as_deref())
        .bind(details.expiry_date)
        .bind(details.pack_size)
        .bind(details.remarks.as_deref())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_item", e))?;

        item_from_row(&row)
    }

    #[instrument(skip(self, details), fields(item_id = %id), err)]
    async fn update_item(&self, id: ItemId, details: ItemDetails) -> Result<Item, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE items SET
                ref_num = $2,
                name = $3,
                category_id = $4,
                brand_id = $5,
                location_id = $6,
                qty_in_stock = $7,
                unit = $8,
                lot_num = $9,
                expiry_date = $10,
                pack_size = $11,
                remarks = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&details.ref_num)
        .bind(&details.name)
        .bind(details.category_id.as_uuid())
        .bind(details.brand_id.as_uuid())
        .bind(details.location_id.as_uuid())
        .bind(details.qty_in_stock)
        .bind(&details.unit)
        .bind(details.lot_num.as_deref())
        .bind(details.expiry_date)
        .bind(details.pack_size)
        .bind(details.remarks.as_deref())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        match row {
            Some(row) => item_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn set_stock(
        &self,
        id: ItemId,
        expected: Expected<i64>,
        new_qty: i64,
    ) -> Result<Item, StoreError> {
        if new_qty < 0 {
            return Err(StoreError::Constraint("qty_in_stock must be >= 0".to_string()));
        }

        let expected_qty = match expected {
            Expected::Any => None,
            Expected::Exact(qty) => Some(qty),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE items
            SET qty_in_stock = $3, updated_at = NOW()
            WHERE id = $1 AND ($2::bigint IS NULL OR qty_in_stock = $2)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(expected_qty)
        .bind(new_qty)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_stock", e))?;

        if let Some(row) = row {
            return item_from_row(&row);
        }

        match self.fetch_item("set_stock_recheck", id).await? {
            None => Err(StoreError::NotFound),
            Some(current) => Err(StoreError::Conflict(format!(
                "expected qty_in_stock {expected:?}, found {}",
                current.qty_in_stock
            ))),
        }
    }

    #[instrument(
        skip(self, record),
        fields(
            record_id = %record.id,
            item_id = %record.item_id,
            qty_change = record.qty_change,
            replayed = tracing::field::Empty
        ),
        err
    )]
    async fn insert_usage_record(&self, record: NewUsageRecord) -> Result<UsageRecord, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO usage_records (
                id, item_id, qty_change, update_type, update_date, remarks, recorded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(record.id.as_uuid())
        .bind(record.item_id.as_uuid())
        .bind(record.qty_change)
        .bind(record.update_type.as_str())
        .bind(record.update_date)
        .bind(&record.remarks)
        .bind(record.recorded_by.map(|u| *u.as_uuid()))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_usage_record", e))?;

        if let Some(row) = row {
            return record_from_row(&row);
        }

        // The id is taken: an earlier attempt landed, or a different record owns it.
        let existing = self
            .fetch_record(record.id)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("usage record {} vanished", record.id)))?;

        let created_at = existing.created_at;
        if record.into_record(created_at) == existing {
            Span::current().record("replayed", true);
            Ok(existing)
        } else {
            Err(StoreError::Duplicate(format!("usage record {}", existing.id)))
        }
    }

    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = reference_rows(&self.pool, "categories").await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Category {
                id: CategoryId::from_uuid(id),
                name,
            })
            .collect())
    }

    #[instrument(skip(self), err)]
    async fn list_brands(&self) -> Result<Vec<Brand>, StoreError> {
        let rows = reference_rows(&self.pool, "brands").await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Brand {
                id: BrandId::from_uuid(id),
                name,
            })
            .collect())
    }

    #[instrument(skip(self), err)]
    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        let rows = reference_rows(&self.pool, "locations").await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Location {
                id: LocationId::from_uuid(id),
                name,
            })
            .collect())
    }

    #[instrument(skip(self, order), fields(item_id = %order.item_id, qty_ordered = order.qty_ordered), err)]
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (id, item_id, qty_ordered, order_placed_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(OrderId::new().as_uuid())
        .bind(order.item_id.as_uuid())
        .bind(order.qty_ordered)
        .bind(order.order_placed_date)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_order", e))?;

        order_from_row(&row)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.fetch_order("get_order", id).await
    }

    #[instrument(skip(self), fields(returned = tracing::field::Empty), err)]
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             ORDER BY order_placed_date DESC, created_at DESC, id DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let orders = rows.iter().map(order_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("returned", orders.len());
        Ok(orders)
    }

    #[instrument(skip(self), fields(order_id = %id, new_status = status.as_str()), err)]
    async fn set_order_status(
        &self,
        id: OrderId,
        expected: Expected<OrderStatus>,
        status: OrderStatus,
        received_date: Option<NaiveDate>,
    ) -> Result<Order, StoreError> {
        let expected_status = match expected {
            Expected::Any => None,
            Expected::Exact(s) => Some(s.as_str()),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE orders
            SET status = $3, order_received_date = $4
            WHERE id = $1 AND ($2::text IS NULL OR status = $2)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(expected_status)
        .bind(status.as_str())
        .bind(received_date)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_order_status", e))?;

        if let Some(row) = row {
            return order_from_row(&row);
        }

        match self.fetch_order("set_order_status_recheck", id).await? {
            None => Err(StoreError::NotFound),
            Some(current) => Err(StoreError::Conflict(format!(
                "expected order status {expected:?}, found {}",
                current.status.as_str()
            ))),
        }
    }

    #[instrument(skip(self), err)]
    async fn stock_summary(&self) -> Result<StockSummary, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS item_count,
                COALESCE(SUM(qty_in_stock), 0)::BIGINT AS total_units,
                COUNT(*) FILTER (WHERE qty_in_stock = 0) AS out_of_stock
            FROM items
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_summary", e))?;

        let read = |column: &str| -> Result<i64, StoreError> {
            row.try_get(column)
                .map_err(|e| StoreError::Backend(format!("failed to read {column}: {e}")))
        };

        Ok(StockSummary {
            item_count: read("item_count")?.max(0) as u64,
            total_units: read("total_units")?,
            out_of_stock: read("out_of_stock")?.max(0) as u64,
        })
    }

    #[instrument(skip(self), fields(returned = tracing::field::Empty), err)]
    async fn low_stock_items(&self, threshold: i64, limit: u32) -> Result<Vec<Item>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE qty_in_stock <= $1 \
             ORDER BY qty_in_stock ASC, LOWER(name) ASC, id ASC LIMIT $2"
        );
        self.fetch_items("low_stock_items", &sql, ItemBind::Qty(threshold), limit)
            .await
    }

    #[instrument(skip(self), fields(returned = tracing::field::Empty), err)]
    async fn expiring_items(
        &self,
        on_or_before: NaiveDate,
        limit: u32,
    ) -> Result<Vec<Item>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE expiry_date IS NOT NULL AND expiry_date <= $1 \
             ORDER BY expiry_date ASC, LOWER(name) ASC, id ASC LIMIT $2"
        );
        self.fetch_items("expiring_items", &sql, ItemBind::Date(on_or_before), limit)
            .await
    }
}

/// `table` is always one of the fixed reference table names.
async fn reference_rows(
    pool: &PgPool,
    table: &'static str,
) -> Result<Vec<(uuid::Uuid, String)>, StoreError> {
    sqlx::query_as::<_, (uuid::Uuid, String)>(&format!(
        "SELECT id, name FROM {table} ORDER BY LOWER(name) ASC, id ASC"
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| map_sqlx_error(table, e))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("23503") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

// SQLx row types

#[derive(Debug)]
struct ItemRow {
    id: uuid::Uuid,
    ref_num: String,
    name: String,
    category_id: uuid::Uuid,
    brand_id: uuid::Uuid,
    location_id: uuid::Uuid,
    qty_in_stock: i64,
    unit: String,
    lot_num: Option<String>,
    expiry_date: Option<NaiveDate>,
    pack_size: Option<i32>,
    remarks: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            ref_num: row.try_get("ref_num")?,
            name: row.try_get("name")?,
            category_id: row.try_get("category_id")?,
            brand_id: row.try_get("brand_id")?,
            location_id: row.try_get("location_id")?,
            qty_in_stock: row.try_get("qty_in_stock")?,
            unit: row.try_get("unit")?,
            lot_num: row.try_get("lot_num")?,
            expiry_date: row.try_get("expiry_date")?,
            pack_size: row.try_get("pack_size")?,
            remarks: row.try_get("remarks")?,
        })
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: ItemId::from_uuid(row.id),
            ref_num: row.ref_num,
            name: row.name,
            category_id: CategoryId::from_uuid(row.category_id),
            brand_id: BrandId::from_uuid(row.brand_id),
            location_id: LocationId::from_uuid(row.location_id),
            qty_in_stock: row.qty_in_stock,
            unit: row.unit,
            lot_num: row.lot_num,
            expiry_date: row.expiry_date,
            pack_size: row.pack_size,
            remarks: row.remarks,
        }
    }
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    ItemRow::from_row(row)
        .map(Item::from)
        .map_err(|e| StoreError::Backend(format!("failed to deserialize item row: {e}")))
}

#[derive(Debug)]
struct UsageRecordRow {
    id: uuid::Uuid,
    item_id: uuid::Uuid,
    qty_change: i64,
    update_type: String,
    update_date: NaiveDate,
    remarks: String,
    recorded_by: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UsageRecordRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UsageRecordRow {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            qty_change: row.try_get("qty_change")?,
            update_type: row.try_get("update_type")?,
            update_date: row.try_get("update_date")?,
            remarks: row.try_get("remarks")?,
            recorded_by: row.try_get("recorded_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<UsageRecordRow> for UsageRecord {
    type Error = StoreError;

    fn try_from(row: UsageRecordRow) -> Result<Self, Self::Error> {
        let update_type: UpdateType = row
            .update_type
            .parse()
            .map_err(|e| StoreError::Backend(format!("bad update_type in usage record: {e}")))?;

        Ok(UsageRecord {
            id: UsageRecordId::from_uuid(row.id),
            item_id: ItemId::from_uuid(row.item_id),
            qty_change: row.qty_change,
            update_type,
            update_date: row.update_date,
            remarks: row.remarks,
            recorded_by: row.recorded_by.map(UserId::from_uuid),
            created_at: row.created_at,
        })
    }
}

fn record_from_row(row: &PgRow) -> Result<UsageRecord, StoreError> {
    UsageRecordRow::from_row(row)
        .map_err(|e| StoreError::Backend(format!("failed to deserialize usage record row: {e}")))?
        .try_into()
}

#[derive(Debug)]
struct OrderRow {
    id: uuid::Uuid,
    item_id: uuid::Uuid,
    qty_ordered: i64,
    order_placed_date: NaiveDate,
    order_received_date: Option<NaiveDate>,
    status: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            qty_ordered: row.try_get("qty_ordered")?,
            order_placed_date: row.try_get("order_placed_date")?,
            order_received_date: row.try_get("order_received_date")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Backend(format!("bad status in order: {e}")))?;

        Ok(Order {
            id: OrderId::from_uuid(row.id),
            item_id: ItemId::from_uuid(row.item_id),
            qty_ordered: row.qty_ordered,
            order_placed_date: row.order_placed_date,
            order_received_date: row.order_received_date,
            status,
            created_at: row.created_at,
        })
    }
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    OrderRow::from_row(row)
        .map_err(|e| StoreError::Backend(format!("failed to deserialize order row: {e}")))?
        .try_into()
}
