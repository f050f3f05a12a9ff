// crates/mes/src/inventory/repo.rs

use sqlx::{PgPool, Postgres, Transaction};

use crate::db::{contains_pattern, keyword};
use crate::error::MesError;
use crate::inventory::lot;
use crate::inventory::model::{
    EligibleItem, Inbound, NewInbound, NewOutbound, Outbound, StockRow,
};

#[derive(Clone)]
pub struct InventoryRepo {
    pool: PgPool,
}

/// Only active items whose supplier is active take part in transactions.
async fn ensure_eligible(tx: &mut Transaction<'_, Postgres>, raw_item_id: i64) -> anyhow::Result<()> {
    let flags = sqlx::query_as::<_, (bool, bool)>(
        r#"
        SELECT ri.active, p.active
        FROM raw_items ri JOIN partners p ON p.id = ri.supplier_id
        WHERE ri.id = $1
        "#,
    )
    .bind(raw_item_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| MesError::not_found("raw item", raw_item_id))?;

    match flags {
        (true, true) => Ok(()),
        (false, _) => Err(MesError::validation(format!("raw item {raw_item_id} is inactive")).into()),
        (_, false) => Err(MesError::validation(format!(
            "supplier of raw item {raw_item_id} is inactive"
        ))
        .into()),
    }
}

/// Next number for `kind` on `date`. Takes a transaction-scoped advisory
/// lock on the prefix so concurrent registrations cannot pick the same one.
pub(crate) async fn allocate_number(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    column: &str,
    kind: &str,
    date: chrono::NaiveDate,
) -> anyhow::Result<String> {
    let prefix = lot::date_prefix(kind, date);

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&prefix)
        .execute(&mut **tx)
        .await?;

    let existing = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM {table} WHERE {column} LIKE $1 || '%'"
    ))
    .bind(&prefix)
    .fetch_one(&mut **tx)
    .await?;

    Ok(lot::next_number(kind, date, existing))
}

impl InventoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ----------------------------
    // Eligibility / stock views
    // ----------------------------

    pub async fn inbound_eligible(&self, keyword_raw: Option<&str>) -> anyhow::Result<Vec<EligibleItem>> {
        let pattern = keyword(keyword_raw).map(contains_pattern);
        let rows = sqlx::query_as::<_, EligibleItem>(
            r#"
            SELECT
                ri.id AS raw_item_id,
                p.id AS supplier_id,
                p.name AS supplier_name,
                ri.item_code, ri.item_name, ri.spec, ri.manufacturer, ri.remark, ri.color
            FROM raw_items ri JOIN partners p ON p.id = ri.supplier_id
            WHERE ri.active AND p.active
              AND ($1::text IS NULL
                   OR ri.item_code ILIKE $1 OR ri.item_name ILIKE $1 OR p.name ILIKE $1)
            ORDER BY ri.id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Stock rows of eligible items, filtered by supplier name, item code
    /// or item name.
    pub async fn inventory_status(&self, keyword_raw: Option<&str>) -> anyhow::Result<Vec<StockRow>> {
        let pattern = keyword(keyword_raw).map(contains_pattern);
        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT
                i.id AS inventory_id,
                ri.id AS raw_item_id,
                p.name AS supplier_name,
                ri.item_code, ri.item_name, ri.spec, ri.manufacturer,
                i.qty, i.updated_at
            FROM inventory i
            JOIN raw_items ri ON ri.id = i.raw_item_id
            JOIN partners p ON p.id = ri.supplier_id
            WHERE ri.active AND p.active
              AND ($1::text IS NULL
                   OR p.name ILIKE $1 OR ri.item_code ILIKE $1 OR ri.item_name ILIKE $1)
            ORDER BY ri.id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// What can be shipped: the stock view minus empty rows.
    pub async fn outbound_eligible(&self, keyword_raw: Option<&str>) -> anyhow::Result<Vec<StockRow>> {
        let mut rows = self.inventory_status(keyword_raw).await?;
        rows.retain(|r| r.qty > 0);
        Ok(rows)
    }

    // ----------------------------
    // Transactions
    // ----------------------------

    /// Records an inbound with a fresh LOT number and adds to stock,
    /// creating the stock row on first receipt.
    pub async fn register_inbound(&self, new: NewInbound) -> anyhow::Result<Inbound> {
        new.validate()?;

        let mut tx = self.pool.begin().await?;
        ensure_eligible(&mut tx, new.raw_item_id).await?;

        let lot_number = allocate_number(
            &mut tx,
            "raw_inbound",
            "lot_number",
            lot::INBOUND_PREFIX,
            new.inbound_date,
        )
        .await?;

        let inbound = sqlx::query_as::<_, Inbound>(
            r#"
            WITH ins AS (
                INSERT INTO raw_inbound (lot_number, raw_item_id, qty, inbound_date, manufacturing_date)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT ins.id, ins.lot_number, ins.raw_item_id, ri.item_name, ins.qty,
                   ins.inbound_date, ins.manufacturing_date, ins.created_at
            FROM ins JOIN raw_items ri ON ri.id = ins.raw_item_id
            "#,
        )
        .bind(&lot_number)
        .bind(new.raw_item_id)
        .bind(new.qty)
        .bind(new.inbound_date)
        .bind(new.manufacturing_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO inventory (raw_item_id, qty)
            VALUES ($1, $2)
            ON CONFLICT (raw_item_id)
            DO UPDATE SET qty = inventory.qty + EXCLUDED.qty, updated_at = now()
            "#,
        )
        .bind(new.raw_item_id)
        .bind(new.qty)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            lot = %inbound.lot_number,
            raw_item_id = inbound.raw_item_id,
            qty = inbound.qty,
            "raw inbound registered"
        );
        Ok(inbound)
    }

    /// Ships from stock. Fails without touching anything when the item has
    /// no stock row or not enough on hand.
    pub async fn register_outbound(&self, new: NewOutbound) -> anyhow::Result<Outbound> {
        new.validate()?;

        let mut tx = self.pool.begin().await?;
        ensure_eligible(&mut tx, new.raw_item_id).await?;

        let on_hand = sqlx::query_scalar::<_, i32>(
            "SELECT qty FROM inventory WHERE raw_item_id = $1 FOR UPDATE",
        )
        .bind(new.raw_item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            MesError::validation(format!("no stock recorded for raw item {}", new.raw_item_id))
        })?;

        if new.qty > on_hand {
            return Err(MesError::validation(format!(
                "outbound qty {} exceeds stock on hand {on_hand}",
                new.qty
            ))
            .into());
        }

        let number = allocate_number(
            &mut tx,
            "raw_outbound",
            "outbound_number",
            lot::OUTBOUND_PREFIX,
            new.outbound_date,
        )
        .await?;

        let outbound = sqlx::query_as::<_, Outbound>(
            r#"
            WITH ins AS (
                INSERT INTO raw_outbound (outbound_number, raw_item_id, qty, outbound_date)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT ins.id, ins.outbound_number, ins.raw_item_id, ri.item_name, ins.qty,
                   ins.outbound_date, ins.created_at
            FROM ins JOIN raw_items ri ON ri.id = ins.raw_item_id
            "#,
        )
        .bind(&number)
        .bind(new.raw_item_id)
        .bind(new.qty)
        .bind(new.outbound_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE inventory SET qty = qty - $2, updated_at = now() WHERE raw_item_id = $1",
        )
        .bind(new.raw_item_id)
        .bind(new.qty)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            number = %outbound.outbound_number,
            raw_item_id = outbound.raw_item_id,
            qty = outbound.qty,
            remaining = on_hand - outbound.qty,
            "raw outbound registered"
        );
        Ok(outbound)
    }

    // ----------------------------
    // History
    // ----------------------------

    pub async fn list_inbound(&self) -> anyhow::Result<Vec<Inbound>> {
        let rows = sqlx::query_as::<_, Inbound>(
            r#"
            SELECT rin.id, rin.lot_number, rin.raw_item_id, ri.item_name, rin.qty,
                   rin.inbound_date, rin.manufacturing_date, rin.created_at
            FROM raw_inbound rin JOIN raw_items ri ON ri.id = rin.raw_item_id
            ORDER BY rin.created_at DESC, rin.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_outbound(&self) -> anyhow::Result<Vec<Outbound>> {
        let rows = sqlx::query_as::<_, Outbound>(
            r#"
            SELECT ro.id, ro.outbound_number, ro.raw_item_id, ri.item_name, ro.qty,
                   ro.outbound_date, ro.created_at
            FROM raw_outbound ro JOIN raw_items ri ON ri.id = ro.raw_item_id
            ORDER BY ro.created_at DESC, ro.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
