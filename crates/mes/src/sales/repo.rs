// crates/mes/src/sales/repo.rs

use std::collections::{HashMap, HashSet};

use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use crate::db::{contains_pattern, is_unique_violation, keyword};
use crate::error::MesError;
use crate::inventory::lot;
use crate::inventory::repo::allocate_number;
use crate::sales::model::{
    NewSalesInbound, NewSalesItem, RouteStep, SalesEligibleItem, SalesInbound, SalesItem,
    SalesItemRow, SalesItemUpdate, WorkOrder,
};

const ITEM_SELECT: &str = r#"
    SELECT si.*, p.name AS partner_name
    FROM sales_items si JOIN partners p ON p.id = si.partner_id
"#;

const INBOUND_SELECT: &str = r#"
    SELECT sin.id, sin.lot_number, sin.sales_item_id, si.item_code, si.item_name,
           p.name AS customer_name, sin.qty, sin.received_at,
           sin.cancelled, sin.outbound_processed, sin.created_at
    FROM sales_inbound sin
    JOIN sales_items si ON si.id = sin.sales_item_id
    JOIN partners p ON p.id = si.partner_id
"#;

#[derive(Clone)]
pub struct SalesRepo {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    sales_item_id: i64,
    seq: i32,
    operation_id: i64,
    code: String,
    name: String,
    standard_time: i32,
}

fn duplicate_code(code: &str) -> anyhow::Error {
    MesError::conflict(format!("sales item code already exists: {code}")).into()
}

/// Sales items belong to partners registered as `customer`.
async fn ensure_customer(tx: &mut Transaction<'_, Postgres>, partner_id: i64) -> anyhow::Result<()> {
    let kind = sqlx::query_scalar::<_, String>("SELECT partner_type FROM partners WHERE id = $1")
        .bind(partner_id)
        .fetch_optional(&mut **tx)
        .await?;
    match kind.as_deref() {
        Some("customer") => Ok(()),
        Some(other) => Err(MesError::validation(format!(
            "partner {partner_id} is a {other}, not a customer"
        ))
        .into()),
        None => Err(MesError::validation(format!("unknown customer: {partner_id}")).into()),
    }
}

/// Replaces an item's routing with `operation_ids`, numbered from 1 in the
/// given order. Every id must name an existing operation.
async fn replace_routing(
    tx: &mut Transaction<'_, Postgres>,
    item_id: i64,
    operation_ids: &[i64],
) -> anyhow::Result<()> {
    let known: HashSet<i64> = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM operations WHERE id = ANY($1) FOR SHARE",
    )
    .bind(operation_ids)
    .fetch_all(&mut **tx)
    .await?
    .into_iter()
    .collect();

    if let Some(missing) = operation_ids.iter().find(|id| !known.contains(id)) {
        return Err(MesError::validation(format!("unknown operation: {missing}")).into());
    }

    sqlx::query("DELETE FROM sales_item_operations WHERE sales_item_id = $1")
        .bind(item_id)
        .execute(&mut **tx)
        .await?;

    let seqs: Vec<i32> = (1..=operation_ids.len() as i32).collect();
    sqlx::query(
        "INSERT INTO sales_item_operations (sales_item_id, operation_id, seq)
         SELECT $1, v.operation_id, v.seq
         FROM UNNEST($2::bigint[], $3::int[]) AS v(operation_id, seq)",
    )
    .bind(item_id)
    .bind(operation_ids)
    .bind(&seqs)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Routing of each item in `item_ids`, steps in `seq` order.
async fn load_routing<'e>(
    exec: impl PgExecutor<'e>,
    item_ids: &[i64],
) -> anyhow::Result<HashMap<i64, Vec<RouteStep>>> {
    let rows = sqlx::query_as::<_, RouteRow>(
        r#"
        SELECT sio.sales_item_id, sio.seq, o.id AS operation_id, o.code, o.name, o.standard_time
        FROM sales_item_operations sio JOIN operations o ON o.id = sio.operation_id
        WHERE sio.sales_item_id = ANY($1)
        ORDER BY sio.sales_item_id, sio.seq
        "#,
    )
    .bind(item_ids)
    .fetch_all(exec)
    .await?;

    let mut routing: HashMap<i64, Vec<RouteStep>> = HashMap::new();
    for r in rows {
        routing.entry(r.sales_item_id).or_default().push(RouteStep {
            seq: r.seq,
            operation_id: r.operation_id,
            code: r.code,
            name: r.name,
            standard_time: r.standard_time,
        });
    }
    Ok(routing)
}

impl SalesRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ----------------------------
    // Sales items
    // ----------------------------

    pub async fn register_item(&self, new: NewSalesItem) -> anyhow::Result<SalesItem> {
        new.validate()?;
        let code = new.item_code.trim().to_string();

        let mut tx = self.pool.begin().await?;
        ensure_customer(&mut tx, new.partner_id).await?;

        let inserted = sqlx::query_as::<_, SalesItemRow>(
            r#"
            WITH ins AS (
                INSERT INTO sales_items (
                    partner_id, item_code, item_name, classification, unit,
                    price, color, coating_method, remark
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
            )
            SELECT ins.*, p.name AS partner_name
            FROM ins JOIN partners p ON p.id = ins.partner_id
            "#,
        )
        .bind(new.partner_id)
        .bind(&code)
        .bind(new.item_name.trim())
        .bind(new.classification.trim())
        .bind(&new.unit)
        .bind(new.price)
        .bind(&new.color)
        .bind(&new.coating_method)
        .bind(&new.remark)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => return Err(duplicate_code(&code)),
            Err(e) => return Err(e.into()),
        };

        replace_routing(&mut tx, row.id, &new.operation_ids).await?;
        let mut routing = load_routing(&mut *tx, &[row.id]).await?;
        tx.commit().await?;

        let steps = routing.remove(&row.id).unwrap_or_default();
        let item = row.with_routing(steps);
        tracing::info!(
            id = item.id,
            code = %item.item_code,
            operations = item.total_operations,
            "sales item registered"
        );
        Ok(item)
    }

    /// Items filtered by customer name, item code or item name.
    pub async fn list_items(&self, keyword_raw: Option<&str>) -> anyhow::Result<Vec<SalesItem>> {
        let pattern = keyword(keyword_raw).map(contains_pattern);
        let rows = sqlx::query_as::<_, SalesItemRow>(&format!(
            "{ITEM_SELECT}
             WHERE $1::text IS NULL
                OR p.name ILIKE $1 OR si.item_code ILIKE $1 OR si.item_name ILIKE $1
             ORDER BY si.id"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut routing = load_routing(&self.pool, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let steps = routing.remove(&r.id).unwrap_or_default();
                r.with_routing(steps)
            })
            .collect())
    }

    pub async fn get_item(&self, id: i64) -> anyhow::Result<Option<SalesItem>> {
        let Some(row) = sqlx::query_as::<_, SalesItemRow>(&format!("{ITEM_SELECT} WHERE si.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut routing = load_routing(&self.pool, &[id]).await?;
        Ok(Some(row.with_routing(routing.remove(&id).unwrap_or_default())))
    }

    /// Full replace of the editable fields and the routing.
    pub async fn update_item(&self, id: i64, update: SalesItemUpdate) -> anyhow::Result<SalesItem> {
        update.fields.validate()?;
        let f = &update.fields;
        let code = f.item_code.trim().to_string();

        let mut tx = self.pool.begin().await?;
        ensure_customer(&mut tx, f.partner_id).await?;

        let updated = sqlx::query_as::<_, SalesItemRow>(
            r#"
            WITH upd AS (
                UPDATE sales_items SET
                    partner_id = $2,
                    item_code = $3,
                    item_name = $4,
                    classification = $5,
                    unit = $6,
                    price = $7,
                    color = $8,
                    coating_method = $9,
                    remark = $10,
                    active = $11,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT upd.*, p.name AS partner_name
            FROM upd JOIN partners p ON p.id = upd.partner_id
            "#,
        )
        .bind(id)
        .bind(f.partner_id)
        .bind(&code)
        .bind(f.item_name.trim())
        .bind(f.classification.trim())
        .bind(&f.unit)
        .bind(f.price)
        .bind(&f.color)
        .bind(&f.coating_method)
        .bind(&f.remark)
        .bind(update.active)
        .fetch_optional(&mut *tx)
        .await;

        let row = match updated {
            Ok(Some(row)) => row,
            Ok(None) => return Err(MesError::not_found("sales item", id).into()),
            Err(e) if is_unique_violation(&e) => return Err(duplicate_code(&code)),
            Err(e) => return Err(e.into()),
        };

        replace_routing(&mut tx, id, &f.operation_ids).await?;
        let mut routing = load_routing(&mut *tx, &[id]).await?;
        tx.commit().await?;

        tracing::info!(id, operations = f.operation_ids.len(), "sales item updated");
        Ok(row.with_routing(routing.remove(&id).unwrap_or_default()))
    }

    pub async fn set_item_active(&self, id: i64, active: bool) -> anyhow::Result<SalesItem> {
        let updated = sqlx::query("UPDATE sales_items SET active = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(MesError::not_found("sales item", id).into());
        }

        tracing::info!(id, active, "sales item status changed");
        self.get_item(id)
            .await?
            .ok_or_else(|| MesError::not_found("sales item", id).into())
    }

    // ----------------------------
    // Sales inbound
    // ----------------------------

    /// Active items of active customers, filtered by customer name, item
    /// code or item name.
    pub async fn inbound_eligible(
        &self,
        keyword_raw: Option<&str>,
    ) -> anyhow::Result<Vec<SalesEligibleItem>> {
        let pattern = keyword(keyword_raw).map(contains_pattern);
        let rows = sqlx::query_as::<_, SalesEligibleItem>(
            r#"
            SELECT
                si.id AS sales_item_id,
                p.id AS partner_id,
                p.name AS customer_name,
                si.item_code, si.item_name, si.classification, si.color, si.coating_method
            FROM sales_items si JOIN partners p ON p.id = si.partner_id
            WHERE si.active AND p.active
              AND ($1::text IS NULL
                   OR p.name ILIKE $1 OR si.item_code ILIKE $1 OR si.item_name ILIKE $1)
            ORDER BY si.id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Records customer goods received for coating under a fresh LOT number.
    pub async fn register_inbound(&self, new: NewSalesInbound) -> anyhow::Result<SalesInbound> {
        new.validate()?;

        let mut tx = self.pool.begin().await?;

        let flags = sqlx::query_as::<_, (bool, bool)>(
            r#"
            SELECT si.active, p.active
            FROM sales_items si JOIN partners p ON p.id = si.partner_id
            WHERE si.id = $1
            "#,
        )
        .bind(new.sales_item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| MesError::not_found("sales item", new.sales_item_id))?;
        match flags {
            (true, true) => {}
            (false, _) => {
                return Err(MesError::validation(format!(
                    "sales item {} is inactive",
                    new.sales_item_id
                ))
                .into())
            }
            (_, false) => {
                return Err(MesError::validation(format!(
                    "customer of sales item {} is inactive",
                    new.sales_item_id
                ))
                .into())
            }
        }

        let lot_number = allocate_number(
            &mut tx,
            "sales_inbound",
            "lot_number",
            lot::SALES_INBOUND_PREFIX,
            new.received_at,
        )
        .await?;

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO sales_inbound (lot_number, sales_item_id, qty, received_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&lot_number)
        .bind(new.sales_item_id)
        .bind(new.qty)
        .bind(new.received_at)
        .fetch_one(&mut *tx)
        .await?;

        let inbound = sqlx::query_as::<_, SalesInbound>(&format!("{INBOUND_SELECT} WHERE sin.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            lot = %inbound.lot_number,
            sales_item_id = inbound.sales_item_id,
            qty = inbound.qty,
            "sales inbound registered"
        );
        Ok(inbound)
    }

    /// History, newest first, filtered by LOT number, customer name, item
    /// code or item name.
    pub async fn list_inbound(&self, keyword_raw: Option<&str>) -> anyhow::Result<Vec<SalesInbound>> {
        let pattern = keyword(keyword_raw).map(contains_pattern);
        let rows = sqlx::query_as::<_, SalesInbound>(&format!(
            "{INBOUND_SELECT}
             WHERE $1::text IS NULL
                OR sin.lot_number ILIKE $1 OR p.name ILIKE $1
                OR si.item_code ILIKE $1 OR si.item_name ILIKE $1
             ORDER BY sin.created_at DESC, sin.id DESC"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_inbound(&self, id: i64) -> anyhow::Result<Option<SalesInbound>> {
        let row = sqlx::query_as::<_, SalesInbound>(&format!("{INBOUND_SELECT} WHERE sin.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Cancelled and already shipped inbounds cannot be cancelled again.
    pub async fn cancel_inbound(&self, id: i64) -> anyhow::Result<SalesInbound> {
        let mut tx = self.pool.begin().await?;

        let (cancelled, processed) = sqlx::query_as::<_, (bool, bool)>(
            "SELECT cancelled, outbound_processed FROM sales_inbound WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| MesError::not_found("sales inbound", id))?;

        if processed {
            return Err(MesError::conflict(format!("sales inbound {id} is already shipped")).into());
        }
        if cancelled {
            return Err(MesError::conflict(format!("sales inbound {id} is already cancelled")).into());
        }

        sqlx::query("UPDATE sales_inbound SET cancelled = TRUE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let inbound = sqlx::query_as::<_, SalesInbound>(&format!("{INBOUND_SELECT} WHERE sin.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id, lot = %inbound.lot_number, "sales inbound cancelled");
        Ok(inbound)
    }

    // ----------------------------
    // Work order
    // ----------------------------

    /// Work order of one inbound LOT: customer, item, and the item's routing.
    /// Cancelled inbounds have no work order.
    pub async fn work_order(&self, inbound_id: i64) -> anyhow::Result<WorkOrder> {
        let inbound = self
            .get_inbound(inbound_id)
            .await?
            .ok_or_else(|| MesError::not_found("sales inbound", inbound_id))?;
        if inbound.cancelled {
            return Err(
                MesError::conflict(format!("sales inbound {inbound_id} is cancelled")).into(),
            );
        }

        let item = self
            .get_item(inbound.sales_item_id)
            .await?
            .ok_or_else(|| MesError::not_found("sales item", inbound.sales_item_id))?;

        Ok(WorkOrder {
            inbound_id,
            lot_number: inbound.lot_number,
            qty: inbound.qty,
            received_at: inbound.received_at,
            customer_name: item.partner_name,
            item_code: item.item_code,
            item_name: item.item_name,
            classification: item.classification,
            color: item.color,
            coating_method: item.coating_method,
            note: item.remark,
            routing: item.routing,
        })
    }
}
