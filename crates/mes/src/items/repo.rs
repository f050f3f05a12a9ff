use sqlx::{PgPool, Postgres, Transaction};

use crate::db::is_unique_violation;
use crate::error::MesError;
use crate::items::model::{NewRawItem, RawItem, RawItemUpdate};

#[derive(Clone)]
pub struct RawItemsRepo {
    pool: PgPool,
}

fn duplicate_code(code: &str) -> anyhow::Error {
    MesError::conflict(format!("item code already exists: {code}")).into()
}

/// Suppliers must exist and be registered as `supplier`.
async fn ensure_supplier(tx: &mut Transaction<'_, Postgres>, supplier_id: i64) -> anyhow::Result<()> {
    let kind = sqlx::query_scalar::<_, String>("SELECT partner_type FROM partners WHERE id = $1")
        .bind(supplier_id)
        .fetch_optional(&mut **tx)
        .await?;
    match kind.as_deref() {
        Some("supplier") => Ok(()),
        Some(other) => Err(MesError::validation(format!(
            "partner {supplier_id} is a {other}, not a supplier"
        ))
        .into()),
        None => Err(MesError::validation(format!("unknown supplier: {supplier_id}")).into()),
    }
}

impl RawItemsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, new: NewRawItem) -> anyhow::Result<RawItem> {
        new.validate()?;
        let code = new.item_code.trim().to_string();

        let mut tx = self.pool.begin().await?;
        ensure_supplier(&mut tx, new.supplier_id).await?;

        let inserted = sqlx::query_as::<_, RawItem>(
            r#"
            WITH ins AS (
                INSERT INTO raw_items (
                    item_code, item_name, classification, color, spec,
                    manufacturer, remark, supplier_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            SELECT ins.*, p.name AS supplier_name
            FROM ins JOIN partners p ON p.id = ins.supplier_id
            "#,
        )
        .bind(&code)
        .bind(new.item_name.trim())
        .bind(&new.classification)
        .bind(&new.color)
        .bind(&new.spec)
        .bind(&new.manufacturer)
        .bind(&new.remark)
        .bind(new.supplier_id)
        .fetch_one(&mut *tx)
        .await;

        let item = match inserted {
            Ok(item) => item,
            Err(e) if is_unique_violation(&e) => return Err(duplicate_code(&code)),
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        tracing::info!(id = item.id, code = %item.item_code, "raw item registered");
        Ok(item)
    }

    pub async fn list(&self) -> anyhow::Result<Vec<RawItem>> {
        let rows = sqlx::query_as::<_, RawItem>(
            r#"
            SELECT ri.*, p.name AS supplier_name
            FROM raw_items ri JOIN partners p ON p.id = ri.supplier_id
            ORDER BY ri.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: i64) -> anyhow::Result<Option<RawItem>> {
        let row = sqlx::query_as::<_, RawItem>(
            r#"
            SELECT ri.*, p.name AS supplier_name
            FROM raw_items ri JOIN partners p ON p.id = ri.supplier_id
            WHERE ri.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&self, id: i64, update: RawItemUpdate) -> anyhow::Result<RawItem> {
        update.fields.validate()?;
        let f = &update.fields;
        let code = f.item_code.trim().to_string();

        let mut tx = self.pool.begin().await?;
        ensure_supplier(&mut tx, f.supplier_id).await?;

        let updated = sqlx::query_as::<_, RawItem>(
            r#"
            WITH upd AS (
                UPDATE raw_items SET
                    item_code = $2,
                    item_name = $3,
                    classification = $4,
                    color = $5,
                    spec = $6,
                    manufacturer = $7,
                    remark = $8,
                    supplier_id = $9,
                    active = $10,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT upd.*, p.name AS supplier_name
            FROM upd JOIN partners p ON p.id = upd.supplier_id
            "#,
        )
        .bind(id)
        .bind(&code)
        .bind(f.item_name.trim())
        .bind(&f.classification)
        .bind(&f.color)
        .bind(&f.spec)
        .bind(&f.manufacturer)
        .bind(&f.remark)
        .bind(f.supplier_id)
        .bind(update.active)
        .fetch_optional(&mut *tx)
        .await;

        let item = match updated {
            Ok(Some(item)) => item,
            Ok(None) => return Err(MesError::not_found("raw item", id).into()),
            Err(e) if is_unique_violation(&e) => return Err(duplicate_code(&code)),
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        tracing::info!(id, "raw item updated");
        Ok(item)
    }

    pub async fn set_active(&self, id: i64, active: bool) -> anyhow::Result<RawItem> {
        let row = sqlx::query_as::<_, RawItem>(
            r#"
            WITH upd AS (
                UPDATE raw_items SET active = $2, updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT upd.*, p.name AS supplier_name
            FROM upd JOIN partners p ON p.id = upd.supplier_id
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| MesError::not_found("raw item", id))?;

        tracing::info!(id, active, "raw item status changed");
        Ok(row)
    }
}
