// crates/mes/src/routing/repo.rs

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;

use crate::db::{contains_pattern, is_foreign_key_violation, is_unique_violation, keyword};
use crate::error::MesError;
use crate::routing::model::{
    BatchUpdate, NewOperation, Operation, OperationPatch, OperationRow, OperationStatus,
    OrderEntry, Page, SearchQuery, SearchType,
};
use crate::routing::order::validate_full_order;

const OPERATION_COLUMNS: &str =
    "id, code, name, description, standard_time, status, operation_order, start_time";

pub const DEFAULT_PAGE_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct OperationsRepo {
    pool: PgPool,
    page_limit_max: i64,
}

fn into_operations(rows: Vec<OperationRow>) -> anyhow::Result<Vec<Operation>> {
    rows.into_iter().map(Operation::try_from).collect()
}

/// 1-based page, limit clamped to `1..=max`, and the row offset.
pub fn clamp_paging(page: Option<i64>, limit: Option<i64>, max: i64) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, max.max(1));
    (page, limit, (page - 1) * limit)
}

impl OperationsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            page_limit_max: 100,
        }
    }

    pub fn with_page_limit_max(mut self, max: i64) -> Self {
        self.page_limit_max = max.max(1);
        self
    }

    // ----------------------------
    // Reads
    // ----------------------------

    /// The whole sequence, as the status board shows it.
    pub async fn list_status(&self) -> anyhow::Result<Vec<Operation>> {
        let rows = sqlx::query_as::<_, OperationRow>(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations ORDER BY operation_order, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        into_operations(rows)
    }

    pub async fn get(&self, id: i64) -> anyhow::Result<Option<Operation>> {
        let row = sqlx::query_as::<_, OperationRow>(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Operation::try_from).transpose()
    }

    pub async fn is_code_taken(&self, code: &str) -> anyhow::Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM operations WHERE code = $1)",
        )
        .bind(code.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    /// Paged search ordered by id.
    ///
    /// - `all` (or a blank term) applies no filter
    /// - `code` / `name` match a case-insensitive substring
    pub async fn search(&self, q: &SearchQuery) -> anyhow::Result<Page<Operation>> {
        let (page, limit, offset) = clamp_paging(q.page, q.limit, self.page_limit_max);

        let column = match (q.search_type, keyword(q.search_term.as_deref())) {
            (SearchType::Code, Some(_)) => Some("code"),
            (SearchType::Name, Some(_)) => Some("name"),
            _ => None,
        };

        let (total, rows) = match column {
            Some(col) => {
                let pattern = contains_pattern(keyword(q.search_term.as_deref()).unwrap_or(""));
                let total = sqlx::query_scalar::<_, i64>(&format!(
                    "SELECT COUNT(*) FROM operations WHERE {col} ILIKE $1"
                ))
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;
                let rows = sqlx::query_as::<_, OperationRow>(&format!(
                    "SELECT {OPERATION_COLUMNS} FROM operations
                     WHERE {col} ILIKE $1
                     ORDER BY id ASC
                     LIMIT $2 OFFSET $3"
                ))
                .bind(&pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                (total, rows)
            }
            None => {
                let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM operations")
                    .fetch_one(&self.pool)
                    .await?;
                let rows = sqlx::query_as::<_, OperationRow>(&format!(
                    "SELECT {OPERATION_COLUMNS} FROM operations
                     ORDER BY id ASC
                     LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                (total, rows)
            }
        };

        Ok(Page::new(into_operations(rows)?, page, limit, total))
    }

    /// Unpaged code-or-name lookup used to pick process names.
    pub async fn catalogue(&self, keyword_raw: Option<&str>) -> anyhow::Result<Vec<Operation>> {
        let pattern = keyword(keyword_raw).map(contains_pattern);
        let rows = sqlx::query_as::<_, OperationRow>(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations
             WHERE $1::text IS NULL OR code ILIKE $1 OR name ILIKE $1
             ORDER BY operation_order, id"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        into_operations(rows)
    }

    // ----------------------------
    // Writes
    // ----------------------------

    /// New operations are appended to the end of the sequence as PENDING.
    ///
    /// The table lock serializes registrations (and any concurrent reorder or
    /// delete) so two inserts never read the same `MAX(operation_order)`.
    pub async fn register(&self, new: NewOperation) -> anyhow::Result<Operation> {
        new.validate()?;
        let code = new.code.trim().to_string();

        let mut tx = self.pool.begin().await?;
        sqlx::query("LOCK TABLE operations IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM operations WHERE code = $1)",
        )
        .bind(&code)
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            return Err(MesError::conflict(format!("operation code already exists: {code}")).into());
        }

        let inserted = sqlx::query_as::<_, OperationRow>(&format!(
            "INSERT INTO operations (code, name, description, standard_time, status, operation_order)
             VALUES ($1, $2, $3, $4, $5,
                     COALESCE((SELECT MAX(operation_order) FROM operations), 0) + 1)
             RETURNING {OPERATION_COLUMNS}"
        ))
        .bind(&code)
        .bind(new.name.trim())
        .bind(&new.description)
        .bind(new.standard_time)
        .bind(OperationStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(
                    MesError::conflict(format!("operation code already exists: {code}")).into(),
                )
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        let op = Operation::try_from(row)?;
        tracing::info!(id = op.id, code = %op.code, order = op.order, "operation registered");
        Ok(op)
    }

    /// Partial update that respects the status lifecycle.
    ///
    /// Terminal operations only accept patches that change nothing, so a
    /// client re-sending every row's current name still succeeds.
    pub async fn update(&self, id: i64, patch: &OperationPatch) -> anyhow::Result<Operation> {
        patch.validate()?;

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, OperationRow>(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .map(Operation::try_from)
        .transpose()?
        .ok_or_else(|| MesError::not_found("operation", id))?;

        if patch.is_noop_for(&current) {
            return Ok(current);
        }

        if current.status.is_terminal() {
            return Err(MesError::conflict(format!(
                "operation {id} is {} and cannot be modified",
                current.status
            ))
            .into());
        }

        if let Some(next) = patch.status {
            current.status.check_transition(next)?;
        }

        if let Some(code) = patch.code.as_deref().map(str::trim) {
            if code != current.code {
                let taken = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM operations WHERE code = $1 AND id <> $2)",
                )
                .bind(code)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
                if taken {
                    return Err(
                        MesError::conflict(format!("operation code already exists: {code}")).into(),
                    );
                }
            }
        }

        let updated = sqlx::query_as::<_, OperationRow>(&format!(
            "UPDATE operations SET
                code          = COALESCE($2, code),
                name          = COALESCE($3, name),
                description   = COALESCE($4, description),
                standard_time = COALESCE($5, standard_time),
                status        = COALESCE($6::text, status),
                start_time    = CASE
                                  WHEN $6::text = 'IN_PROGRESS' AND start_time IS NULL THEN now()
                                  ELSE start_time
                                END,
                updated_at    = now()
             WHERE id = $1
             RETURNING {OPERATION_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.code.as_deref().map(str::trim))
        .bind(patch.name.as_deref().map(str::trim))
        .bind(&patch.description)
        .bind(patch.standard_time)
        .bind(patch.status.map(|s| s.as_str()))
        .fetch_one(&mut *tx)
        .await;

        // the EXISTS check above does not lock the code another session may
        // be inserting, so the constraint can still fire here
        let row = match updated {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                let code = patch.code.as_deref().map(str::trim).unwrap_or_default();
                return Err(
                    MesError::conflict(format!("operation code already exists: {code}")).into(),
                );
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        let op = Operation::try_from(row)?;
        tracing::info!(id, status = %op.status, name = %op.name, "operation updated");
        Ok(op)
    }

    /// PENDING -> IN_PROGRESS, stamping `start_time`.
    pub async fn start(&self, id: i64) -> anyhow::Result<Operation> {
        let mut tx = self.pool.begin().await?;

        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM operations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| MesError::not_found("operation", id))?;

        let status = OperationStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("unknown operation status in db: {status}"))?;
        if status != OperationStatus::Pending {
            return Err(MesError::InvalidTransition {
                from: status.as_str().to_string(),
                to: OperationStatus::InProgress.as_str().to_string(),
            }
            .into());
        }

        let row = sqlx::query_as::<_, OperationRow>(&format!(
            "UPDATE operations
             SET status = $2, start_time = now(), updated_at = now()
             WHERE id = $1
             RETURNING {OPERATION_COLUMNS}"
        ))
        .bind(id)
        .bind(OperationStatus::InProgress.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let op = Operation::try_from(row)?;
        tracing::info!(id, start_time = ?op.start_time, "operation started");
        Ok(op)
    }

    /// Replaces the whole sequence. All-or-nothing: a payload that does not
    /// name every operation once with orders `1..=N` changes nothing.
    /// An empty payload is rejected unless the table is empty too.
    pub async fn reorder(&self, entries: &[OrderEntry]) -> anyhow::Result<()> {
        let batch = BatchUpdate {
            orders: entries.to_vec(),
            names: Vec::new(),
        };
        self.write_batch(&batch, true).await
    }

    /// Reorder and renames in one transaction. An empty `orders` list
    /// leaves the sequence alone.
    pub async fn apply_batch(&self, batch: &BatchUpdate) -> anyhow::Result<()> {
        self.write_batch(batch, false).await
    }

    async fn write_batch(&self, batch: &BatchUpdate, full_order: bool) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, OperationRow>(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations ORDER BY id FOR UPDATE"
        ))
        .fetch_all(&mut *tx)
        .await?;
        let current: HashMap<i64, Operation> = into_operations(rows)?
            .into_iter()
            .map(|op| (op.id, op))
            .collect();

        if full_order || !batch.orders.is_empty() {
            let known: Vec<i64> = current.keys().copied().collect();
            validate_full_order(&batch.orders, &known)?;
        }

        let mut renamed = HashSet::with_capacity(batch.names.len());
        let mut name_ids = Vec::with_capacity(batch.names.len());
        let mut name_values = Vec::with_capacity(batch.names.len());
        for entry in &batch.names {
            let op = current
                .get(&entry.id)
                .ok_or_else(|| MesError::not_found("operation", entry.id))?;
            if !renamed.insert(entry.id) {
                return Err(
                    MesError::validation(format!("operation {} renamed twice", entry.id)).into(),
                );
            }
            let patch = OperationPatch::rename(entry.name.clone());
            patch.validate()?;
            if patch.is_noop_for(op) {
                continue;
            }
            if op.status.is_terminal() {
                return Err(MesError::conflict(format!(
                    "operation {} is {} and cannot be renamed",
                    op.id, op.status
                ))
                .into());
            }
            name_ids.push(entry.id);
            name_values.push(entry.name.trim().to_string());
        }

        if !batch.orders.is_empty() {
            let ids: Vec<i64> = batch.orders.iter().map(|e| e.id).collect();
            let orders: Vec<i32> = batch.orders.iter().map(|e| e.order).collect();
            sqlx::query(
                "UPDATE operations AS o
                 SET operation_order = v.ord, updated_at = now()
                 FROM UNNEST($1::bigint[], $2::int[]) AS v(id, ord)
                 WHERE o.id = v.id",
            )
            .bind(&ids)
            .bind(&orders)
            .execute(&mut *tx)
            .await?;
        }

        if !name_ids.is_empty() {
            sqlx::query(
                "UPDATE operations AS o
                 SET name = v.name, updated_at = now()
                 FROM UNNEST($1::bigint[], $2::text[]) AS v(id, name)
                 WHERE o.id = v.id",
            )
            .bind(&name_ids)
            .bind(&name_values)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            reordered = batch.orders.len(),
            renamed = name_ids.len(),
            "routing batch applied"
        );
        Ok(())
    }

    /// Deletes one operation and closes the gap it leaves in the sequence.
    /// Operations still used by a sales item routing are kept.
    pub async fn delete(&self, id: i64) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = match sqlx::query("DELETE FROM operations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
        {
            Ok(done) => done.rows_affected(),
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(MesError::conflict(format!(
                    "operation {id} is used by a sales item routing"
                ))
                .into())
            }
            Err(e) => return Err(e.into()),
        };
        if deleted == 0 {
            return Err(MesError::not_found("operation", id).into());
        }

        sqlx::query(
            "UPDATE operations AS o
             SET operation_order = r.rn::int
             FROM (
               SELECT id, ROW_NUMBER() OVER (ORDER BY operation_order, id) AS rn
               FROM operations
             ) AS r
             WHERE o.id = r.id AND o.operation_order <> r.rn",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(id, "operation deleted");
        Ok(())
    }
}
