use sqlx::PgPool;

use crate::db::is_unique_violation;
use crate::error::MesError;
use crate::partners::model::{NewPartner, Partner, PartnerType, PartnerUpdate};

#[derive(Clone)]
pub struct PartnersRepo {
    pool: PgPool,
}

fn duplicate_name(name: &str) -> anyhow::Error {
    MesError::conflict(format!("partner name already exists: {name}")).into()
}

impl PartnersRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, new: NewPartner) -> anyhow::Result<Partner> {
        new.validate()?;
        let name = new.name.trim().to_string();

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM partners WHERE name = $1)",
        )
        .bind(&name)
        .fetch_one(&self.pool)
        .await?;
        if exists {
            return Err(duplicate_name(&name));
        }

        let inserted = sqlx::query_as::<_, Partner>(
            r#"
            INSERT INTO partners (
                partner_type, name, br_num, boss_name, boss_phone,
                representative_name, representative_phone, representative_email,
                address, remark
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(new.partner_type.as_str())
        .bind(&name)
        .bind(&new.br_num)
        .bind(&new.boss_name)
        .bind(&new.boss_phone)
        .bind(&new.representative_name)
        .bind(&new.representative_phone)
        .bind(&new.representative_email)
        .bind(&new.address)
        .bind(&new.remark)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(partner) => {
                tracing::info!(id = partner.id, name = %partner.name, "partner registered");
                Ok(partner)
            }
            Err(e) if is_unique_violation(&e) => Err(duplicate_name(&name)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list(&self, partner_type: Option<PartnerType>) -> anyhow::Result<Vec<Partner>> {
        let rows = sqlx::query_as::<_, Partner>(
            r#"
            SELECT * FROM partners
            WHERE $1::text IS NULL OR partner_type = $1
            ORDER BY id
            "#,
        )
        .bind(partner_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: i64) -> anyhow::Result<Option<Partner>> {
        let row = sqlx::query_as::<_, Partner>("SELECT * FROM partners WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Full replace of the editable fields.
    pub async fn update(&self, id: i64, update: PartnerUpdate) -> anyhow::Result<Partner> {
        update.fields.validate()?;
        let name = update.fields.name.trim().to_string();

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM partners WHERE name = $1 AND id <> $2)",
        )
        .bind(&name)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if taken {
            return Err(duplicate_name(&name));
        }

        let f = &update.fields;
        let updated = sqlx::query_as::<_, Partner>(
            r#"
            UPDATE partners SET
                partner_type = $2,
                name = $3,
                br_num = $4,
                boss_name = $5,
                boss_phone = $6,
                representative_name = $7,
                representative_phone = $8,
                representative_email = $9,
                address = $10,
                remark = $11,
                active = $12,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(f.partner_type.as_str())
        .bind(&name)
        .bind(&f.br_num)
        .bind(&f.boss_name)
        .bind(&f.boss_phone)
        .bind(&f.representative_name)
        .bind(&f.representative_phone)
        .bind(&f.representative_email)
        .bind(&f.address)
        .bind(&f.remark)
        .bind(update.active)
        .fetch_optional(&self.pool)
        .await;

        let row = match updated {
            Ok(row) => row.ok_or_else(|| MesError::not_found("partner", id))?,
            Err(e) if is_unique_violation(&e) => return Err(duplicate_name(&name)),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(id, "partner updated");
        Ok(row)
    }

    pub async fn set_active(&self, id: i64, active: bool) -> anyhow::Result<Partner> {
        let row = sqlx::query_as::<_, Partner>(
            "UPDATE partners SET active = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| MesError::not_found("partner", id))?;

        tracing::info!(id, active, "partner status changed");
        Ok(row)
    }
}
