use crate::errors::{conflict_on_unique, AppError};
use crate::filters::{Filter, ListOptions};
use crate::models::{effective_gst_status, CallStatus, CreateLeadDto, GstStatus, Lead, UpdateLeadDto};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Wire-name to column mapping for lead list sorting.
pub const LEAD_SORTABLE: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
    ("name", "name"),
    ("mobile", "mobile"),
    ("rating", "rating"),
    ("followUpDate", "follow_up_date"),
];

/// The subset of interaction fields that gets denormalized onto the lead.
/// `None` means "leave the lead's current value untouched" (sparse merge).
#[derive(Debug, Clone, Default)]
pub struct LeadSnapshot {
    pub call_status: Option<CallStatus>,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub converted: Option<bool>,
    pub gst_status: Option<GstStatus>,
}

impl LeadSnapshot {
    pub fn is_empty(&self) -> bool {
        self.call_status.is_none()
            && self.rating.is_none()
            && self.notes.is_none()
            && self.follow_up_date.is_none()
            && self.converted.is_none()
            && self.gst_status.is_none()
    }

    /// Append a `, column = $n` fragment for each field present; absent
    /// fields emit nothing, leaving the lead's stored value untouched.
    pub fn push_set(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(v) = self.call_status {
            qb.push(", call_status = ").push_bind(v);
        }
        if let Some(v) = self.rating {
            qb.push(", rating = ").push_bind(v);
        }
        if let Some(v) = &self.notes {
            qb.push(", notes = ").push_bind(v.clone());
        }
        if let Some(v) = self.follow_up_date {
            qb.push(", follow_up_date = ").push_bind(v);
        }
        if let Some(v) = self.converted {
            qb.push(", converted = ").push_bind(v);
        }
        if let Some(v) = self.gst_status {
            qb.push(", gst_status = ").push_bind(v);
        }
    }
}

/// Storage service for leads.
pub struct LeadStore {
    pool: PgPool,
}

impl LeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a lead, or return the existing one with the same mobile
    /// number unchanged (idempotent on mobile; no merge of new fields).
    ///
    /// The find-then-create sequence has a race window under concurrent
    /// requests; the unique index on `mobile` settles it, and the losing
    /// writer gets a `Conflict`.
    pub async fn create_or_find(
        &self,
        dto: CreateLeadDto,
        created_by: Uuid,
    ) -> Result<Lead, AppError> {
        if let Some(existing) = self.find_by_mobile(&dto.mobile).await? {
            tracing::debug!("Lead already exists for mobile, returning as-is");
            return Ok(existing);
        }

        let gst_status =
            effective_gst_status(dto.gst_status, dto.gst_customer).unwrap_or(GstStatus::No);

        sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                mobile, name, state, city, address, pincode, email,
                influencer_id, source_code, created_by,
                call_status, rating, notes, follow_up_date,
                converted, gst_status, sales_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(&dto.mobile)
        .bind(&dto.name)
        .bind(&dto.state)
        .bind(&dto.city)
        .bind(&dto.address)
        .bind(&dto.pincode)
        .bind(&dto.email)
        .bind(dto.influencer_id)
        .bind(&dto.source_code)
        .bind(created_by)
        .bind(dto.call_status)
        .bind(dto.rating)
        .bind(&dto.notes)
        .bind(dto.follow_up_date)
        .bind(dto.converted.unwrap_or(false))
        .bind(gst_status)
        .bind(dto.sales_amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Lead with this mobile already exists"))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    pub async fn find_by_mobile(&self, mobile: &str) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE mobile = $1")
            .bind(mobile)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    /// List leads matching a pre-built filter predicate, paged and sorted.
    pub async fn list(&self, filter: &Filter, opts: &ListOptions) -> Result<Vec<Lead>, AppError> {
        let mut qb = QueryBuilder::new("SELECT * FROM leads WHERE 1=1");
        filter.push_sql(&mut qb);
        opts.push_sql(&mut qb);
        let leads = qb.build_query_as::<Lead>().fetch_all(&self.pool).await?;
        Ok(leads)
    }

    /// Sparse update: only fields present in the dto are written.
    pub async fn update(&self, id: Uuid, dto: UpdateLeadDto) -> Result<Lead, AppError> {
        let mut qb = QueryBuilder::new("UPDATE leads SET updated_at = now()");
        if let Some(v) = &dto.mobile {
            qb.push(", mobile = ").push_bind(v.clone());
        }
        if let Some(v) = &dto.name {
            qb.push(", name = ").push_bind(v.clone());
        }
        if let Some(v) = &dto.state {
            qb.push(", state = ").push_bind(v.clone());
        }
        if let Some(v) = &dto.city {
            qb.push(", city = ").push_bind(v.clone());
        }
        if let Some(v) = &dto.address {
            qb.push(", address = ").push_bind(v.clone());
        }
        if let Some(v) = &dto.pincode {
            qb.push(", pincode = ").push_bind(v.clone());
        }
        if let Some(v) = &dto.email {
            qb.push(", email = ").push_bind(v.clone());
        }
        if let Some(v) = dto.influencer_id {
            qb.push(", influencer_id = ").push_bind(v);
        }
        if let Some(v) = &dto.source_code {
            qb.push(", source_code = ").push_bind(v.clone());
        }
        if let Some(v) = dto.call_status {
            qb.push(", call_status = ").push_bind(v);
        }
        if let Some(v) = dto.rating {
            qb.push(", rating = ").push_bind(v);
        }
        if let Some(v) = &dto.notes {
            qb.push(", notes = ").push_bind(v.clone());
        }
        if let Some(v) = dto.follow_up_date {
            qb.push(", follow_up_date = ").push_bind(v);
        }
        if let Some(v) = dto.converted {
            qb.push(", converted = ").push_bind(v);
        }
        if let Some(v) = effective_gst_status(dto.gst_status, dto.gst_customer) {
            qb.push(", gst_status = ").push_bind(v);
        }
        if let Some(v) = dto.sales_amount {
            qb.push(", sales_amount = ").push_bind(v);
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        qb.build_query_as::<Lead>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Lead with this mobile already exists"))?
            .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))
    }

    /// Explicit admin delete. Leads are never deleted implicitly.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Lead not found".to_string()));
        }
        Ok(())
    }

    /// Overwrite the lead's latest-interaction snapshot with the fields
    /// present in `snapshot`, leaving absent fields untouched.
    ///
    /// This is the second write of the record-interaction sequence; it is a
    /// separate single-row write with no atomicity link to the interaction
    /// insert. The snapshot is a lagging cache of the interaction history.
    pub async fn apply_snapshot(
        &self,
        lead_id: Uuid,
        snapshot: &LeadSnapshot,
    ) -> Result<(), AppError> {
        if snapshot.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::new("UPDATE leads SET updated_at = now()");
        snapshot.push_set(&mut qb);
        qb.push(" WHERE id = ").push_bind(lead_id);
        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    /// Mark the lead converted and record the sale amount. Final write of
    /// the conversion sequence; the sale row stays authoritative if this
    /// write is lost to a crash.
    pub async fn apply_conversion(
        &self,
        lead_id: Uuid,
        converted: bool,
        sales_amount: Option<f64>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE leads SET converted = $2, sales_amount = $3, updated_at = now() WHERE id = $1",
        )
        .bind(lead_id)
        .bind(converted)
        .bind(sales_amount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
