use crate::errors::AppError;
use crate::filters::ListOptions;
use crate::leads::{LeadSnapshot, LeadStore};
use crate::models::{effective_gst_status, CreateInteractionDto, GstStatus, LeadInteraction};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

/// Storage service for the append-only interaction history.
pub struct InteractionStore {
    pool: PgPool,
}

impl InteractionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a contact attempt and propagate it onto the lead's snapshot.
    ///
    /// Two sequential single-row writes: the history insert is authoritative,
    /// the snapshot update is best-effort denormalization. A crash between
    /// the two leaves the snapshot stale, never the history wrong.
    pub async fn record(
        &self,
        leads: &LeadStore,
        dto: CreateInteractionDto,
        sales_executive_id: Uuid,
    ) -> Result<LeadInteraction, AppError> {
        if !(1..=5).contains(&dto.rating) {
            return Err(AppError::BadRequest(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        if leads.find_by_id(dto.lead_id).await?.is_none() {
            return Err(AppError::NotFound("Lead not found".to_string()));
        }

        let gst_status = effective_gst_status(dto.gst_status, dto.gst_customer);

        let interaction = sqlx::query_as::<_, LeadInteraction>(
            r#"
            INSERT INTO lead_interactions (
                lead_id, sales_executive_id, call_status, rating, notes,
                follow_up_date, converted, gst_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(dto.lead_id)
        .bind(sales_executive_id)
        .bind(dto.call_status)
        .bind(dto.rating)
        .bind(&dto.notes)
        .bind(dto.follow_up_date)
        .bind(dto.converted.unwrap_or(false))
        .bind(gst_status.unwrap_or(GstStatus::No))
        .fetch_one(&self.pool)
        .await?;

        // Mandatory fields always overwrite; optional ones only when given.
        let snapshot = LeadSnapshot {
            call_status: Some(dto.call_status),
            rating: Some(dto.rating),
            notes: Some(dto.notes.clone()),
            follow_up_date: dto.follow_up_date,
            converted: dto.converted,
            gst_status,
        };
        leads.apply_snapshot(dto.lead_id, &snapshot).await?;

        Ok(interaction)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LeadInteraction>, AppError> {
        let interaction =
            sqlx::query_as::<_, LeadInteraction>("SELECT * FROM lead_interactions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(interaction)
    }

    /// Full history for a lead, newest first.
    pub async fn find_by_lead(&self, lead_id: Uuid) -> Result<Vec<LeadInteraction>, AppError> {
        let interactions = sqlx::query_as::<_, LeadInteraction>(
            "SELECT * FROM lead_interactions WHERE lead_id = $1 ORDER BY created_at DESC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(interactions)
    }

    /// The most recent interaction for a lead, if any. Recency is decided by
    /// `created_at`; this is the row the conversion flow flips.
    pub async fn latest_for_lead(
        &self,
        lead_id: Uuid,
    ) -> Result<Option<LeadInteraction>, AppError> {
        let interaction = sqlx::query_as::<_, LeadInteraction>(
            "SELECT * FROM lead_interactions WHERE lead_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(interaction)
    }

    /// Interactions recorded by one executive, newest first, paged.
    pub async fn find_by_executive(
        &self,
        sales_executive_id: Uuid,
        opts: &ListOptions,
    ) -> Result<Vec<LeadInteraction>, AppError> {
        let mut qb =
            QueryBuilder::new("SELECT * FROM lead_interactions WHERE sales_executive_id = ");
        qb.push_bind(sales_executive_id);
        opts.push_sql(&mut qb);
        let interactions = qb
            .build_query_as::<LeadInteraction>()
            .fetch_all(&self.pool)
            .await?;
        Ok(interactions)
    }

    pub async fn list(&self, opts: &ListOptions) -> Result<Vec<LeadInteraction>, AppError> {
        let mut qb = QueryBuilder::new("SELECT * FROM lead_interactions WHERE 1=1");
        opts.push_sql(&mut qb);
        let interactions = qb
            .build_query_as::<LeadInteraction>()
            .fetch_all(&self.pool)
            .await?;
        Ok(interactions)
    }

    /// Flip the converted flag on one history row. Used by the conversion
    /// flow to mark the closing interaction.
    pub async fn mark_converted(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE lead_interactions SET converted = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
