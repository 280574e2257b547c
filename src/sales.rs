use crate::errors::{conflict_on_unique, AppError};
use crate::filters::{Filter, ListOptions};
use crate::interactions::InteractionStore;
use crate::leads::LeadStore;
use crate::models::{effective_gst_status, ConvertLeadDto, Sale};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

/// Wire-name to column mapping for sale list sorting.
pub const SALE_SORTABLE: &[(&str, &str)] = &[
    ("saleDate", "sale_date"),
    ("saleAmount", "sale_amount"),
    ("createdAt", "created_at"),
];

/// Storage service for sales and the lead-to-sale conversion flow.
pub struct SaleStore {
    pool: PgPool,
}

impl SaleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert a lead into a sale.
    ///
    /// The sequence is ordered so that each gate is checked before any write,
    /// and the writes run from least to most authoritative:
    ///
    /// 1. the lead must exist
    /// 2. no sale may already exist for it
    /// 3. it must have at least one recorded interaction
    /// 4. flip `converted` on the latest interaction
    /// 5. the lead must carry influencer attribution
    /// 6. insert the sale row (unique on `lead_id`; a concurrent winner turns
    ///    this into a `Conflict`)
    /// 7. mark the lead converted and stamp the amount
    ///
    /// The writes are independent single-row statements. A crash mid-sequence
    /// can leave a flipped interaction without a sale, or a sale without the
    /// lead flag; the sale row is the authority and step 2 keeps a retry from
    /// double-selling.
    pub async fn convert(
        &self,
        leads: &LeadStore,
        interactions: &InteractionStore,
        dto: ConvertLeadDto,
        sales_executive_id: Uuid,
    ) -> Result<Sale, AppError> {
        if !dto.sale_amount.is_finite() || dto.sale_amount < 0.0 {
            return Err(AppError::BadRequest(
                "Sale amount must be a non-negative number".to_string(),
            ));
        }

        let lead = leads
            .find_by_id(dto.lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

        if self.find_by_lead(dto.lead_id).await?.is_some() {
            return Err(AppError::Conflict(
                "Lead has already been converted to a sale".to_string(),
            ));
        }

        let latest = interactions
            .latest_for_lead(dto.lead_id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(
                    "Cannot convert a lead without any recorded interactions".to_string(),
                )
            })?;

        interactions.mark_converted(latest.id).await?;

        // Attribution is copied from the lead at this moment; later edits to
        // the lead do not retroactively change the sale.
        let (influencer_id, source_code) = match (lead.influencer_id, &lead.source_code) {
            (Some(id), Some(code)) => (id, code.clone()),
            _ => {
                return Err(AppError::BadRequest(
                    "Lead has no influencer attribution".to_string(),
                ))
            }
        };

        let gst_status =
            effective_gst_status(dto.gst_status, dto.gst_customer).unwrap_or(lead.gst_status);

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (
                lead_id, sales_executive_id, influencer_id, source_code,
                sale_amount, gst_status, sale_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(dto.lead_id)
        .bind(sales_executive_id)
        .bind(influencer_id)
        .bind(&source_code)
        .bind(dto.sale_amount)
        .bind(gst_status)
        .bind(dto.sale_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Lead has already been converted to a sale"))?;

        leads
            .apply_conversion(dto.lead_id, true, Some(dto.sale_amount))
            .await?;

        Ok(sale)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Sale>, AppError> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn find_by_lead(&self, lead_id: Uuid) -> Result<Option<Sale>, AppError> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE lead_id = $1")
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    /// List sales with the typed filter plus the date-range and mobile
    /// lookups the filter builder does not cover.
    ///
    /// `executive` scopes the list to one executive's own sales. `mobile`
    /// resolves through the lead, since the sale row does not carry the
    /// customer's number.
    pub async fn list(
        &self,
        filter: &Filter,
        executive: Option<Uuid>,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
        mobile: Option<&str>,
        opts: &ListOptions,
    ) -> Result<Vec<Sale>, AppError> {
        let mut qb = QueryBuilder::new("SELECT * FROM sales WHERE 1=1");
        filter.push_sql(&mut qb);
        if let Some(executive) = executive {
            qb.push(" AND sales_executive_id = ").push_bind(executive);
        }
        if let Some(from) = date_from {
            qb.push(" AND sale_date >= ").push_bind(from);
        }
        if let Some(to) = date_to {
            qb.push(" AND sale_date <= ").push_bind(to);
        }
        if let Some(mobile) = mobile {
            qb.push(" AND lead_id IN (SELECT id FROM leads WHERE mobile = ")
                .push_bind(mobile.to_string())
                .push(")");
        }
        opts.push_sql(&mut qb);
        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }
}
