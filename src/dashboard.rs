//! Dashboard aggregation.
//!
//! Each endpoint fetches the rows inside the requested window and folds them
//! in memory with pure functions, keeping the formulas unit-testable without
//! a database. Windows are inclusive on both ends; leads and interactions
//! window on `created_at`, sales on `sale_date`.

use crate::errors::AppError;
use crate::models::{
    AdminSummary, CallStatus, ExecutivePerformance, InfluencerSales, LeadInteraction, Sale,
    SalesSummary,
};
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use moka::future::Cache;
use sqlx::{PgPool, QueryBuilder};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use uuid::Uuid;

/// Round to two decimals, the precision every percentage field is served at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse a `startDate`/`endDate` query value. Accepts RFC 3339 timestamps and
/// bare `YYYY-MM-DD` dates (taken as midnight UTC).
pub fn parse_date_param(value: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default()));
    }
    Err(AppError::BadRequest(format!(
        "Invalid date: '{}'. Expected RFC 3339 or YYYY-MM-DD",
        value
    )))
}

/// Start of the current calendar month by server wall clock, the boundary the
/// executive summary's current-month figures cut on.
fn current_month_start() -> DateTime<Utc> {
    let now = Local::now();
    Local
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

// ============ Pure aggregation ============

/// Fold the admin funnel summary. The sentiment buckets count interactions,
/// not leads; `WRONG` calls are excluded from both sentiment buckets whatever
/// their rating. Pending leads are windowed leads nobody interacted with in
/// the same window.
pub fn fold_admin_summary(
    lead_ids: &[Uuid],
    interactions: &[LeadInteraction],
    sales: &[Sale],
) -> AdminSummary {
    let interested = interactions
        .iter()
        .filter(|i| i.rating >= 3 && i.call_status != CallStatus::Wrong)
        .count() as i64;
    let non_interested = interactions
        .iter()
        .filter(|i| i.rating <= 2 && i.call_status != CallStatus::Wrong)
        .count() as i64;
    let wrong_numbers = interactions
        .iter()
        .filter(|i| i.call_status == CallStatus::Wrong)
        .count() as i64;

    let touched: HashSet<Uuid> = interactions.iter().map(|i| i.lead_id).collect();
    let pending_leads = lead_ids.iter().filter(|id| !touched.contains(id)).count() as i64;

    let (total_sales, total_revenue, gst_percentage) = fold_sales_figures(sales);

    AdminSummary {
        total_leads: lead_ids.len() as i64,
        interested,
        non_interested,
        wrong_numbers,
        pending_leads,
        total_sales,
        total_revenue,
        gst_customers_percentage: gst_percentage,
    }
}

/// Count, revenue and GST-customer share of a set of sales. The percentage is
/// 0 when there are no sales, never NaN.
pub fn fold_sales_figures(sales: &[Sale]) -> (i64, f64, f64) {
    let total = sales.len() as i64;
    let revenue: f64 = sales.iter().map(|s| s.sale_amount).sum();
    let gst = sales.iter().filter(|s| s.is_gst_customer()).count();
    let percentage = if total > 0 {
        round2(gst as f64 / total as f64 * 100.0)
    } else {
        0.0
    };
    (total, revenue, percentage)
}

/// Per-executive counters before the user join fills in name and email.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutiveStats {
    pub sales_executive_id: Uuid,
    pub total_leads: i64,
    pub follow_ups: i64,
    pub sales: i64,
    pub conversion_percentage: f64,
}

/// Group interactions and sales by executive. `total_leads` counts
/// interactions (an executive calling the same lead twice counts twice);
/// conversion is sales over that count. Executives appear in first-seen
/// order, interactions before sales-only entries.
pub fn fold_executive_stats(
    interactions: &[LeadInteraction],
    sales: &[Sale],
) -> Vec<ExecutiveStats> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut stats: Vec<ExecutiveStats> = Vec::new();

    fn entry(
        id: Uuid,
        index: &mut HashMap<Uuid, usize>,
        stats: &mut Vec<ExecutiveStats>,
    ) -> usize {
        *index.entry(id).or_insert_with(|| {
            stats.push(ExecutiveStats {
                sales_executive_id: id,
                total_leads: 0,
                follow_ups: 0,
                sales: 0,
                conversion_percentage: 0.0,
            });
            stats.len() - 1
        })
    }

    for interaction in interactions {
        let i = entry(interaction.sales_executive_id, &mut index, &mut stats);
        stats[i].total_leads += 1;
        if interaction.follow_up_date.is_some() {
            stats[i].follow_ups += 1;
        }
    }
    for sale in sales {
        let i = entry(sale.sales_executive_id, &mut index, &mut stats);
        stats[i].sales += 1;
    }
    for s in &mut stats {
        s.conversion_percentage = if s.total_leads > 0 {
            round2(s.sales as f64 / s.total_leads as f64 * 100.0)
        } else {
            0.0
        };
    }
    stats
}

/// Group sales by their copied (influencer, source code) attribution pair.
/// Names are joined in afterwards; a missing influencer row yields a null
/// name, never drops the group.
pub fn fold_attribution_groups(sales: &[Sale]) -> Vec<InfluencerSales> {
    let mut order: Vec<(Uuid, String)> = Vec::new();
    let mut groups: HashMap<(Uuid, String), (i64, f64)> = HashMap::new();

    for sale in sales {
        let key = (sale.influencer_id, sale.source_code.clone());
        match groups.get_mut(&key) {
            Some((count, revenue)) => {
                *count += 1;
                *revenue += sale.sale_amount;
            }
            None => {
                groups.insert(key.clone(), (1, sale.sale_amount));
                order.push(key);
            }
        }
    }

    order
        .into_iter()
        .map(|key| {
            let (total_sales, total_revenue) = groups[&key];
            InfluencerSales {
                influencer_id: key.0,
                influencer_name: None,
                source_code: key.1,
                total_sales,
                total_revenue,
            }
        })
        .collect()
}

/// Fold one executive's funnel summary from their own windowed interactions
/// and sales. `total_leads` here is distinct leads touched, a deliberately
/// different reading than the admin view's. `pending_leads` is supplied by
/// the caller because its scope (leads the executive created, unwindowed,
/// untouched by anyone) is not derivable from these rows.
pub fn fold_executive_summary(
    interactions: &[LeadInteraction],
    sales: &[Sale],
    pending_leads: i64,
    month_start: DateTime<Utc>,
) -> SalesSummary {
    let distinct_leads: HashSet<Uuid> = interactions.iter().map(|i| i.lead_id).collect();
    let interested = interactions
        .iter()
        .filter(|i| i.rating >= 3 && i.call_status != CallStatus::Wrong)
        .count() as i64;
    let non_interested = interactions
        .iter()
        .filter(|i| i.rating <= 2 && i.call_status != CallStatus::Wrong)
        .count() as i64;
    let wrong_numbers = interactions
        .iter()
        .filter(|i| i.call_status == CallStatus::Wrong)
        .count() as i64;

    let (total_sales, total_revenue, gst_percentage) = fold_sales_figures(sales);

    let current_month: Vec<&Sale> = sales.iter().filter(|s| s.sale_date >= month_start).collect();
    let current_month_revenue: f64 = current_month.iter().map(|s| s.sale_amount).sum();

    SalesSummary {
        total_leads: distinct_leads.len() as i64,
        interested,
        non_interested,
        wrong_numbers,
        pending_leads,
        total_sales,
        total_revenue,
        gst_customers_percentage: gst_percentage,
        current_month_sales: current_month.len() as i64,
        current_month_revenue,
    }
}

// ============ Store ============

/// Fetches windowed rows and serves the folded aggregates, joining user and
/// influencer display names in at the edge.
pub struct DashboardStore {
    pool: PgPool,
    /// Display-name cache for the executive performance join. Entries expire
    /// quickly so renames show up within a minute.
    user_cache: Cache<Uuid, Option<(String, String)>>,
}

impl DashboardStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            user_cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(60))
                .build(),
        }
    }

    pub async fn admin_summary(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<AdminSummary, AppError> {
        let lead_ids = self.fetch_lead_ids(from, to).await?;
        let interactions = self.fetch_interactions(None, from, to).await?;
        let sales = self.fetch_sales(None, from, to).await?;
        Ok(fold_admin_summary(&lead_ids, &interactions, &sales))
    }

    pub async fn executives_performance(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExecutivePerformance>, AppError> {
        let interactions = self.fetch_interactions(None, from, to).await?;
        let sales = self.fetch_sales(None, from, to).await?;
        let stats = fold_executive_stats(&interactions, &sales);

        let mut rows = Vec::with_capacity(stats.len());
        for stat in stats {
            let user = self.user_display(stat.sales_executive_id).await?;
            let (name, email) = user.unwrap_or_else(|| ("Unknown".to_string(), String::new()));
            rows.push(ExecutivePerformance {
                sales_executive_id: stat.sales_executive_id,
                name,
                email,
                total_leads: stat.total_leads,
                follow_ups: stat.follow_ups,
                sales: stat.sales,
                conversion_percentage: stat.conversion_percentage,
            });
        }
        Ok(rows)
    }

    pub async fn influencer_sales(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<InfluencerSales>, AppError> {
        let sales = self.fetch_sales(None, from, to).await?;
        let mut groups = fold_attribution_groups(&sales);

        let ids: Vec<Uuid> = groups.iter().map(|g| g.influencer_id).collect();
        let names: HashMap<Uuid, String> = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, name FROM influencers WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        for group in &mut groups {
            group.influencer_name = names.get(&group.influencer_id).cloned();
        }
        Ok(groups)
    }

    pub async fn executive_summary(
        &self,
        sales_executive_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<SalesSummary, AppError> {
        let interactions = self
            .fetch_interactions(Some(sales_executive_id), from, to)
            .await?;
        let sales = self
            .fetch_sales(Some(sales_executive_id), from, to)
            .await?;

        // Leads this executive created that nobody has touched, regardless of
        // the requested window.
        let pending_leads = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM leads l
            WHERE l.created_by = $1
              AND NOT EXISTS (
                  SELECT 1 FROM lead_interactions li WHERE li.lead_id = l.id
              )
            "#,
        )
        .bind(sales_executive_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(fold_executive_summary(
            &interactions,
            &sales,
            pending_leads,
            current_month_start(),
        ))
    }

    async fn fetch_lead_ids(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Uuid>, AppError> {
        let mut qb = QueryBuilder::new("SELECT id FROM leads WHERE 1=1");
        push_window(&mut qb, "created_at", from, to);
        let ids = qb
            .build_query_scalar::<Uuid>()
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn fetch_interactions(
        &self,
        executive: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<LeadInteraction>, AppError> {
        let mut qb = QueryBuilder::new("SELECT * FROM lead_interactions WHERE 1=1");
        if let Some(executive) = executive {
            qb.push(" AND sales_executive_id = ").push_bind(executive);
        }
        push_window(&mut qb, "created_at", from, to);
        let interactions = qb
            .build_query_as::<LeadInteraction>()
            .fetch_all(&self.pool)
            .await?;
        Ok(interactions)
    }

    async fn fetch_sales(
        &self,
        executive: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Sale>, AppError> {
        let mut qb = QueryBuilder::new("SELECT * FROM sales WHERE 1=1");
        if let Some(executive) = executive {
            qb.push(" AND sales_executive_id = ").push_bind(executive);
        }
        push_window(&mut qb, "sale_date", from, to);
        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }

    async fn user_display(&self, id: Uuid) -> Result<Option<(String, String)>, AppError> {
        if let Some(cached) = self.user_cache.get(&id).await {
            return Ok(cached);
        }
        let user = sqlx::query_as::<_, (String, String)>(
            "SELECT name, email FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.user_cache.insert(id, user.clone()).await;
        Ok(user)
    }
}

fn push_window(
    qb: &mut QueryBuilder<'_, sqlx::Postgres>,
    column: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) {
    if let Some(from) = from {
        qb.push(" AND ").push(column).push(" >= ").push_bind(from);
    }
    if let Some(to) = to {
        qb.push(" AND ").push(column).push(" <= ").push_bind(to);
    }
}
