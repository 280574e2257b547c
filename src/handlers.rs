use crate::config::Config;
use crate::dashboard::{parse_date_param, DashboardStore};
use crate::errors::AppError;
use crate::filters::{build_filter, list_options, LEAD_FILTER_ALLOWLIST, SALE_FILTER_ALLOWLIST};
use crate::influencers::{InfluencerStore, INFLUENCER_SORTABLE};
use crate::interactions::InteractionStore;
use crate::leads::{LeadStore, LEAD_SORTABLE};
use crate::models::*;
use crate::sales::{SaleStore, SALE_SORTABLE};
use crate::users::{UserStore, USER_SORTABLE};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    pub leads: LeadStore,
    pub interactions: InteractionStore,
    pub sales: SaleStore,
    pub influencers: InfluencerStore,
    pub users: UserStore,
    pub dashboard: DashboardStore,
}

/// Resolve the caller identity stamped by the upstream gateway. Every write
/// and every scoped read requires it; authentication itself happens upstream.
fn caller_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".to_string()))?;
    Uuid::parse_str(raw)
        .map_err(|_| AppError::Unauthorized("Invalid x-user-id header".to_string()))
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-funnel-api",
            "version": "0.1.0"
        })),
    )
}

// ============ Leads ============

/// POST /api/v1/leads
///
/// Idempotent on mobile: resubmitting an existing number returns the stored
/// lead unchanged.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(dto): Json<CreateLeadDto>,
) -> Result<(StatusCode, Json<Lead>), AppError> {
    let caller = caller_id(&headers)?;
    if dto.mobile.trim().is_empty() {
        return Err(AppError::BadRequest("Mobile number is required".to_string()));
    }
    if let Some(rating) = dto.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
    }
    let lead = state.leads.create_or_find(dto, caller).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// GET /api/v1/leads
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Lead>>, AppError> {
    let filter = build_filter(&query, LEAD_FILTER_ALLOWLIST);
    let opts = list_options(&query, LEAD_SORTABLE, "created_at");
    let leads = state.leads.list(&filter, &opts).await?;
    Ok(Json(leads))
}

/// GET /api/v1/leads/:id
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Lead>, AppError> {
    state
        .leads
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))
}

/// PATCH /api/v1/leads/:id
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(dto): Json<UpdateLeadDto>,
) -> Result<Json<Lead>, AppError> {
    if let Some(rating) = dto.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
    }
    let lead = state.leads.update(id, dto).await?;
    Ok(Json(lead))
}

/// DELETE /api/v1/leads/:id
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.leads.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Interactions ============

/// POST /api/v1/interactions
///
/// Appends to the lead's history and refreshes the lead's snapshot.
pub async fn record_interaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(dto): Json<CreateInteractionDto>,
) -> Result<(StatusCode, Json<LeadInteraction>), AppError> {
    let caller = caller_id(&headers)?;
    let interaction = state.interactions.record(&state.leads, dto, caller).await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

/// GET /api/v1/interactions
pub async fn list_interactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<LeadInteraction>>, AppError> {
    let opts = list_options(&query, &[("createdAt", "created_at")], "created_at");
    let interactions = state.interactions.list(&opts).await?;
    Ok(Json(interactions))
}

/// GET /api/v1/interactions/my
pub async fn list_my_interactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<LeadInteraction>>, AppError> {
    let caller = caller_id(&headers)?;
    let opts = list_options(&query, &[("createdAt", "created_at")], "created_at");
    let interactions = state.interactions.find_by_executive(caller, &opts).await?;
    Ok(Json(interactions))
}

/// GET /api/v1/interactions/:id
pub async fn get_interaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeadInteraction>, AppError> {
    state
        .interactions
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Interaction not found".to_string()))
}

/// GET /api/v1/leads/:id/interactions
pub async fn list_lead_interactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LeadInteraction>>, AppError> {
    if state.leads.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("Lead not found".to_string()));
    }
    let interactions = state.interactions.find_by_lead(id).await?;
    Ok(Json(interactions))
}

// ============ Sales ============

/// POST /api/v1/sales/convert
pub async fn convert_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(dto): Json<ConvertLeadDto>,
) -> Result<(StatusCode, Json<Sale>), AppError> {
    let caller = caller_id(&headers)?;
    let sale = state
        .sales
        .convert(&state.leads, &state.interactions, dto, caller)
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

fn sale_date_range(
    query: &HashMap<String, String>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let from = query
        .get("saleDateFrom")
        .filter(|v| !v.is_empty())
        .map(|v| parse_date_param(v))
        .transpose()?;
    let to = query
        .get("saleDateTo")
        .filter(|v| !v.is_empty())
        .map(|v| parse_date_param(v))
        .transpose()?;
    Ok((from, to))
}

/// GET /api/v1/sales
pub async fn list_sales(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Sale>>, AppError> {
    let filter = build_filter(&query, SALE_FILTER_ALLOWLIST);
    let opts = list_options(&query, SALE_SORTABLE, "sale_date");
    let (from, to) = sale_date_range(&query)?;
    let mobile = query.get("mobile").filter(|v| !v.is_empty());
    let sales = state
        .sales
        .list(&filter, None, from, to, mobile.map(String::as_str), &opts)
        .await?;
    Ok(Json(sales))
}

/// GET /api/v1/sales/my
pub async fn list_my_sales(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Sale>>, AppError> {
    let caller = caller_id(&headers)?;
    let filter = build_filter(&query, SALE_FILTER_ALLOWLIST);
    let opts = list_options(&query, SALE_SORTABLE, "sale_date");
    let (from, to) = sale_date_range(&query)?;
    let mobile = query.get("mobile").filter(|v| !v.is_empty());
    let sales = state
        .sales
        .list(
            &filter,
            Some(caller),
            from,
            to,
            mobile.map(String::as_str),
            &opts,
        )
        .await?;
    Ok(Json(sales))
}

/// GET /api/v1/sales/:id
pub async fn get_sale(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sale>, AppError> {
    state
        .sales
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Sale not found".to_string()))
}

// ============ Influencers ============

/// POST /api/v1/influencers
pub async fn create_influencer(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<CreateInfluencerDto>,
) -> Result<(StatusCode, Json<Influencer>), AppError> {
    if dto.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    let influencer = state.influencers.create(dto).await?;
    Ok((StatusCode::CREATED, Json(influencer)))
}

/// GET /api/v1/influencers
pub async fn list_influencers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<InfluencerWithCodes>>, AppError> {
    let opts = list_options(&query, INFLUENCER_SORTABLE, "created_at");
    let influencers = state.influencers.list(&opts).await?;
    Ok(Json(influencers))
}

/// GET /api/v1/influencers/active
///
/// Active influencers with only their live codes, the list lead entry forms
/// offer for attribution.
pub async fn list_active_influencers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<InfluencerWithCodes>>, AppError> {
    let influencers = state.influencers.list_active().await?;
    Ok(Json(influencers))
}

/// GET /api/v1/influencers/:id
pub async fn get_influencer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<InfluencerWithCodes>, AppError> {
    state
        .influencers
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Influencer not found".to_string()))
}

/// POST /api/v1/influencers/:id/source-codes
pub async fn add_source_code(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(dto): Json<AddSourceCodeDto>,
) -> Result<(StatusCode, Json<InfluencerWithCodes>), AppError> {
    let influencer = state.influencers.add_source_code(id, dto).await?;
    Ok((StatusCode::CREATED, Json(influencer)))
}

/// PATCH /api/v1/influencers/:id
pub async fn update_influencer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(dto): Json<UpdateInfluencerDto>,
) -> Result<Json<Influencer>, AppError> {
    let influencer = state.influencers.update(id, dto).await?;
    Ok(Json(influencer))
}

/// DELETE /api/v1/influencers/:id
pub async fn delete_influencer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.influencers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Users ============

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<CreateUserDto>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if dto.email.trim().is_empty() || dto.password.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    let user = state.users.create(dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<User>>, AppError> {
    let opts = list_options(&query, USER_SORTABLE, "created_at");
    let users = state.users.list(&opts).await?;
    Ok(Json(users))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    state
        .users
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// PATCH /api/v1/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(dto): Json<UpdateUserDto>,
) -> Result<Json<User>, AppError> {
    let user = state.users.update(id, dto).await?;
    Ok(Json(user))
}

/// DELETE /api/v1/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Dashboard ============

fn dashboard_window(
    query: &HashMap<String, String>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let from = query
        .get("startDate")
        .filter(|v| !v.is_empty())
        .map(|v| parse_date_param(v))
        .transpose()?;
    let to = query
        .get("endDate")
        .filter(|v| !v.is_empty())
        .map(|v| parse_date_param(v))
        .transpose()?;
    Ok((from, to))
}

/// GET /api/v1/dashboard/admin-summary
pub async fn admin_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<AdminSummary>, AppError> {
    let (from, to) = dashboard_window(&query)?;
    let summary = state.dashboard.admin_summary(from, to).await?;
    Ok(Json(summary))
}

/// GET /api/v1/dashboard/executives-performance
pub async fn executives_performance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ExecutivePerformance>>, AppError> {
    let (from, to) = dashboard_window(&query)?;
    let rows = state.dashboard.executives_performance(from, to).await?;
    Ok(Json(rows))
}

/// GET /api/v1/dashboard/influencer-sales
pub async fn influencer_sales(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<InfluencerSales>>, AppError> {
    let (from, to) = dashboard_window(&query)?;
    let rows = state.dashboard.influencer_sales(from, to).await?;
    Ok(Json(rows))
}

/// GET /api/v1/dashboard/my-summary
pub async fn my_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<SalesSummary>, AppError> {
    let caller = caller_id(&headers)?;
    let (from, to) = dashboard_window(&query)?;
    let summary = state.dashboard.executive_summary(caller, from, to).await?;
    Ok(Json(summary))
}
