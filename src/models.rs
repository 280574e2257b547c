use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Enums ============

/// Outcome of a call attempt against a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "call_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    Connected,
    NotConnected,
    Wrong,
}

/// GST registration status of a customer.
///
/// Three-valued on purpose: `APPLIED` means the registration is in flight.
/// A legacy boolean `gstCustomer` is still accepted on the wire and coerces
/// to `YES`/`NO` (see [`effective_gst_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gst_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GstStatus {
    Applied,
    Yes,
    No,
}

/// Lifecycle state of an influencer source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "source_code_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceCodeStatus {
    Active,
    Inactive,
}

/// User role. Only used for attribution and seed tooling here; authorization
/// decisions happen upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    NonAdmin,
}

/// Resolve the GST status actually meant by a payload that may carry the
/// enum, the legacy boolean, both, or neither. The enum wins when present;
/// the legacy boolean maps `true => YES`, `false => NO`.
pub fn effective_gst_status(
    gst_status: Option<GstStatus>,
    legacy_gst_customer: Option<bool>,
) -> Option<GstStatus> {
    gst_status.or(legacy_gst_customer.map(|b| if b { GstStatus::Yes } else { GstStatus::No }))
}

// ============ Database Models ============

/// A sales executive or admin account.
///
/// Consumed by the funnel core only for attribution and for joining display
/// names into dashboard aggregates.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: String,
    /// bcrypt hash; never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An influencer whose source codes attribute leads and sales.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Influencer {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One attribution code issued to an influencer.
///
/// Codes are append-only: deactivation sets `deactivated_at`, rows are never
/// removed, so the full issuance history is preserved.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCode {
    pub id: Uuid,
    pub influencer_id: Uuid,
    pub code: String,
    pub status: SourceCodeStatus,
    pub activated_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

/// An influencer together with its (possibly filtered) source codes, the
/// shape the API serves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluencerWithCodes {
    #[serde(flatten)]
    pub influencer: Influencer,
    pub source_codes: Vec<SourceCode>,
}

/// A prospective customer, keyed and deduplicated by mobile number.
///
/// `call_status` through `sales_amount` form the denormalized snapshot of
/// the latest interaction; the append-only interaction history is the
/// source of truth it is derived from.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    /// Globally unique; the primary dedup key.
    pub mobile: String,
    pub name: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub email: Option<String>,
    pub influencer_id: Option<Uuid>,
    pub source_code: Option<String>,
    /// User that first recorded this lead.
    pub created_by: Uuid,
    pub call_status: Option<CallStatus>,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub converted: bool,
    pub gst_status: GstStatus,
    /// Deprecated boolean alias for `gst_status = YES`; kept for old rows.
    pub gst_customer: Option<bool>,
    pub sales_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One logged contact attempt against a lead. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadInteraction {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub sales_executive_id: Uuid,
    pub call_status: CallStatus,
    pub rating: i32,
    pub notes: String,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub converted: bool,
    pub gst_status: GstStatus,
    pub created_at: DateTime<Utc>,
}

/// The terminal conversion record for a lead; at most one per lead.
///
/// `influencer_id` and `source_code` are copied from the lead at conversion
/// time, a point-in-time denormalization rather than a live reference.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub sales_executive_id: Uuid,
    pub influencer_id: Uuid,
    pub source_code: String,
    pub sale_amount: f64,
    pub gst_status: GstStatus,
    /// Deprecated boolean alias for `gst_status = YES`; kept for old rows.
    pub gst_customer: Option<bool>,
    pub sale_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Whether this sale counts as a GST customer: `YES`/`APPLIED`, or the
    /// legacy boolean flag set on rows written before the enum existed.
    pub fn is_gst_customer(&self) -> bool {
        matches!(self.gst_status, GstStatus::Yes | GstStatus::Applied)
            || self.gst_customer == Some(true)
    }
}

// ============ Request DTOs ============

/// Payload for creating (or idempotently fetching) a lead. Only `mobile` is
/// mandatory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadDto {
    pub mobile: String,
    pub name: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub email: Option<String>,
    pub influencer_id: Option<Uuid>,
    pub source_code: Option<String>,
    pub call_status: Option<CallStatus>,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub converted: Option<bool>,
    pub gst_status: Option<GstStatus>,
    /// Legacy alias; coerced via [`effective_gst_status`].
    pub gst_customer: Option<bool>,
    pub sales_amount: Option<f64>,
}

/// Sparse update payload for a lead; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadDto {
    pub mobile: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub email: Option<String>,
    pub influencer_id: Option<Uuid>,
    pub source_code: Option<String>,
    pub call_status: Option<CallStatus>,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub converted: Option<bool>,
    pub gst_status: Option<GstStatus>,
    pub gst_customer: Option<bool>,
    pub sales_amount: Option<f64>,
}

/// Payload for recording a contact attempt against a lead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInteractionDto {
    pub lead_id: Uuid,
    pub call_status: CallStatus,
    pub rating: i32,
    pub notes: String,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub converted: Option<bool>,
    pub gst_status: Option<GstStatus>,
    /// Legacy alias; coerced via [`effective_gst_status`].
    pub gst_customer: Option<bool>,
}

/// Payload for converting a lead into a sale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLeadDto {
    pub lead_id: Uuid,
    pub sale_amount: f64,
    pub gst_status: Option<GstStatus>,
    /// Legacy alias; coerced via [`effective_gst_status`].
    pub gst_customer: Option<bool>,
    pub sale_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInfluencerDto {
    pub name: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfluencerDto {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSourceCodeDto {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserDto {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
    pub role: UserRole,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

// ============ Dashboard Response Models ============

/// Funnel summary for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub total_leads: i64,
    pub interested: i64,
    pub non_interested: i64,
    pub wrong_numbers: i64,
    /// Leads in window with no interaction in window.
    pub pending_leads: i64,
    pub total_sales: i64,
    pub total_revenue: f64,
    pub gst_customers_percentage: f64,
}

/// Per-executive performance row, enriched with the user's display data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutivePerformance {
    pub sales_executive_id: Uuid,
    pub name: String,
    pub email: String,
    /// Interactions recorded by this executive in window.
    pub total_leads: i64,
    pub follow_ups: i64,
    pub sales: i64,
    pub conversion_percentage: f64,
}

/// Sales grouped by (influencer, source code) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluencerSales {
    pub influencer_id: Uuid,
    /// Null-safe: the influencer row may have been deleted.
    pub influencer_name: Option<String>,
    pub source_code: String,
    pub total_sales: i64,
    pub total_revenue: f64,
}

/// Funnel summary scoped to a single sales executive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    /// Unique leads this executive has interacted with in window.
    pub total_leads: i64,
    pub interested: i64,
    pub non_interested: i64,
    pub wrong_numbers: i64,
    /// Leads created by this executive with no interaction by anyone.
    /// Intentionally a different definition than the admin view.
    pub pending_leads: i64,
    pub total_sales: i64,
    pub total_revenue: f64,
    pub gst_customers_percentage: f64,
    pub current_month_sales: i64,
    pub current_month_revenue: f64,
}
