//! Query-parameter filter builder.
//!
//! Translates an allow-listed set of untyped query parameters into a typed
//! predicate that the list endpoints render into WHERE clauses with bound
//! parameters. This is the only boundary between untrusted input and the
//! query layer, so it is total (never errors) and deterministic: unknown
//! keys, empty values and malformed values are silently dropped, and the
//! same input always yields the same predicate.

use sqlx::{Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

/// Control keys consumed by pagination/sorting; never part of a filter even
/// if an allow-list were to mention them.
pub const RESERVED_KEYS: [&str; 4] = ["page", "limit", "sortBy", "sortOrder"];

/// How a query-parameter value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Case-insensitive substring match; the value is regex-escaped first.
    String,
    /// Exact string equality.
    StringExact,
    /// UUID equality; malformed ids are dropped (yielding "no such value"
    /// rather than an error).
    Uuid,
    /// Strict `true`/`false`.
    Boolean,
    /// Finite number equality.
    Number,
}

/// A single typed predicate value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Regex-escaped pattern, applied case-insensitively (`~*`).
    Substring(String),
    Exact(String),
    Id(Uuid),
    Bool(bool),
    Number(f64),
}

/// Allow-list entry: wire parameter name, SQL column it maps to, type tag.
/// Column names are static program text, never user input.
pub type AllowlistEntry = (&'static str, &'static str, FilterType);

/// Filterable keys for leads. Add an entry here to allow filtering by that
/// field.
pub const LEAD_FILTER_ALLOWLIST: &[AllowlistEntry] = &[
    ("name", "name", FilterType::String),
    ("mobile", "mobile", FilterType::String),
    ("state", "state", FilterType::String),
    ("city", "city", FilterType::String),
    ("address", "address", FilterType::String),
    ("pincode", "pincode", FilterType::String),
    ("email", "email", FilterType::String),
    ("influencerId", "influencer_id", FilterType::Uuid),
    ("sourceCode", "source_code", FilterType::String),
    ("callStatus", "call_status", FilterType::StringExact),
    ("converted", "converted", FilterType::Boolean),
    ("gstStatus", "gst_status", FilterType::StringExact),
    ("rating", "rating", FilterType::Number),
];

/// Filterable keys for sales. Date-range (`saleDateFrom`/`saleDateTo`) and
/// `mobile` lookups get special handling in the sale store, not here.
pub const SALE_FILTER_ALLOWLIST: &[AllowlistEntry] = &[
    ("influencerId", "influencer_id", FilterType::Uuid),
    ("sourceCode", "source_code", FilterType::String),
    ("gstStatus", "gst_status", FilterType::StringExact),
    ("leadId", "lead_id", FilterType::Uuid),
    ("saleAmount", "sale_amount", FilterType::Number),
];

/// A typed predicate: ordered (allow-list order) list of column/value pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(&'static str, FilterValue)>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(&'static str, FilterValue)] {
        &self.clauses
    }

    /// Render the predicate into `qb` as ` AND col <op> $n` fragments.
    /// Values are always bound, never spliced; enum and numeric columns are
    /// cast so equality works regardless of the column's concrete type.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (column, value) in &self.clauses {
            match value {
                FilterValue::Substring(pattern) => {
                    qb.push(" AND ")
                        .push(*column)
                        .push(" ~* ")
                        .push_bind(pattern.clone());
                }
                FilterValue::Exact(s) => {
                    qb.push(" AND ")
                        .push(*column)
                        .push("::text = ")
                        .push_bind(s.clone());
                }
                FilterValue::Id(id) => {
                    qb.push(" AND ").push(*column).push(" = ").push_bind(*id);
                }
                FilterValue::Bool(b) => {
                    qb.push(" AND ").push(*column).push(" = ").push_bind(*b);
                }
                FilterValue::Number(n) => {
                    qb.push(" AND ")
                        .push(*column)
                        .push("::float8 = ")
                        .push_bind(*n);
                }
            }
        }
    }
}

/// Build a typed predicate from raw query parameters.
///
/// Only allow-listed, present, non-empty, well-typed values make it into the
/// result; everything else is dropped without error.
pub fn build_filter(query: &HashMap<String, String>, allowlist: &[AllowlistEntry]) -> Filter {
    let mut clauses = Vec::new();
    for &(key, column, filter_type) in allowlist {
        if RESERVED_KEYS.contains(&key) {
            continue;
        }
        let raw = match query.get(key) {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };
        let value = match filter_type {
            FilterType::String => Some(FilterValue::Substring(regex::escape(raw))),
            FilterType::StringExact => Some(FilterValue::Exact(raw.clone())),
            FilterType::Uuid => Uuid::parse_str(raw).ok().map(FilterValue::Id),
            FilterType::Boolean => match raw.as_str() {
                "true" => Some(FilterValue::Bool(true)),
                "false" => Some(FilterValue::Bool(false)),
                _ => None,
            },
            FilterType::Number => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FilterValue::Number),
        };
        if let Some(value) = value {
            clauses.push((column, value));
        }
    }
    Filter { clauses }
}

// ============ Pagination & sorting ============

/// Parsed pagination/sorting controls from the reserved query keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    pub skip: i64,
    pub limit: i64,
    /// Always one of the caller-supplied sortable columns.
    pub sort_column: &'static str,
    pub sort_desc: bool,
}

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Parse `page`/`limit`/`sortBy`/`sortOrder`. `sortable` maps wire names to
/// columns; an unknown `sortBy` falls back to `default_column`. Malformed
/// numbers fall back to defaults rather than erroring, matching the filter
/// builder's drop-don't-fail policy.
pub fn list_options(
    query: &HashMap<String, String>,
    sortable: &[(&'static str, &'static str)],
    default_column: &'static str,
) -> ListOptions {
    let page = query
        .get("page")
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let limit = query
        .get("limit")
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|l| *l >= 1)
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT);
    let sort_column = query
        .get("sortBy")
        .and_then(|key| {
            sortable
                .iter()
                .find(|(wire, _)| wire == key)
                .map(|(_, col)| *col)
        })
        .unwrap_or(default_column);
    let sort_desc = match query.get("sortOrder").map(String::as_str) {
        Some("asc") | Some("ASC") => false,
        _ => true,
    };
    ListOptions {
        // Saturating: an absurd page must clamp, not overflow into a
        // negative OFFSET.
        skip: page.saturating_sub(1).saturating_mul(limit),
        limit,
        sort_column,
        sort_desc,
    }
}

impl ListOptions {
    /// Append ` ORDER BY .. LIMIT .. OFFSET ..` to `qb`.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" ORDER BY ")
            .push(self.sort_column)
            .push(if self.sort_desc { " DESC" } else { " ASC" })
            .push(" LIMIT ")
            .push_bind(self.limit)
            .push(" OFFSET ")
            .push_bind(self.skip);
    }
}
