/// Unit tests for store entry guards and write-fragment rendering that run
/// before (or without) any database round trip.
use rust_funnel_api::errors::AppError;
use rust_funnel_api::influencers::issue_checks;
use rust_funnel_api::interactions::InteractionStore;
use rust_funnel_api::leads::{LeadSnapshot, LeadStore};
use rust_funnel_api::models::{CallStatus, CreateInteractionDto, GstStatus};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[cfg(test)]
mod rating_validation_tests {
    use super::*;

    fn dto(rating: i32) -> CreateInteractionDto {
        CreateInteractionDto {
            lead_id: Uuid::new_v4(),
            call_status: CallStatus::Connected,
            rating,
            notes: "called".to_string(),
            follow_up_date: None,
            converted: None,
            gst_status: None,
            gst_customer: None,
        }
    }

    #[tokio::test]
    async fn test_out_of_range_rating_rejected_before_any_write() {
        // A lazy pool never connects; the guard must fire before the store
        // touches the database at all.
        let pool = PgPool::connect_lazy("postgres://localhost/unreachable").unwrap();
        let leads = LeadStore::new(pool.clone());
        let interactions = InteractionStore::new(pool);

        for rating in [0, 6, -1, 100, i32::MIN, i32::MAX] {
            let err = interactions
                .record(&leads, dto(rating), Uuid::new_v4())
                .await
                .unwrap_err();
            assert!(
                matches!(err, AppError::BadRequest(_)),
                "rating {} must be rejected as bad request",
                rating
            );
        }
    }
}

#[cfg(test)]
mod issuance_gate_tests {
    use super::*;

    #[test]
    fn test_missing_influencer_outranks_duplicate_code() {
        // A duplicate code aimed at an unknown influencer reports the
        // missing influencer, not the duplicate.
        assert!(matches!(
            issue_checks(false, true),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            issue_checks(false, false),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            issue_checks(true, true),
            Err(AppError::Conflict(_))
        ));
        assert!(issue_checks(true, false).is_ok());
    }
}

#[cfg(test)]
mod snapshot_sql_tests {
    use super::*;

    fn rendered(snapshot: &LeadSnapshot) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE leads SET updated_at = now()");
        snapshot.push_set(&mut qb);
        qb.into_sql()
    }

    #[test]
    fn test_only_present_fields_emit_set_fragments() {
        let sql = rendered(&LeadSnapshot {
            call_status: Some(CallStatus::Connected),
            rating: Some(4),
            notes: Some("spoke to owner".to_string()),
            ..Default::default()
        });
        assert!(sql.contains("call_status = "));
        assert!(sql.contains("rating = "));
        assert!(sql.contains("notes = "));
        assert!(!sql.contains("follow_up_date"));
        assert!(!sql.contains("converted"));
        assert!(!sql.contains("gst_status"));
    }

    #[test]
    fn test_optional_fields_emit_only_when_given() {
        let sql = rendered(&LeadSnapshot {
            converted: Some(true),
            gst_status: Some(GstStatus::Yes),
            ..Default::default()
        });
        assert!(sql.contains("converted = "));
        assert!(sql.contains("gst_status = "));
        assert!(!sql.contains("rating"));
        assert!(!sql.contains("call_status"));
    }

    #[test]
    fn test_empty_snapshot_renders_nothing() {
        let sql = rendered(&LeadSnapshot::default());
        assert_eq!(sql, "UPDATE leads SET updated_at = now()");
    }
}
