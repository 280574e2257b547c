/// Unit tests for wire-format serialization and error mapping.
use chrono::Utc;
use rust_funnel_api::errors::AppError;
use rust_funnel_api::models::{CallStatus, CreateLeadDto, GstStatus, User, UserRole};

#[cfg(test)]
mod serde_tests {
    use super::*;

    #[test]
    fn test_enums_serialize_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&CallStatus::NotConnected).unwrap(),
            "\"NOT_CONNECTED\""
        );
        assert_eq!(
            serde_json::to_string(&GstStatus::Applied).unwrap(),
            "\"APPLIED\""
        );
        let parsed: CallStatus = serde_json::from_str("\"WRONG\"").unwrap();
        assert_eq!(parsed, CallStatus::Wrong);
    }

    #[test]
    fn test_lead_dto_accepts_camel_case_and_legacy_flag() {
        let dto: CreateLeadDto = serde_json::from_str(
            r#"{
                "mobile": "+911111111111",
                "sourceCode": "SRC1",
                "callStatus": "CONNECTED",
                "gstCustomer": true
            }"#,
        )
        .unwrap();
        assert_eq!(dto.mobile, "+911111111111");
        assert_eq!(dto.source_code.as_deref(), Some("SRC1"));
        assert_eq!(dto.call_status, Some(CallStatus::Connected));
        assert_eq!(dto.gst_customer, Some(true));
        assert_eq!(dto.gst_status, None);
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            mobile: "+919999999999".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            role: UserRole::NonAdmin,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("passwordHash"));
        assert!(json.contains("\"role\":\"NON_ADMIN\""));
        assert!(json.contains("\"isActive\":true"));
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_status_code_mapping() {
        let cases = [
            (AppError::NotFound("x".into()), 404),
            (AppError::BadRequest("x".into()), 400),
            (AppError::Conflict("x".into()), 409),
            (AppError::Unauthorized("x".into()), 401),
            (AppError::InternalError("x".into()), 500),
        ];
        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status().as_u16(), expected);
        }
    }

    #[test]
    fn test_display_includes_message() {
        let err = AppError::Conflict("Source code already exists".to_string());
        assert_eq!(err.to_string(), "Conflict: Source code already exists");
    }

    #[test]
    fn test_unique_violation_helper_ignores_other_errors() {
        use rust_funnel_api::errors::{conflict_on_unique, is_unique_violation};
        // Only SQLSTATE 23505 maps to Conflict; everything else passes
        // through as a database error.
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        let mapped = conflict_on_unique(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(mapped, AppError::DatabaseError(_)));
    }
}

#[cfg(test)]
mod snapshot_tests {
    use rust_funnel_api::leads::LeadSnapshot;
    use rust_funnel_api::models::CallStatus;

    #[test]
    fn test_empty_snapshot_is_a_no_op() {
        assert!(LeadSnapshot::default().is_empty());
        let snapshot = LeadSnapshot {
            call_status: Some(CallStatus::Connected),
            ..Default::default()
        };
        assert!(!snapshot.is_empty());
    }
}
