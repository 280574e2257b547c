/// Unit tests for the dashboard aggregation folds.
///
/// All folds are pure over plain rows, so these run without a database.
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_funnel_api::dashboard::{
    fold_admin_summary, fold_attribution_groups, fold_executive_stats, fold_executive_summary,
    fold_sales_figures, parse_date_param, round2,
};
use rust_funnel_api::models::{
    effective_gst_status, CallStatus, GstStatus, LeadInteraction, Sale,
};
use uuid::Uuid;

fn interaction(
    lead_id: Uuid,
    executive: Uuid,
    call_status: CallStatus,
    rating: i32,
) -> LeadInteraction {
    LeadInteraction {
        id: Uuid::new_v4(),
        lead_id,
        sales_executive_id: executive,
        call_status,
        rating,
        notes: "called".to_string(),
        follow_up_date: None,
        converted: false,
        gst_status: GstStatus::No,
        created_at: Utc::now(),
    }
}

fn sale(executive: Uuid, amount: f64, gst_status: GstStatus, sale_date: DateTime<Utc>) -> Sale {
    Sale {
        id: Uuid::new_v4(),
        lead_id: Uuid::new_v4(),
        sales_executive_id: executive,
        influencer_id: Uuid::new_v4(),
        source_code: "SRC1".to_string(),
        sale_amount: amount,
        gst_status,
        gst_customer: None,
        sale_date,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod gst_tests {
    use super::*;

    #[test]
    fn test_no_sales_yields_zero_percentage_not_nan() {
        let (total, revenue, pct) = fold_sales_figures(&[]);
        assert_eq!(total, 0);
        assert_eq!(revenue, 0.0);
        assert_eq!(pct, 0.0);
    }

    #[test]
    fn test_one_of_three_gst_sales_is_33_33() {
        let exec = Uuid::new_v4();
        let now = Utc::now();
        let sales = vec![
            sale(exec, 100.0, GstStatus::Yes, now),
            sale(exec, 200.0, GstStatus::No, now),
            sale(exec, 300.0, GstStatus::No, now),
        ];
        let (total, revenue, pct) = fold_sales_figures(&sales);
        assert_eq!(total, 3);
        assert_eq!(revenue, 600.0);
        assert_eq!(pct, 33.33);
    }

    #[test]
    fn test_applied_counts_as_gst_customer() {
        let exec = Uuid::new_v4();
        let now = Utc::now();
        let sales = vec![
            sale(exec, 100.0, GstStatus::Applied, now),
            sale(exec, 100.0, GstStatus::Yes, now),
        ];
        let (_, _, pct) = fold_sales_figures(&sales);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn test_legacy_boolean_counts_as_gst_customer() {
        let exec = Uuid::new_v4();
        let mut legacy = sale(exec, 100.0, GstStatus::No, Utc::now());
        legacy.gst_customer = Some(true);
        assert!(legacy.is_gst_customer());
        let (_, _, pct) = fold_sales_figures(&[legacy]);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn test_effective_gst_status_enum_wins_over_legacy() {
        assert_eq!(
            effective_gst_status(Some(GstStatus::Applied), Some(false)),
            Some(GstStatus::Applied)
        );
        assert_eq!(
            effective_gst_status(None, Some(true)),
            Some(GstStatus::Yes)
        );
        assert_eq!(effective_gst_status(None, Some(false)), Some(GstStatus::No));
        assert_eq!(effective_gst_status(None, None), None);
    }
}

#[cfg(test)]
mod admin_summary_tests {
    use super::*;

    #[test]
    fn test_sentiment_buckets_and_pending() {
        let exec = Uuid::new_v4();
        let lead_a = Uuid::new_v4();
        let lead_b = Uuid::new_v4();
        let lead_c = Uuid::new_v4(); // never touched
        let interactions = vec![
            interaction(lead_a, exec, CallStatus::Connected, 4), // interested
            interaction(lead_a, exec, CallStatus::Connected, 2), // non-interested
            interaction(lead_b, exec, CallStatus::Wrong, 5),     // wrong, rating ignored
        ];
        let summary = fold_admin_summary(&[lead_a, lead_b, lead_c], &interactions, &[]);
        assert_eq!(summary.total_leads, 3);
        assert_eq!(summary.interested, 1);
        assert_eq!(summary.non_interested, 1);
        assert_eq!(summary.wrong_numbers, 1);
        assert_eq!(summary.pending_leads, 1);
        assert_eq!(summary.total_sales, 0);
        assert_eq!(summary.gst_customers_percentage, 0.0);
    }

    #[test]
    fn test_buckets_count_interactions_not_leads() {
        // Two interested calls against the same lead count twice.
        let exec = Uuid::new_v4();
        let lead = Uuid::new_v4();
        let interactions = vec![
            interaction(lead, exec, CallStatus::Connected, 5),
            interaction(lead, exec, CallStatus::Connected, 3),
        ];
        let summary = fold_admin_summary(&[lead], &interactions, &[]);
        assert_eq!(summary.interested, 2);
        assert_eq!(summary.pending_leads, 0);
    }

    #[test]
    fn test_wrong_calls_excluded_from_both_buckets() {
        let exec = Uuid::new_v4();
        let lead = Uuid::new_v4();
        let interactions = vec![
            interaction(lead, exec, CallStatus::Wrong, 1),
            interaction(lead, exec, CallStatus::Wrong, 4),
        ];
        let summary = fold_admin_summary(&[lead], &interactions, &[]);
        assert_eq!(summary.interested, 0);
        assert_eq!(summary.non_interested, 0);
        assert_eq!(summary.wrong_numbers, 2);
    }
}

#[cfg(test)]
mod executive_stats_tests {
    use super::*;

    #[test]
    fn test_grouping_and_conversion_percentage() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let now = Utc::now();
        let mut with_follow_up = interaction(Uuid::new_v4(), alice, CallStatus::Connected, 4);
        with_follow_up.follow_up_date = Some(now + Duration::days(2));
        let interactions = vec![
            with_follow_up,
            interaction(Uuid::new_v4(), alice, CallStatus::NotConnected, 1),
            interaction(Uuid::new_v4(), alice, CallStatus::Connected, 3),
            interaction(Uuid::new_v4(), bob, CallStatus::Connected, 5),
        ];
        let sales = vec![sale(alice, 1000.0, GstStatus::Yes, now)];

        let stats = fold_executive_stats(&interactions, &sales);
        assert_eq!(stats.len(), 2);

        let a = stats
            .iter()
            .find(|s| s.sales_executive_id == alice)
            .unwrap();
        assert_eq!(a.total_leads, 3);
        assert_eq!(a.follow_ups, 1);
        assert_eq!(a.sales, 1);
        assert_eq!(a.conversion_percentage, 33.33);

        let b = stats.iter().find(|s| s.sales_executive_id == bob).unwrap();
        assert_eq!(b.total_leads, 1);
        assert_eq!(b.sales, 0);
        assert_eq!(b.conversion_percentage, 0.0);
    }

    #[test]
    fn test_sales_only_executive_has_zero_conversion() {
        // An executive with sales but no interactions in window divides by
        // zero leads; the percentage must be 0, not NaN or infinity.
        let exec = Uuid::new_v4();
        let sales = vec![sale(exec, 500.0, GstStatus::No, Utc::now())];
        let stats = fold_executive_stats(&[], &sales);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].sales, 1);
        assert_eq!(stats[0].total_leads, 0);
        assert_eq!(stats[0].conversion_percentage, 0.0);
    }
}

#[cfg(test)]
mod attribution_tests {
    use super::*;

    #[test]
    fn test_grouped_by_influencer_and_code() {
        let exec = Uuid::new_v4();
        let influencer = Uuid::new_v4();
        let now = Utc::now();
        let mut s1 = sale(exec, 100.0, GstStatus::No, now);
        let mut s2 = sale(exec, 200.0, GstStatus::No, now);
        let mut s3 = sale(exec, 400.0, GstStatus::No, now);
        s1.influencer_id = influencer;
        s2.influencer_id = influencer;
        s3.influencer_id = influencer;
        s1.source_code = "SRC1".to_string();
        s2.source_code = "SRC1".to_string();
        s3.source_code = "SRC2".to_string();

        let groups = fold_attribution_groups(&[s1, s2, s3]);
        assert_eq!(groups.len(), 2);

        let src1 = groups.iter().find(|g| g.source_code == "SRC1").unwrap();
        assert_eq!(src1.total_sales, 2);
        assert_eq!(src1.total_revenue, 300.0);
        assert_eq!(src1.influencer_name, None);

        let src2 = groups.iter().find(|g| g.source_code == "SRC2").unwrap();
        assert_eq!(src2.total_sales, 1);
        assert_eq!(src2.total_revenue, 400.0);
    }

    #[test]
    fn test_same_code_different_influencers_stay_separate() {
        let exec = Uuid::new_v4();
        let now = Utc::now();
        let s1 = sale(exec, 100.0, GstStatus::No, now);
        let s2 = sale(exec, 200.0, GstStatus::No, now);
        // sale() gives each a fresh influencer_id but the same code
        let groups = fold_attribution_groups(&[s1, s2]);
        assert_eq!(groups.len(), 2);
    }
}

#[cfg(test)]
mod executive_summary_tests {
    use super::*;

    #[test]
    fn test_distinct_leads_and_current_month_split() {
        let exec = Uuid::new_v4();
        let lead = Uuid::new_v4();
        let month_start = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let interactions = vec![
            interaction(lead, exec, CallStatus::Connected, 4),
            interaction(lead, exec, CallStatus::Connected, 5),
        ];
        let sales = vec![
            sale(exec, 1000.0, GstStatus::Yes, month_start + Duration::days(5)),
            sale(exec, 500.0, GstStatus::No, month_start - Duration::days(10)),
        ];

        let summary = fold_executive_summary(&interactions, &sales, 7, month_start);
        // Two interactions against one lead: one distinct lead, two
        // interested interactions. Both readings are intentional.
        assert_eq!(summary.total_leads, 1);
        assert_eq!(summary.interested, 2);
        assert_eq!(summary.pending_leads, 7);
        assert_eq!(summary.total_sales, 2);
        assert_eq!(summary.total_revenue, 1500.0);
        assert_eq!(summary.gst_customers_percentage, 50.0);
        assert_eq!(summary.current_month_sales, 1);
        assert_eq!(summary.current_month_revenue, 1000.0);
    }
}

#[cfg(test)]
mod date_param_tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(66.666666), 66.67);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(100.0), 100.0);
    }

    #[test]
    fn test_parse_bare_date() {
        let parsed = parse_date_param("2026-01-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc3339() {
        let parsed = parse_date_param("2026-01-01T12:30:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        assert!(parse_date_param("yesterday").is_err());
        assert!(parse_date_param("2026-13-45").is_err());
        assert!(parse_date_param("").is_err());
    }
}
