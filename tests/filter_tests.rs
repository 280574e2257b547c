/// Unit tests for the query-parameter filter builder and pagination parsing.
use rust_funnel_api::filters::{
    build_filter, list_options, FilterValue, LEAD_FILTER_ALLOWLIST, SALE_FILTER_ALLOWLIST,
};
use std::collections::HashMap;
use uuid::Uuid;

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod build_filter_tests {
    use super::*;

    #[test]
    fn test_substring_filter_with_pagination_keys() {
        // Pagination keys ride along in the same query string and must not
        // leak into the predicate.
        let q = query(&[("name", "jan"), ("page", "1"), ("limit", "10")]);
        let filter = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(filter.clauses().len(), 1);
        assert_eq!(
            filter.clauses()[0],
            ("name", FilterValue::Substring("jan".to_string()))
        );
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let q = query(&[("secretField", "x"), ("city", "pune")]);
        let filter = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(filter.clauses().len(), 1);
        assert_eq!(filter.clauses()[0].0, "city");
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let q = query(&[("name", ""), ("state", "MH")]);
        let filter = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(filter.clauses().len(), 1);
        assert_eq!(filter.clauses()[0].0, "state");
    }

    #[test]
    fn test_substring_values_are_regex_escaped() {
        let q = query(&[("name", "a.b*c")]);
        let filter = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(
            filter.clauses()[0].1,
            FilterValue::Substring(regex::escape("a.b*c"))
        );
    }

    #[test]
    fn test_malformed_uuid_is_dropped() {
        let q = query(&[("influencerId", "not-a-uuid"), ("name", "jan")]);
        let filter = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(filter.clauses().len(), 1);
        assert_eq!(filter.clauses()[0].0, "name");
    }

    #[test]
    fn test_valid_uuid_parses() {
        let id = Uuid::new_v4();
        let q = query(&[("influencerId", &id.to_string())]);
        let filter = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(filter.clauses()[0].1, FilterValue::Id(id));
    }

    #[test]
    fn test_boolean_is_strict() {
        let q = query(&[("converted", "true")]);
        let filter = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(filter.clauses()[0].1, FilterValue::Bool(true));

        // "TRUE", "1", "yes" are all malformed, not truthy
        for bad in ["TRUE", "1", "yes", "on"] {
            let q = query(&[("converted", bad)]);
            assert!(build_filter(&q, LEAD_FILTER_ALLOWLIST).is_empty());
        }
    }

    #[test]
    fn test_number_filter() {
        let q = query(&[("rating", "3")]);
        let filter = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(filter.clauses()[0].1, FilterValue::Number(3.0));

        let q = query(&[("rating", "three")]);
        assert!(build_filter(&q, LEAD_FILTER_ALLOWLIST).is_empty());

        let q = query(&[("rating", "NaN")]);
        assert!(build_filter(&q, LEAD_FILTER_ALLOWLIST).is_empty());
    }

    #[test]
    fn test_exact_match_fields_are_not_escaped() {
        let q = query(&[("callStatus", "NOT_CONNECTED")]);
        let filter = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(
            filter.clauses()[0].1,
            FilterValue::Exact("NOT_CONNECTED".to_string())
        );
    }

    #[test]
    fn test_deterministic_and_allowlist_ordered() {
        let q = query(&[("city", "pune"), ("name", "jan"), ("state", "MH")]);
        let a = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        let b = build_filter(&q, LEAD_FILTER_ALLOWLIST);
        assert_eq!(a, b);
        // Clause order follows the allow-list, not map iteration order
        let columns: Vec<&str> = a.clauses().iter().map(|(c, _)| *c).collect();
        assert_eq!(columns, vec!["name", "state", "city"]);
    }

    #[test]
    fn test_sale_allowlist_is_independent() {
        let q = query(&[("name", "jan"), ("sourceCode", "SRC1")]);
        let filter = build_filter(&q, SALE_FILTER_ALLOWLIST);
        assert_eq!(filter.clauses().len(), 1);
        assert_eq!(filter.clauses()[0].0, "source_code");
    }
}

#[cfg(test)]
mod list_options_tests {
    use super::*;

    const SORTABLE: &[(&str, &str)] = &[("createdAt", "created_at"), ("name", "name")];

    #[test]
    fn test_defaults() {
        let opts = list_options(&HashMap::new(), SORTABLE, "created_at");
        assert_eq!(opts.skip, 0);
        assert_eq!(opts.limit, 50);
        assert_eq!(opts.sort_column, "created_at");
        assert!(opts.sort_desc);
    }

    #[test]
    fn test_page_and_limit() {
        let q = query(&[("page", "3"), ("limit", "10")]);
        let opts = list_options(&q, SORTABLE, "created_at");
        assert_eq!(opts.skip, 20);
        assert_eq!(opts.limit, 10);
    }

    #[test]
    fn test_limit_is_capped() {
        let q = query(&[("limit", "100000")]);
        let opts = list_options(&q, SORTABLE, "created_at");
        assert_eq!(opts.limit, 200);
    }

    #[test]
    fn test_huge_page_number_stays_in_bounds() {
        // page * limit near i64::MAX must clamp rather than overflow
        let q = query(&[("page", "9223372036854775807"), ("limit", "200")]);
        let opts = list_options(&q, SORTABLE, "created_at");
        assert!(opts.skip >= 0);
        assert_eq!(opts.limit, 200);

        let q = query(&[("page", &i64::MAX.to_string()), ("limit", "2")]);
        let opts = list_options(&q, SORTABLE, "created_at");
        assert!(opts.skip >= 0);
    }

    #[test]
    fn test_malformed_page_falls_back() {
        let q = query(&[("page", "zero"), ("limit", "-5")]);
        let opts = list_options(&q, SORTABLE, "created_at");
        assert_eq!(opts.skip, 0);
        assert_eq!(opts.limit, 50);
    }

    #[test]
    fn test_sort_by_allowlisted_column() {
        let q = query(&[("sortBy", "name"), ("sortOrder", "asc")]);
        let opts = list_options(&q, SORTABLE, "created_at");
        assert_eq!(opts.sort_column, "name");
        assert!(!opts.sort_desc);
    }

    #[test]
    fn test_unknown_sort_key_falls_back() {
        let q = query(&[("sortBy", "passwordHash")]);
        let opts = list_options(&q, SORTABLE, "created_at");
        assert_eq!(opts.sort_column, "created_at");
    }
}
