//! Keyword router from free-text queries to grouping dimensions.

use crate::models::GroupingDimension;

/// One entry of the routing decision list.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    /// Lowercase phrases, any of which selects `dimension`.
    pub triggers: &'static [&'static str],
    /// Dimension chosen when a trigger matches.
    pub dimension: GroupingDimension,
}

impl Route {
    /// Returns the first trigger contained in an already-lowercased query.
    fn matched_trigger(&self, query: &str) -> Option<&'static str> {
        self.triggers.iter().copied().find(|t| query.contains(t))
    }
}

/// Routing rules, evaluated in order; the first match wins.
///
/// A query naming several dimensions ("by branch and region") resolves to the
/// earliest rule here, not to the most specific phrase. Keep the order stable.
pub const ROUTES: [Route; 6] = [
    Route {
        triggers: &["branch"],
        dimension: GroupingDimension::BranchName,
    },
    Route {
        triggers: &["account type", "personal vs business"],
        dimension: GroupingDimension::AccountType,
    },
    Route {
        triggers: &["customer segment"],
        dimension: GroupingDimension::CustomerSegment,
    },
    Route {
        triggers: &["city"],
        dimension: GroupingDimension::City,
    },
    Route {
        triggers: &["region"],
        dimension: GroupingDimension::Region,
    },
    Route {
        triggers: &["date"],
        dimension: GroupingDimension::Date,
    },
];

/// Pick the grouping dimension for a query, or `None` when no trigger matches.
#[allow(dead_code)] // The pipeline uses route_with_trigger for logging
pub fn route_query(query: &str) -> Option<GroupingDimension> {
    route_with_trigger(query).map(|(dimension, _)| dimension)
}

/// Like [`route_query`], also returning the phrase that decided the route.
pub fn route_with_trigger(query: &str) -> Option<(GroupingDimension, &'static str)> {
    let query = query.to_lowercase();

    ROUTES.iter().find_map(|route| {
        route
            .matched_trigger(&query)
            .map(|trigger| (route.dimension, trigger))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_trigger_routes() {
        assert_eq!(
            route_query("Top branches in Lahore"),
            Some(GroupingDimension::BranchName)
        );
        assert_eq!(
            route_query("Compare by account type"),
            Some(GroupingDimension::AccountType)
        );
        assert_eq!(
            route_query("Personal vs Business deposits"),
            Some(GroupingDimension::AccountType)
        );
        assert_eq!(
            route_query("deposits per customer segment"),
            Some(GroupingDimension::CustomerSegment)
        );
        assert_eq!(route_query("Which city saves most?"), Some(GroupingDimension::City));
        assert_eq!(
            route_query("Show total deposits by region in June"),
            Some(GroupingDimension::Region)
        );
        assert_eq!(route_query("deposits by date"), Some(GroupingDimension::Date));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(route_query("BRANCH totals"), Some(GroupingDimension::BranchName));
        assert_eq!(route_query("By ReGiOn"), Some(GroupingDimension::Region));
    }

    #[test]
    fn test_first_rule_wins_over_later_triggers() {
        assert_eq!(
            route_query("deposits by branch and region"),
            Some(GroupingDimension::BranchName)
        );
        assert_eq!(
            route_query("region and city breakdown"),
            Some(GroupingDimension::City)
        );
        // "date" appears before "customer segment" in the text but ranks lower.
        assert_eq!(
            route_query("date wise customer segment deposits"),
            Some(GroupingDimension::CustomerSegment)
        );
    }

    #[test]
    fn test_branch_always_wins() {
        for query in [
            "branch by city",
            "city by branch",
            "account type per branch",
            "date, region, branch",
        ] {
            assert_eq!(route_query(query), Some(GroupingDimension::BranchName), "{}", query);
        }
    }

    #[test]
    fn test_unmatched_query_routes_to_none() {
        assert_eq!(route_query("What were total deposits?"), None);
        assert_eq!(route_query(""), None);
        // Partial phrases do not match.
        assert_eq!(route_query("account balances by type"), None);
    }

    #[test]
    fn test_substring_matching_is_literal() {
        // "updated" contains "date".
        assert_eq!(route_query("show updated totals"), Some(GroupingDimension::Date));
    }

    #[test]
    fn test_route_with_trigger_reports_phrase() {
        assert_eq!(
            route_with_trigger("personal vs business split"),
            Some((GroupingDimension::AccountType, "personal vs business"))
        );
    }

    #[test]
    fn test_routes_cover_every_dimension_once() {
        let dimensions: Vec<_> = ROUTES.iter().map(|r| r.dimension).collect();
        assert_eq!(dimensions, GroupingDimension::ALL.to_vec());
    }
}
