//! Filter and pagination composition for lead listings.
//!
//! Raw query parameters are parsed into a [`LeadFilter`] and a
//! [`PageRequest`]; [`lead_condition`] turns the filter into an
//! owner-scoped SeaORM [`Condition`] shared by the paginated list and export.

use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::lead::{self, UnknownVariant};
use crate::models::{City, LeadStatus, PropertyType, Timeline};
use crate::validation::{FieldIssue, ValidationErrors};

/// Rows per interactive page.
pub const PAGE_SIZE: u64 = 10;

/// Upper bound on rows returned by an export.
pub const EXPORT_LIMIT: u64 = 10_000;

/// Largest page whose offset still fits a signed 64-bit SQL OFFSET.
pub const MAX_PAGE: u64 = i64::MAX as u64 / PAGE_SIZE + 1;

/// Query string accepted by the listing endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Case-insensitive match on name or email, substring match on phone
    pub search: Option<String>,
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub status: Option<String>,
    pub timeline: Option<String>,
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// `true` returns up to 10,000 rows without paging
    pub export: Option<String>,
}

/// Optional exact-match filters plus free-text search; all combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub search: Option<String>,
    pub city: Option<City>,
    pub property_type: Option<PropertyType>,
    pub status: Option<LeadStatus>,
    pub timeline: Option<Timeline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Paginated,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub mode: ListMode,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            mode: ListMode::Paginated,
        }
    }
}

impl PageRequest {
    pub fn export() -> Self {
        Self {
            page: 1,
            mode: ListMode::Export,
        }
    }

    pub fn limit(&self) -> u64 {
        match self.mode {
            ListMode::Paginated => PAGE_SIZE,
            ListMode::Export => EXPORT_LIMIT,
        }
    }

    /// Export ignores the page number and always starts at the first row.
    pub fn offset(&self) -> u64 {
        match self.mode {
            ListMode::Paginated => self.page.saturating_sub(1).saturating_mul(PAGE_SIZE),
            ListMode::Export => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: &PageRequest, total: u64) -> Self {
        let limit = request.limit();
        Self {
            page: request.page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

/// One page of results with its pagination metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl ListQuery {
    /// Whether the raw `export` flag requests an export listing.
    pub fn is_export(&self) -> bool {
        self.export.as_deref() == Some("true")
    }

    /// Parses the raw parameters. Empty values are treated as absent.
    pub fn parse(&self) -> Result<(LeadFilter, PageRequest), ValidationErrors> {
        let mut issues = Vec::new();

        let filter = LeadFilter {
            search: non_empty(&self.search).map(str::to_string),
            city: parse_enum(&self.city, "city", &mut issues),
            property_type: parse_enum(&self.property_type, "propertyType", &mut issues),
            status: parse_enum(&self.status, "status", &mut issues),
            timeline: parse_enum(&self.timeline, "timeline", &mut issues),
        };

        let page = match non_empty(&self.page) {
            None => 1,
            Some(raw) => match raw.parse::<u64>() {
                Ok(page) if (1..=MAX_PAGE).contains(&page) => page,
                _ => {
                    issues.push(FieldIssue::new("page", "Page must be a positive integer"));
                    1
                }
            },
        };

        let mode = if self.is_export() {
            ListMode::Export
        } else {
            ListMode::Paginated
        };

        if issues.is_empty() {
            Ok((filter, PageRequest { page, mode }))
        } else {
            Err(ValidationErrors::from(issues))
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_enum<T>(value: &Option<String>, path: &str, issues: &mut Vec<FieldIssue>) -> Option<T>
where
    T: std::str::FromStr<Err = UnknownVariant>,
{
    let raw = non_empty(value)?;
    match raw.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            issues.push(FieldIssue::new(path, err.to_string()));
            None
        }
    }
}

/// Builds the WHERE clause for a caller's leads.
///
/// Omitted filters contribute nothing; an empty `Condition::all()` renders
/// as an always-true predicate so the conjunction stays well formed.
pub fn lead_condition(owner_id: Uuid, filter: &LeadFilter) -> Condition {
    Condition::all()
        .add(lead::Column::OwnerId.eq(owner_id))
        .add_option(filter.city.map(|city| lead::Column::City.eq(city)))
        .add_option(
            filter
                .property_type
                .map(|property_type| lead::Column::PropertyType.eq(property_type)),
        )
        .add_option(filter.status.map(|status| lead::Column::Status.eq(status)))
        .add_option(
            filter
                .timeline
                .map(|timeline| lead::Column::Timeline.eq(timeline)),
        )
        .add_option(filter.search.as_deref().map(search_condition))
}

// Backslash would need backend-specific quoting inside the ESCAPE clause.
const LIKE_ESCAPE: char = '!';

fn search_condition(needle: &str) -> Condition {
    let pattern = format!("%{}%", escape_like(needle));

    Condition::any()
        .add(folded_like(lead::Column::FullName, &pattern))
        .add(
            Expr::col((lead::Entity, lead::Column::Phone))
                .like(LikeExpr::new(pattern.clone()).escape(LIKE_ESCAPE)),
        )
        .add(folded_like(lead::Column::Email, &pattern))
}

/// `LOWER(column) LIKE LOWER(pattern)`, folding both sides with the same
/// database function so non-ASCII text compares consistently.
fn folded_like(column: lead::Column, pattern: &str) -> SimpleExpr {
    Expr::cust_with_exprs(
        format!("$1 LIKE $2 ESCAPE '{LIKE_ESCAPE}'"),
        [
            Func::lower(Expr::col((lead::Entity, column))).into(),
            Func::lower(Expr::val(pattern)).into(),
        ],
    )
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    fn render(condition: Condition) -> String {
        lead::Entity::find()
            .filter(condition)
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn empty_query_defaults_to_first_page() {
        let (filter, page) = ListQuery::default().parse().unwrap();

        assert_eq!(filter, LeadFilter::default());
        assert_eq!(page, PageRequest::default());
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), PAGE_SIZE);
    }

    #[test]
    fn parses_filters_and_page() {
        let query = ListQuery {
            search: Some("  john ".into()),
            city: Some("MOHALI".into()),
            property_type: Some("VILLA".into()),
            status: Some("".into()),
            page: Some("3".into()),
            ..Default::default()
        };

        let (filter, page) = query.parse().unwrap();

        assert_eq!(filter.search.as_deref(), Some("john"));
        assert_eq!(filter.city, Some(City::Mohali));
        assert_eq!(filter.property_type, Some(PropertyType::Villa));
        assert_eq!(filter.status, None);
        assert_eq!(page.page, 3);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn rejects_unknown_enum_and_bad_page() {
        let query = ListQuery {
            city: Some("DELHI".into()),
            page: Some("0".into()),
            ..Default::default()
        };

        let errors = query.parse().unwrap_err();
        let paths: Vec<_> = errors.issues().iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["city", "page"]);
    }

    #[test]
    fn rejects_page_whose_offset_overflows() {
        for raw in [u64::MAX.to_string(), (MAX_PAGE + 1).to_string()] {
            let query = ListQuery {
                page: Some(raw),
                ..Default::default()
            };
            let errors = query.parse().unwrap_err();
            let issue = errors.for_path("page").next().unwrap();
            assert_eq!(issue.message, "Page must be a positive integer");
        }

        let (_, page) = ListQuery {
            page: Some(MAX_PAGE.to_string()),
            ..Default::default()
        }
        .parse()
        .unwrap();
        assert_eq!(page.offset(), i64::MAX as u64 / PAGE_SIZE * PAGE_SIZE);
    }

    #[test]
    fn export_flag_switches_limit_and_keeps_page() {
        let query = ListQuery {
            page: Some("4".into()),
            export: Some("true".into()),
            ..Default::default()
        };

        assert!(query.is_export());
        let (_, page) = query.parse().unwrap();
        assert_eq!(page.mode, ListMode::Export);
        assert_eq!(page.limit(), EXPORT_LIMIT);
        assert_eq!(page.offset(), 0);
        assert_eq!(Pagination::new(&page, 3).page, 4);

        let (_, page) = ListQuery {
            export: Some("yes".into()),
            ..Default::default()
        }
        .parse()
        .unwrap();
        assert_eq!(page.mode, ListMode::Paginated);
    }

    #[test]
    fn total_pages_rounds_up() {
        let request = PageRequest::default();
        assert_eq!(Pagination::new(&request, 0).total_pages, 0);
        assert_eq!(Pagination::new(&request, 10).total_pages, 1);
        assert_eq!(Pagination::new(&request, 25).total_pages, 3);
    }

    #[test]
    fn condition_is_always_owner_scoped() {
        let owner = Uuid::new_v4();
        let sql = render(lead_condition(owner, &LeadFilter::default()));

        assert!(sql.contains(&format!("\"owner_id\" = '{}'", owner)));
        assert!(!sql.contains("LIKE"));
    }

    #[test]
    fn filters_are_combined_with_and() {
        let filter = LeadFilter {
            city: Some(City::Zirakpur),
            timeline: Some(Timeline::Exploring),
            ..Default::default()
        };
        let sql = render(lead_condition(Uuid::new_v4(), &filter));

        assert!(sql.contains("\"city\" = 'ZIRAKPUR'"));
        assert!(sql.contains("AND \"leads\".\"timeline\" = 'EXPLORING'"));
    }

    #[test]
    fn search_matches_any_of_name_phone_email() {
        let filter = LeadFilter {
            search: Some("John".into()),
            ..Default::default()
        };
        let sql = render(lead_condition(Uuid::new_v4(), &filter));

        assert!(sql.contains("LOWER(\"leads\".\"full_name\") LIKE LOWER('%John%') ESCAPE '!'"));
        assert!(sql.contains("\"leads\".\"phone\" LIKE '%John%' ESCAPE '!'"));
        assert!(sql.contains("LOWER(\"leads\".\"email\") LIKE LOWER('%John%') ESCAPE '!'"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_a!b"), "50!%!_a!!b");
    }
}
