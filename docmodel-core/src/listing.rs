//! Pageable, searchable, sortable and date-filtered listing requests.
//!
//! A [`ListQuery`] describes one page of a listing screen. [`ListQuery::to_query`]
//! turns it into a plain [`Query`] without touching the store:
//!
//! - **sort**: one key, when both `sort.by` and `sort.type` are non-empty;
//! - **search**: an OR of one unanchored, case-sensitive regex per field, built from the
//!   escaped and normalized search value;
//! - **date filter**: an AND of `>= start` and/or `<= end` on one non-empty field;
//! - **pagination**: `skip` becomes the offset and `take` the limit, unvalidated.
//!
//! The search and date clauses are combined with AND; when neither applies the query
//! has no filter and matches every document.
//!
//! `ListQuery` deserializes from request JSON with the same defaults:
//!
//! ```ignore
//! let list: ListQuery = serde_json::from_str(r#"{
//!     "take": 20,
//!     "search": { "fields": ["name", "email"], "value": "jo" },
//!     "sort": { "by": "createdDate", "type": "desc" }
//! }"#)?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    query::{Expr, Filter, Query, Sort, SortDirection},
    text::{TextNormalizer, search_pattern},
};

/// Page size used when `take` is not given.
pub const DEFAULT_TAKE: i64 = 10;

fn default_take() -> i64 {
    DEFAULT_TAKE
}

/// One field name or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchFields {
    One(String),
    Many(Vec<String>),
}

impl SearchFields {
    pub fn as_slice(&self) -> &[String] {
        match self {
            SearchFields::One(field) => std::slice::from_ref(field),
            SearchFields::Many(fields) => fields,
        }
    }
}

impl From<&str> for SearchFields {
    fn from(field: &str) -> Self {
        SearchFields::One(field.to_string())
    }
}

impl From<String> for SearchFields {
    fn from(field: String) -> Self {
        SearchFields::One(field)
    }
}

impl<S: Into<String>> From<Vec<S>> for SearchFields {
    fn from(fields: Vec<S>) -> Self {
        SearchFields::Many(fields.into_iter().map(Into::into).collect())
    }
}

/// Free-text search over one or more fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    #[serde(default)]
    pub fields: Option<SearchFields>,
    /// Raw user input; escaped before use.
    #[serde(default)]
    pub value: Option<String>,
}

impl Search {
    pub fn new(fields: impl Into<SearchFields>, value: impl Into<String>) -> Self {
        Self {
            fields: Some(fields.into()),
            value: Some(value.into()),
        }
    }
}

/// Requested order of a listing, parsed from the raw `type` string.
///
/// Only `"desc"` selects descending order; `"asc"` and any other value select the
/// opposite, so an unexpected value such as `"DESC"` still yields a sort instead of
/// rejecting the request. An empty value counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
    Other(String),
}

impl SortOrder {
    pub fn is_desc(&self) -> bool {
        matches!(self, SortOrder::Desc)
    }

    fn is_present(&self) -> bool {
        !matches!(self, SortOrder::Other(value) if value.is_empty())
    }
}

impl From<String> for SortOrder {
    fn from(value: String) -> Self {
        match value.as_str() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => SortOrder::Other(value),
        }
    }
}

impl From<SortOrder> for String {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => "asc".to_string(),
            SortOrder::Desc => "desc".to_string(),
            SortOrder::Other(value) => value,
        }
    }
}

/// How a [`SortOrder`] maps onto the store's sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// `desc` sorts descending, anything else ascending.
    #[default]
    Natural,
    /// `desc` sorts ascending and anything else descending, for callers written
    /// against the inverted mapping of earlier releases.
    Legacy,
}

impl SortMode {
    pub fn direction(&self, order: &SortOrder) -> SortDirection {
        match (self, order.is_desc()) {
            (SortMode::Natural, false) | (SortMode::Legacy, true) => SortDirection::Asc,
            (SortMode::Natural, true) | (SortMode::Legacy, false) => SortDirection::Desc,
        }
    }
}

/// Single-key sort. Applied only when both the field and the order are given.
///
/// A request without any `sort` object defaults to `desc` with no field, so it stays
/// unsorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSort {
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default, rename = "type")]
    pub order: Option<SortOrder>,
}

impl Default for ListSort {
    fn default() -> Self {
        Self { by: None, order: Some(SortOrder::Desc) }
    }
}

impl ListSort {
    pub fn new(by: impl Into<String>, order: SortOrder) -> Self {
        Self { by: Some(by.into()), order: Some(order) }
    }
}

/// Inclusive date range on one field. Either bound may be open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl DateFilter {
    pub fn new(field: impl Into<String>, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { field: Some(field.into()), start, end }
    }
}

/// A listing request. Every field has a default, see the module docs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Page size. Defaults to 10.
    #[serde(default = "default_take")]
    pub take: i64,
    /// Number of documents to skip. Defaults to 0.
    #[serde(default)]
    pub skip: i64,
    #[serde(default)]
    pub search: Search,
    #[serde(default)]
    pub sort: ListSort,
    #[serde(default, rename = "dateFilter", alias = "date_filter")]
    pub date_filter: DateFilter,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            take: DEFAULT_TAKE,
            skip: 0,
            search: Search::default(),
            sort: ListSort::default(),
            date_filter: DateFilter::default(),
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = take;
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = skip;
        self
    }

    pub fn search(mut self, search: Search) -> Self {
        self.search = search;
        self
    }

    pub fn sort(mut self, sort: ListSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn date_filter(mut self, date_filter: DateFilter) -> Self {
        self.date_filter = date_filter;
        self
    }

    /// Builds the store query for this request.
    pub fn to_query(&self, normalizer: &dyn TextNormalizer, mode: SortMode) -> Query {
        let clauses = [self.search_clause(normalizer), self.date_clause()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        let filter = match clauses.len() {
            0 => None,
            1 => clauses.into_iter().next(),
            _ => Some(Expr::And(clauses)),
        };

        Query {
            filter,
            limit: Some(self.take),
            offset: Some(self.skip),
            sort: self.sort_clause(mode),
        }
    }

    fn sort_clause(&self, mode: SortMode) -> Option<Sort> {
        let field = self.sort.by.as_deref().filter(|by| !by.is_empty())?;
        let order = self.sort.order.as_ref().filter(|order| order.is_present())?;

        Some(Sort {
            field: field.to_string(),
            direction: mode.direction(order),
        })
    }

    fn search_clause(&self, normalizer: &dyn TextNormalizer) -> Option<Expr> {
        let value = self.search.value.as_deref().filter(|value| !value.is_empty())?;
        let fields = self
            .search
            .fields
            .as_ref()
            .map(SearchFields::as_slice)
            .filter(|fields| !fields.is_empty())?;
        let pattern = search_pattern(value, normalizer);

        Some(Filter::or(
            fields
                .iter()
                .map(|field| Filter::regex(field.as_str(), pattern.as_str())),
        ))
    }

    fn date_clause(&self) -> Option<Expr> {
        let field = self.date_filter.field.as_deref().filter(|field| !field.is_empty())?;
        let mut bounds = Vec::with_capacity(2);

        if let Some(start) = self.date_filter.start {
            bounds.push(Filter::gte(field, bson::DateTime::from_chrono(start)));
        }
        if let Some(end) = self.date_filter.end {
            bounds.push(Filter::lte(field, bson::DateTime::from_chrono(end)));
        }

        (!bounds.is_empty()).then(|| Expr::And(bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::FieldOp,
        text::{PlainText, TurkishSearchable},
    };
    use bson::Bson;
    use chrono::TimeZone;

    fn build(list: &ListQuery) -> Query {
        list.to_query(&PlainText, SortMode::Natural)
    }

    #[test]
    fn defaults_match_everything_in_pages_of_ten() {
        let query = build(&ListQuery::default());

        assert_eq!(query.filter, None);
        assert_eq!(query.sort, None);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(0));
    }

    #[test]
    fn deserializes_with_defaults() {
        let list: ListQuery = serde_json::from_str(
            r#"{ "search": { "fields": "name", "value": "jo" }, "sort": { "by": "age" } }"#,
        )
        .unwrap();

        assert_eq!(list.take, 10);
        assert_eq!(list.skip, 0);
        assert_eq!(list.search, Search::new("name", "jo"));
        assert_eq!(list.sort, ListSort { by: Some("age".to_string()), order: None });
        assert_eq!(build(&list).sort, None);
    }

    #[test]
    fn sort_needs_both_field_and_order() {
        let missing_order: ListQuery = serde_json::from_str(r#"{ "sort": { "by": "age" } }"#).unwrap();
        let null_order: ListQuery = serde_json::from_str(r#"{ "sort": { "by": "age", "type": null } }"#).unwrap();
        let empty_order: ListQuery = serde_json::from_str(r#"{ "sort": { "by": "age", "type": "" } }"#).unwrap();
        let empty_field = ListQuery::new().sort(ListSort::new("", SortOrder::Asc));

        for list in [missing_order, null_order, empty_order, empty_field] {
            assert_eq!(build(&list).sort, None, "{list:?}");
        }
    }

    #[test]
    fn unknown_sort_orders_are_not_desc() {
        let list: ListQuery = serde_json::from_str(r#"{ "sort": { "by": "age", "type": "DESC" } }"#).unwrap();

        assert_eq!(list.sort.order, Some(SortOrder::Other("DESC".to_string())));
        assert_eq!(build(&list).sort.unwrap().direction, SortDirection::Asc);
        assert_eq!(
            list.to_query(&PlainText, SortMode::Legacy).sort.unwrap().direction,
            SortDirection::Desc
        );
    }

    #[test]
    fn deserializes_field_lists_and_dates() {
        let list: ListQuery = serde_json::from_str(
            r#"{
                "take": 5,
                "search": { "fields": ["name", "email"], "value": "x" },
                "dateFilter": { "field": "createdDate", "start": "2024-01-01T00:00:00Z" }
            }"#,
        )
        .unwrap();

        assert_eq!(list.search.fields, Some(SearchFields::from(vec!["name", "email"])));
        assert_eq!(list.date_filter.start, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(list.date_filter.end, None);
    }

    #[test]
    fn sort_modes() {
        let list = ListQuery::new().sort(ListSort::new("name", SortOrder::Desc));

        let natural = list.to_query(&PlainText, SortMode::Natural).sort.unwrap();
        let legacy = list.to_query(&PlainText, SortMode::Legacy).sort.unwrap();

        assert_eq!(natural.field, "name");
        assert_eq!(natural.direction, SortDirection::Desc);
        assert_eq!(legacy.direction, SortDirection::Asc);
        assert_eq!(SortMode::Legacy.direction(&SortOrder::Asc), SortDirection::Desc);
        assert_eq!(SortMode::Natural.direction(&SortOrder::Asc), SortDirection::Asc);
    }

    #[test]
    fn search_builds_one_regex_per_field() {
        let list = ListQuery::new().search(Search::new(vec!["name", "email"], "a.b"));

        assert_eq!(
            build(&list).filter,
            Some(Expr::Or(vec![
                Filter::regex("name", r".*a\.b.*"),
                Filter::regex("email", r".*a\.b.*"),
            ]))
        );
    }

    #[test]
    fn search_normalizes_after_escaping() {
        let list = ListQuery::new().search(Search::new("name", "ç?"));
        let filter = list
            .to_query(&TurkishSearchable, SortMode::Natural)
            .filter
            .unwrap();

        assert_eq!(filter, Expr::Or(vec![Filter::regex("name", r".*[cç]\?.*")]));
    }

    #[test]
    fn incomplete_search_is_ignored() {
        let empty_value = ListQuery::new().search(Search::new("name", ""));
        let no_fields = ListQuery::new().search(Search { fields: None, value: Some("x".into()) });
        let empty_list = ListQuery::new().search(Search::new(Vec::<String>::new(), "x"));

        assert_eq!(build(&empty_value).filter, None);
        assert_eq!(build(&no_fields).filter, None);
        assert_eq!(build(&empty_list).filter, None);
    }

    #[test]
    fn date_filter_bounds_are_inclusive_and_optional() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let both = build(&ListQuery::new().date_filter(DateFilter::new("createdDate", Some(start), Some(end))));
        let only_end = build(&ListQuery::new().date_filter(DateFilter::new("createdDate", None, Some(end))));
        let neither = build(&ListQuery::new().date_filter(DateFilter::new("createdDate", None, None)));

        assert_eq!(
            both.filter,
            Some(Expr::And(vec![
                Filter::gte("createdDate", bson::DateTime::from_chrono(start)),
                Filter::lte("createdDate", bson::DateTime::from_chrono(end)),
            ]))
        );
        assert_eq!(
            only_end.filter,
            Some(Expr::And(vec![Filter::lte("createdDate", bson::DateTime::from_chrono(end))]))
        );
        assert_eq!(neither.filter, None);
    }

    #[test]
    fn empty_date_field_is_ignored() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let list = ListQuery::new().date_filter(DateFilter::new("", Some(start), None));

        assert_eq!(build(&list).filter, None);
    }

    #[test]
    fn search_and_dates_are_combined_with_and() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let list = ListQuery::new()
            .search(Search::new("name", "jo"))
            .date_filter(DateFilter::new("createdDate", Some(start), None));

        match build(&list).filter {
            Some(Expr::And(clauses)) => {
                assert_eq!(clauses.len(), 2);
                assert!(matches!(clauses[0], Expr::Or(_)));
                assert!(matches!(
                    &clauses[1],
                    Expr::And(bounds) if matches!(
                        &bounds[0],
                        Expr::Field { op: FieldOp::Gte, value: Bson::DateTime(_), .. }
                    )
                ));
            }
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn pagination_is_passed_through_unvalidated() {
        let query = build(&ListQuery::new().take(-3).skip(-1));

        assert_eq!(query.limit, Some(-3));
        assert_eq!(query.offset, Some(-1));
    }
}
