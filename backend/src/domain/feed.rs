//! Feed query parameters and result items.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::Post;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;
const SEARCH_MAX: usize = 100;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ordering applied to `created_at` (and `id` as a tie-break).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedQueryError {
    #[error("limit must be between 1 and {max}")]
    Limit { max: u32 },
    #[error("offset must not be negative")]
    Offset,
    #[error("sort must be either asc or desc")]
    Sort,
    #[error("search must be at most {max} characters")]
    Search { max: usize },
}

/// Raw, unvalidated feed parameters as received from a client.
#[derive(Debug, Clone, Default)]
pub struct FeedParams<'a> {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<&'a str>,
    pub search: Option<&'a str>,
    pub since: Option<&'a str>,
    pub until: Option<&'a str>,
}

/// Validated feed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub limit: u32,
    pub offset: u32,
    pub sort: SortOrder,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort: SortOrder::Desc,
            search: None,
            since: None,
            until: None,
        }
    }
}

/// Timestamps that fail to parse are dropped rather than rejected.
fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok())
        .map(|naive| naive.and_utc())
}

impl FeedQuery {
    /// Validate client parameters, filling in defaults.
    ///
    /// # Examples
    /// ```
    /// use murmur::domain::{FeedParams, FeedQuery, SortOrder};
    ///
    /// let query = FeedQuery::parse(&FeedParams {
    ///     limit: Some(5),
    ///     sort: Some("asc"),
    ///     ..FeedParams::default()
    /// })
    /// .unwrap();
    /// assert_eq!(query.limit, 5);
    /// assert_eq!(query.sort, SortOrder::Asc);
    /// ```
    pub fn parse(params: &FeedParams<'_>) -> Result<Self, FeedQueryError> {
        let limit = match params.limit {
            None => DEFAULT_LIMIT,
            Some(raw) => u32::try_from(raw)
                .ok()
                .filter(|value| (1..=MAX_LIMIT).contains(value))
                .ok_or(FeedQueryError::Limit { max: MAX_LIMIT })?,
        };
        let offset = match params.offset {
            None => 0,
            Some(raw) => u32::try_from(raw).map_err(|_| FeedQueryError::Offset)?,
        };
        let sort = match params.sort.map(str::trim) {
            None | Some("") => SortOrder::Desc,
            Some(value) if value.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            Some(value) if value.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            Some(_) => return Err(FeedQueryError::Sort),
        };
        let search = params
            .search
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);
        if search
            .as_deref()
            .is_some_and(|value| value.chars().count() > SEARCH_MAX)
        {
            return Err(FeedQueryError::Search { max: SEARCH_MAX });
        }
        Ok(Self {
            limit,
            offset,
            sort,
            search,
            since: parse_timestamp(params.since),
            until: parse_timestamp(params.until),
        })
    }
}

/// A post in a user's feed with author and comment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FeedItem {
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub comment_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_params_use_defaults() {
        let query = FeedQuery::parse(&FeedParams::default()).expect("defaults");
        assert_eq!(query, FeedQuery::default());
    }

    #[rstest]
    #[case(FeedParams { limit: Some(0), ..FeedParams::default() }, FeedQueryError::Limit { max: 100 })]
    #[case(FeedParams { limit: Some(101), ..FeedParams::default() }, FeedQueryError::Limit { max: 100 })]
    #[case(FeedParams { offset: Some(-1), ..FeedParams::default() }, FeedQueryError::Offset)]
    #[case(FeedParams { sort: Some("sideways"), ..FeedParams::default() }, FeedQueryError::Sort)]
    fn rejects_out_of_range(#[case] params: FeedParams<'static>, #[case] expected: FeedQueryError) {
        assert_eq!(FeedQuery::parse(&params), Err(expected));
    }

    #[test]
    fn rejects_long_search() {
        let search = "s".repeat(101);
        let params = FeedParams {
            search: Some(&search),
            ..FeedParams::default()
        };
        assert_eq!(
            FeedQuery::parse(&params),
            Err(FeedQueryError::Search { max: 100 })
        );
    }

    #[test]
    fn parses_time_bounds_and_ignores_garbage() {
        let params = FeedParams {
            since: Some("2024-01-02 03:04:05"),
            until: Some("yesterday"),
            ..FeedParams::default()
        };
        let query = FeedQuery::parse(&params).expect("valid");
        assert_eq!(
            query.since.map(|ts| ts.to_rfc3339()),
            Some("2024-01-02T03:04:05+00:00".to_owned())
        );
        assert!(query.until.is_none());
    }

    #[test]
    fn blank_search_is_dropped() {
        let params = FeedParams {
            search: Some("   "),
            ..FeedParams::default()
        };
        assert!(FeedQuery::parse(&params).expect("valid").search.is_none());
    }
}
