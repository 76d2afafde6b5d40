//! List-query primitives shared by every paginated endpoint.
//!
//! Raw query parameters arrive as untrusted strings; everything here turns
//! them into a bounded, validated specification before any SQL is built.

use serde::Serialize;

use crate::error::FieldError;

/// Hard ceiling on page size, regardless of what the endpoint defaults to.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size for most list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Sort direction. Defaults to descending when the caller says nothing,
/// so newest-first listings fall out naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Parse `sortOrder` from the query string. Unknown values are rejected,
    /// not defaulted — a typo should not silently flip the listing order.
    pub fn parse(raw: Option<&str>) -> Result<Self, FieldError> {
        match raw {
            None => Ok(SortOrder::Desc),
            Some("asc") => Ok(SortOrder::Asc),
            Some("desc") => Ok(SortOrder::Desc),
            Some(other) => Err(FieldError::new(
                "sortOrder",
                format!("must be 'asc' or 'desc', got '{}'", other),
            )),
        }
    }
}

/// Normalized page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
}

impl PageQuery {
    /// Coerce raw `page`/`pageSize` strings into a valid selection.
    ///
    /// Missing values fall back to defaults; numeric values are floored at
    /// page 1 and clamped to [1, MAX_PAGE_SIZE]; non-numeric values are
    /// rejected with field-level detail rather than guessed at.
    pub fn normalize(
        page: Option<&str>,
        page_size: Option<&str>,
        default_page_size: u32,
    ) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();

        let page = match page {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) => n.max(1) as u32,
                Err(_) => {
                    errors.push(FieldError::new(
                        "page",
                        format!("must be an integer, got '{}'", raw),
                    ));
                    1
                }
            },
        };

        let page_size = match page_size {
            None => default_page_size,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) => n.clamp(1, MAX_PAGE_SIZE as i64) as u32,
                Err(_) => {
                    errors.push(FieldError::new(
                        "pageSize",
                        format!("must be an integer, got '{}'", raw),
                    ));
                    default_page_size
                }
            },
        };

        if errors.is_empty() {
            Ok(Self { page, page_size })
        } else {
            Err(errors)
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> PageEnvelope<T> {
    pub fn new(items: Vec<T>, total: u64, query: PageQuery) -> Self {
        let total_pages = (total as f64 / query.page_size as f64).ceil() as u64;
        Self {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
            total_pages,
        }
    }
}

/// Escape LIKE/ILIKE metacharacters in a user-supplied search term so the
/// term always matches literally. The corresponding SQL must use
/// `ESCAPE '\'`.
pub fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_apply() {
        let q = PageQuery::normalize(None, None, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, 20);
        assert_eq!(q.offset(), 0);
        assert_eq!(q.limit(), 20);
    }

    #[test]
    fn page_is_floored_at_one() {
        let q = PageQuery::normalize(Some("0"), None, 20).unwrap();
        assert_eq!(q.page, 1);
        let q = PageQuery::normalize(Some("-5"), None, 20).unwrap();
        assert_eq!(q.page, 1);
    }

    #[test]
    fn page_size_is_clamped_to_max() {
        let q = PageQuery::normalize(None, Some("500"), 20).unwrap();
        assert_eq!(q.page_size, MAX_PAGE_SIZE);
        let q = PageQuery::normalize(None, Some("0"), 20).unwrap();
        assert_eq!(q.page_size, 1);
    }

    #[test]
    fn non_numeric_page_is_rejected_with_field_detail() {
        let err = PageQuery::normalize(Some("abc"), None, 20).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].field, "page");
    }

    #[test]
    fn non_numeric_page_size_is_rejected() {
        let err = PageQuery::normalize(None, Some("lots"), 20).unwrap_err();
        assert_eq!(err[0].field, "pageSize");
    }

    #[test]
    fn sort_order_defaults_to_desc_and_rejects_unknowns() {
        assert_eq!(SortOrder::parse(None).unwrap(), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("asc")).unwrap(), SortOrder::Asc);
        assert!(SortOrder::parse(Some("sideways")).is_err());
    }

    #[test]
    fn envelope_math_matches_contract() {
        // items.len() == min(pageSize, max(0, total - (page-1)*pageSize))
        for (total, page, page_size) in [(45u64, 2u32, 20u32), (45, 3, 20), (45, 4, 20), (0, 1, 20)] {
            let q = PageQuery {
                page,
                page_size,
            };
            let start = (page as u64 - 1) * page_size as u64;
            let expected_len = page_size.min(total.saturating_sub(start) as u32) as usize;
            let items: Vec<u64> = (0..expected_len as u64).collect();
            let envelope = PageEnvelope::new(items, total, q);
            assert_eq!(envelope.items.len(), expected_len);
            let expected_pages = (total + page_size as u64 - 1) / page_size as u64;
            assert_eq!(envelope.total_pages, expected_pages);
        }
    }

    #[test]
    fn total_pages_is_zero_only_for_empty_result() {
        let q = PageQuery {
            page: 1,
            page_size: 20,
        };
        let empty: PageEnvelope<u64> = PageEnvelope::new(vec![], 0, q);
        assert_eq!(empty.total_pages, 0);
        let one: PageEnvelope<u64> = PageEnvelope::new(vec![1], 1, q);
        assert_eq!(one.total_pages, 1);
    }

    #[test]
    fn like_escaping_neutralizes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
