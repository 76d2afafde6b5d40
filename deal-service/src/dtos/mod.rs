//! Shared list-endpoint parameter handling.
//!
//! Every list route takes the same raw query-string shape; each resource
//! supplies its own sort-field allow-list and optional status filter. All
//! parameter problems are accumulated and returned together as field-level
//! detail, so a caller fixing a request sees every issue at once.

use serde::Deserialize;
use uuid::Uuid;

use service_core::error::{AppError, FieldError};
use service_core::utils::pagination::{PageQuery, SortOrder};

use crate::models::{
    AuditSortField, ContactSortField, DocumentSortField, SpacSortField, TargetSortField,
};

/// A sortable column allow-list for one resource.
pub trait SortKey: Copy {
    fn parse_key(s: &str) -> Option<Self>;
    fn column(&self) -> &'static str;
}

macro_rules! impl_sort_key {
    ($ty:ty) => {
        impl SortKey for $ty {
            fn parse_key(s: &str) -> Option<Self> {
                Self::parse(s)
            }
            fn column(&self) -> &'static str {
                self.as_column()
            }
        }
    };
}

impl_sort_key!(SpacSortField);
impl_sort_key!(TargetSortField);
impl_sort_key!(DocumentSortField);
impl_sort_key!(ContactSortField);
impl_sort_key!(AuditSortField);

/// Raw, untrusted list parameters exactly as they appear on the query
/// string. Everything is a string until validated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListParams {
    pub organization_id: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub stage: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// A validated, bounded list specification ready to hand to the store.
#[derive(Debug)]
pub struct ListSpec<S> {
    pub search: Option<String>,
    pub sort_by: S,
    pub sort_order: SortOrder,
    pub page: PageQuery,
}

impl RawListParams {
    /// Validate the tenant scope and the common list parameters.
    ///
    /// Returns the accumulated field errors rather than stopping at the
    /// first; `parse_filter` handles resource-specific status/stage values.
    pub fn parse_spec<S: SortKey>(
        &self,
        default_sort: S,
        default_page_size: u32,
    ) -> Result<(Uuid, ListSpec<S>), AppError> {
        let mut errors = Vec::new();

        let organization_id = self.parse_organization_id(&mut errors);

        let sort_by = match self.sort_by.as_deref() {
            None => default_sort,
            Some(raw) => match S::parse_key(raw) {
                Some(field) => field,
                None => {
                    errors.push(FieldError::new(
                        "sortBy",
                        format!("'{}' is not a sortable field", raw),
                    ));
                    default_sort
                }
            },
        };

        let sort_order = match SortOrder::parse(self.sort_order.as_deref()) {
            Ok(order) => order,
            Err(e) => {
                errors.push(e);
                SortOrder::Desc
            }
        };

        let page = match PageQuery::normalize(
            self.page.as_deref(),
            self.page_size.as_deref(),
            default_page_size,
        ) {
            Ok(page) => page,
            Err(mut page_errors) => {
                errors.append(&mut page_errors);
                PageQuery {
                    page: 1,
                    page_size: default_page_size,
                }
            }
        };

        if !errors.is_empty() {
            return Err(AppError::InvalidQuery(errors));
        }

        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok((
            organization_id.unwrap_or_default(),
            ListSpec {
                search,
                sort_by,
                sort_order,
                page,
            },
        ))
    }

    fn parse_organization_id(&self, errors: &mut Vec<FieldError>) -> Option<Uuid> {
        match self.organization_id.as_deref() {
            None => {
                errors.push(FieldError::new("organizationId", "is required"));
                None
            }
            Some(raw) => match raw.parse::<Uuid>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push(FieldError::new(
                        "organizationId",
                        format!("'{}' is not a valid UUID", raw),
                    ));
                    None
                }
            },
        }
    }
}

/// Validate an optional enum-valued filter such as `status` or `stage`.
pub fn parse_filter<T>(
    raw: &Option<String>,
    field: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, AppError> {
    match raw.as_deref() {
        None => Ok(None),
        Some(value) => parse(value).map(Some).ok_or_else(|| {
            AppError::InvalidQuery(vec![FieldError::new(
                field,
                format!("'{}' is not a recognized value", value),
            )])
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RawListParams {
        let mut p = RawListParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "organizationId" => p.organization_id = v,
                "search" => p.search = v,
                "status" => p.status = v,
                "page" => p.page = v,
                "pageSize" => p.page_size = v,
                "sortBy" => p.sort_by = v,
                "sortOrder" => p.sort_order = v,
                other => panic!("unknown param {}", other),
            }
        }
        p
    }

    const ORG: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn defaults_fill_in_when_only_scope_is_given() {
        let (org, spec) = params(&[("organizationId", ORG)])
            .parse_spec(SpacSortField::CreatedAt, 20)
            .unwrap();
        assert_eq!(org.to_string(), ORG);
        assert_eq!(spec.page.page, 1);
        assert_eq!(spec.page.page_size, 20);
        assert_eq!(spec.sort_order, SortOrder::Desc);
        assert!(spec.search.is_none());
    }

    #[test]
    fn unknown_sort_by_is_an_error_not_a_fallback() {
        let err = params(&[("organizationId", ORG), ("sortBy", "trustAmount")])
            .parse_spec(SpacSortField::CreatedAt, 20)
            .unwrap_err();
        match err {
            AppError::InvalidQuery(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "sortBy");
            }
            other => panic!("expected InvalidQuery, got {:?}", other),
        }
    }

    #[test]
    fn multiple_problems_are_reported_together() {
        let err = params(&[("page", "x"), ("sortOrder", "up")])
            .parse_spec(SpacSortField::CreatedAt, 20)
            .unwrap_err();
        match err {
            AppError::InvalidQuery(fields) => {
                let named: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
                assert!(named.contains(&"organizationId"));
                assert!(named.contains(&"page"));
                assert!(named.contains(&"sortOrder"));
            }
            other => panic!("expected InvalidQuery, got {:?}", other),
        }
    }

    #[test]
    fn oversized_page_size_is_clamped_not_rejected() {
        let (_, spec) = params(&[("organizationId", ORG), ("pageSize", "500")])
            .parse_spec(SpacSortField::CreatedAt, 20)
            .unwrap();
        assert_eq!(spec.page.page_size, 100);
    }

    #[test]
    fn blank_search_is_treated_as_absent() {
        let (_, spec) = params(&[("organizationId", ORG), ("search", "   ")])
            .parse_spec(SpacSortField::CreatedAt, 20)
            .unwrap();
        assert!(spec.search.is_none());
    }

    #[test]
    fn status_filter_rejects_unknown_values() {
        use crate::models::SpacStatus;
        let raw = Some("ipo_pending".to_string());
        assert!(parse_filter(&raw, "status", SpacStatus::parse).is_err());
        let raw = Some("searching".to_string());
        assert_eq!(
            parse_filter(&raw, "status", SpacStatus::parse).unwrap(),
            Some(SpacStatus::Searching)
        );
    }
}
