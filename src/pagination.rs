/// Shared listing/pagination types for the admin console list
/// endpoints
use serde::{Deserialize, Serialize};

/// Common query parameters for paginated listings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<SortOrder>,
    pub sort_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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
}

impl ListQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    pub fn order(&self) -> SortOrder {
        self.sort_by.unwrap_or(SortOrder::Desc)
    }

    /// Sort column, restricted to a caller-supplied whitelist; sort
    /// fields are interpolated into SQL and must never come from the
    /// client unchecked
    pub fn sort_column<'a>(&self, allowed: &[&'a str], default: &'a str) -> &'a str {
        match &self.sort_field {
            Some(field) => allowed
                .iter()
                .find(|&&candidate| candidate == field.as_str())
                .copied()
                .unwrap_or(default),
            None => default,
        }
    }
}

/// Paginated response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };

        Self {
            data,
            total,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<i64>, limit: Option<i64>) -> ListQuery {
        ListQuery {
            search: None,
            role: None,
            page,
            limit,
            sort_by: None,
            sort_field: None,
        }
    }

    #[test]
    fn test_defaults_and_bounds() {
        let q = query(None, None);
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 10);
        assert_eq!(q.offset(), 0);

        let q = query(Some(0), Some(1000));
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 100);
    }

    #[test]
    fn test_sort_column_whitelist() {
        let mut q = query(None, None);
        q.sort_field = Some("email".to_string());
        assert_eq!(q.sort_column(&["created_at", "email"], "created_at"), "email");

        q.sort_field = Some("password_hash; DROP TABLE users".to_string());
        assert_eq!(
            q.sort_column(&["created_at", "email"], "created_at"),
            "created_at"
        );
    }

    #[test]
    fn test_envelope_math() {
        let page: Paginated<i32> = Paginated::new(vec![1, 2, 3], 23, 2, 10);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(page.has_previous_page);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, 1, 10);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_previous_page);
    }
}
