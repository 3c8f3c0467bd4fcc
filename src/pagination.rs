//! Page normalization and the paging descriptor returned by list endpoints.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw `?page=&size=` query. Values stay textual so a non-numeric value
/// becomes a validation error instead of a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
}

/// Normalized page request; `page >= 1`, `1 <= size <= MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paging {
    pub page: i64,
    pub size: i64,
    pub total_rows: i64,
    pub total_pages: i64,
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: if page < 1 { 1 } else { page },
            size: if size < 1 {
                DEFAULT_PAGE_SIZE
            } else {
                size.min(MAX_PAGE_SIZE)
            },
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn paging(&self, total_rows: i64) -> Paging {
        paginate(self.page, self.size, total_rows)
    }
}

impl TryFrom<PageQuery> for PageRequest {
    type Error = AppError;

    fn try_from(q: PageQuery) -> Result<Self, Self::Error> {
        let page = parse_number("page", q.page.as_deref())?.unwrap_or(1);
        let size = parse_number("size", q.size.as_deref())?.unwrap_or(DEFAULT_PAGE_SIZE);
        Ok(PageRequest::new(page, size))
    }
}

fn parse_number(name: &str, raw: Option<&str>) -> Result<Option<i64>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::validation(format!("Invalid {name} value"))),
    }
}

/// Builds the paging descriptor, normalizing `page` and `size` first.
pub fn paginate(page: i64, size: i64, total_rows: i64) -> Paging {
    let req = PageRequest::new(page, size);
    let total_rows = total_rows.max(0);
    let total_pages = if total_rows == 0 {
        0
    } else {
        (total_rows - 1) / req.size + 1
    };
    Paging {
        page: req.page,
        size: req.size,
        total_rows,
        total_pages,
    }
}
