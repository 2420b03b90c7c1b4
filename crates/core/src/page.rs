//! Pagination parameters and results.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size when a caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Ordering on the creation timestamp.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl core::str::FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(DomainError::validation(format!(
                "sort must be one of: asc, desc (got '{other}')"
            ))),
        }
    }
}

/// Page request: 0-based page index, page size and sort direction.
///
/// Deserialization goes through [`PageRequest::new`], so the size bound holds
/// for every instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPageRequest")]
pub struct PageRequest {
    page: u32,
    size: u32,
    sort: SortDirection,
}

impl PageRequest {
    pub fn new(page: u32, size: u32, sort: SortDirection) -> Result<Self, DomainError> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(DomainError::validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, size, sort })
    }

    pub fn first(size: u32) -> Result<Self, DomainError> {
        Self::new(0, size, SortDirection::default())
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort(&self) -> SortDirection {
        self.sort
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

#[derive(Deserialize)]
struct RawPageRequest {
    #[serde(default)]
    page: u32,
    #[serde(default = "default_page_size")]
    size: u32,
    #[serde(default)]
    sort: SortDirection,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = DomainError;

    fn try_from(raw: RawPageRequest) -> Result<Self, Self::Error> {
        Self::new(raw.page, raw.size, raw.sort)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: SortDirection::default(),
        }
    }
}

/// One page of results plus the total number of matching records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page(),
            size: request.size(),
            total,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_oversized_pages() {
        assert!(PageRequest::new(0, 0, SortDirection::Desc).is_err());
        assert!(PageRequest::new(0, MAX_PAGE_SIZE + 1, SortDirection::Desc).is_err());
        assert!(PageRequest::new(3, MAX_PAGE_SIZE, SortDirection::Asc).is_ok());
    }

    #[test]
    fn offset_is_page_times_size() {
        let req = PageRequest::new(3, 25, SortDirection::Asc).unwrap();
        assert_eq!(req.offset(), 75);
    }

    #[test]
    fn total_pages_rounds_up() {
        let req = PageRequest::first(10).unwrap();
        let page: Page<u8> = Page::new(vec![], req, 21);
        assert_eq!(page.total_pages(), 3);

        let empty: Page<u8> = Page::new(vec![], req, 0);
        assert_eq!(empty.total_pages(), 0);
    }

    #[test]
    fn deserialization_enforces_the_size_bound() {
        let ok: PageRequest = serde_json::from_str(r#"{"page": 2, "size": 50, "sort": "asc"}"#).unwrap();
        assert_eq!(ok, PageRequest::new(2, 50, SortDirection::Asc).unwrap());

        let defaults: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, PageRequest::default());

        assert!(serde_json::from_str::<PageRequest>(r#"{"size": 0}"#).is_err());
        assert!(serde_json::from_str::<PageRequest>(r#"{"size": 101}"#).is_err());
    }

    #[test]
    fn sort_direction_parses_case_insensitively() {
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
