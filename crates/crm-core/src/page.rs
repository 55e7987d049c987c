//! # Pagination
//!
//! Paging and sort descriptors passed into every `find`/`search` call, and
//! the `Page<T>` they come back as.
//!
//! ```text
//! Pageable { page: 2, size: 20, sort: "name,desc" }
//!      │
//!      ▼
//! ORDER BY c.name DESC, c.id LIMIT 20 OFFSET 40
//! ```
//!
//! Sort properties are API names (`"name"`, `"createdAt"`), never raw SQL.
//! Each repository maps them to columns through a whitelist.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// =============================================================================
// Sort
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// SQL keyword for this direction.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A single sort instruction: API property plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sort {
    pub property: String,
    pub direction: Direction,
}

impl Sort {
    pub fn asc(property: impl Into<String>) -> Self {
        Sort {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Sort {
            property: property.into(),
            direction: Direction::Desc,
        }
    }
}

/// Parses `"name"`, `"name,asc"` or `"createdAt,desc"`.
impl FromStr for Sort {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim);
        let property = parts.next().unwrap_or_default();
        if property.is_empty() {
            return Err(CoreError::InvalidSort(s.to_string()));
        }

        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            Some(_) => return Err(CoreError::InvalidSort(s.to_string())),
        };

        if parts.next().is_some() {
            return Err(CoreError::InvalidSort(s.to_string()));
        }

        Ok(Sort {
            property: property.to_string(),
            direction,
        })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        write!(f, "{},{}", self.property, dir)
    }
}

// =============================================================================
// Pageable
// =============================================================================

/// Page request: zero-based page index, page size and optional sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Pageable {
    pub page: u32,
    pub size: u32,
    pub sort: Option<Sort>,
}

impl Default for Pageable {
    fn default() -> Self {
        Pageable {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }
}

impl Pageable {
    /// Creates a page request; size is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn of(page: u32, size: u32) -> Self {
        Pageable {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
            sort: None,
        }
    }

    /// Adds a sort instruction.
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Effective page size after clamping.
    pub fn limit(&self) -> i64 {
        i64::from(self.size.clamp(1, MAX_PAGE_SIZE))
    }

    /// Row offset of the first element of this page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * self.limit()
    }
}

// =============================================================================
// Page
// =============================================================================

/// One page of results plus the total row count for the filter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: i64) -> Self {
        Page {
            content,
            page: pageable.page,
            size: pageable.limit() as u32,
            total_elements,
        }
    }

    pub fn empty(pageable: &Pageable) -> Self {
        Page::new(Vec::new(), pageable, 0)
    }

    pub fn total_pages(&self) -> i64 {
        if self.size == 0 {
            return 0;
        }
        let size = i64::from(self.size);
        (self.total_elements + size - 1) / size
    }

    pub fn is_last(&self) -> bool {
        i64::from(self.page) + 1 >= self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        let sort: Sort = "name,desc".parse().unwrap();
        assert_eq!(sort, Sort::desc("name"));

        let sort: Sort = "createdAt".parse().unwrap();
        assert_eq!(sort, Sort::asc("createdAt"));

        assert!("".parse::<Sort>().is_err());
        assert!("name,sideways".parse::<Sort>().is_err());
        assert!("name,asc,extra".parse::<Sort>().is_err());
    }

    #[test]
    fn test_pageable_clamps_size() {
        assert_eq!(Pageable::of(0, 0).limit(), 1);
        assert_eq!(Pageable::of(0, 10_000).limit(), i64::from(MAX_PAGE_SIZE));
        assert_eq!(Pageable::of(3, 25).offset(), 75);
        assert_eq!(Pageable::default().limit(), i64::from(DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_page_math() {
        let pageable = Pageable::of(1, 10);
        let page = Page::new(vec![1, 2, 3], &pageable, 23);
        assert_eq!(page.total_pages(), 3);
        assert!(!page.is_last());

        let page = Page::new(vec![1], &Pageable::of(2, 10), 21);
        assert!(page.is_last());

        let mapped = page.map(|n| n * 2);
        assert_eq!(mapped.content, vec![2]);
        assert_eq!(mapped.total_elements, 21);
    }

    #[test]
    fn test_empty_page() {
        let page: Page<i32> = Page::empty(&Pageable::default());
        assert_eq!(page.total_pages(), 0);
        assert!(page.is_last());
    }
}
