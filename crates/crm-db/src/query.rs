//! # Dynamic Query Building
//!
//! Every `find`/`search` in the repositories builds its SQL at runtime from
//! a filter struct where any field may be unset. This module holds the
//! pieces they share.
//!
//! ```text
//! CustomerFilter { name: Some("silva"), state: Some("SP"), city: None, .. }
//!      │
//!      ▼  Conditions (first predicate → WHERE, the rest → AND)
//! SELECT c.* FROM customer c
//!  WHERE c.name LIKE ? ESCAPE '\'          ← "%silva%"
//!    AND c.state = ?                       ← "SP"
//!      │
//!      ▼  SortSpec + Pageable
//!  ORDER BY c.name ASC, c.id LIMIT ? OFFSET ?
//!      │
//!      ▼  fetch_page: COUNT(*) with the same predicates, then the page
//! Page<Customer> { content, page, size, total_elements }
//! ```
//!
//! Values are always bound, never interpolated. Column names and sort
//! columns only ever come from `&'static str` constants in the repositories.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Encode, FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use tracing::{debug, warn};

use crm_core::{Direction, Page, Pageable, Sort};

use crate::error::DbResult;

// =============================================================================
// Matching
// =============================================================================

/// How string filter fields are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// `column = ?` (used by `find`).
    Exact,
    /// `column LIKE %value%` (used by `search`).
    Like,
}

/// Wraps `value` as a contains-pattern, escaping LIKE wildcards.
///
/// ```
/// use crm_db::query::like_pattern;
///
/// assert_eq!(like_pattern("silva"), "%silva%");
/// assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
/// ```
pub fn like_pattern(value: &str) -> String {
    let value = value.trim();
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Trimmed value, or `None` for unset and blank strings.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Conditions
// =============================================================================

/// Accumulates optional predicates onto a [`QueryBuilder`].
///
/// Unset filter values add nothing. The first predicate that is added emits
/// `WHERE`, later ones emit `AND`.
pub struct Conditions<'q, 'args> {
    qb: &'q mut QueryBuilder<'args, Sqlite>,
    started: bool,
}

impl<'q, 'args> Conditions<'q, 'args> {
    pub fn new(qb: &'q mut QueryBuilder<'args, Sqlite>) -> Self {
        Conditions { qb, started: false }
    }

    /// For base SQL that already carries a `WHERE`.
    pub fn continuing(qb: &'q mut QueryBuilder<'args, Sqlite>) -> Self {
        Conditions { qb, started: true }
    }

    fn next(&mut self) -> &mut QueryBuilder<'args, Sqlite> {
        self.qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
        self.qb
    }

    /// Whether any predicate has been added.
    pub fn has_any(&self) -> bool {
        self.started
    }

    /// `column = ?` when `value` is set.
    pub fn eq<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'args + Encode<'args, Sqlite> + Type<Sqlite> + Send,
    {
        if let Some(value) = value {
            self.next().push(column).push(" = ").push_bind(value);
        }
        self
    }

    /// String predicate: equality or LIKE depending on `mode`. Blank strings
    /// are treated as unset.
    pub fn text(&mut self, column: &str, value: Option<&str>, mode: MatchMode) -> &mut Self {
        let Some(value) = present(value) else {
            return self;
        };
        match mode {
            MatchMode::Exact => {
                self.next()
                    .push(column)
                    .push(" = ")
                    .push_bind(value.to_string());
            }
            MatchMode::Like => {
                self.next()
                    .push(column)
                    .push(" LIKE ")
                    .push_bind(like_pattern(value))
                    .push(" ESCAPE '\\'");
            }
        }
        self
    }

    /// Always a LIKE match, whatever the caller's mode.
    pub fn like(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        self.text(column, value, MatchMode::Like)
    }

    /// `date(column) >= ?`
    pub fn on_or_after(&mut self, column: &str, date: Option<NaiveDate>) -> &mut Self {
        if let Some(date) = date {
            self.next()
                .push("date(")
                .push(column)
                .push(") >= ")
                .push_bind(date);
        }
        self
    }

    /// `date(column) <= ?`
    pub fn on_or_before(&mut self, column: &str, date: Option<NaiveDate>) -> &mut Self {
        if let Some(date) = date {
            self.next()
                .push("date(")
                .push(column)
                .push(") <= ")
                .push_bind(date);
        }
        self
    }

    /// A fixed predicate with no bound values.
    pub fn raw(&mut self, sql: &str) -> &mut Self {
        self.next().push(sql);
        self
    }

    /// `<before> ? <after>` when `value` is set. Used for subquery predicates
    /// such as `c.id IN (SELECT customer_id FROM user_customer WHERE user_id = ?)`.
    pub fn bound<T>(&mut self, before: &str, value: Option<T>, after: &str) -> &mut Self
    where
        T: 'args + Encode<'args, Sqlite> + Type<Sqlite> + Send,
    {
        if let Some(value) = value {
            self.next().push(before).push_bind(value).push(after);
        }
        self
    }
}

// =============================================================================
// Sorting
// =============================================================================

/// Whitelist of sortable properties for one query.
#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    /// API property name → SQL column.
    pub columns: &'static [(&'static str, &'static str)],
    /// Used when the caller gives no sort or an unknown property.
    pub default: (&'static str, Direction),
    /// Appended after the sort column so pages are stable.
    pub tie_breaker: &'static str,
}

impl SortSpec {
    /// Resolves the requested sort to a whitelisted column.
    pub fn resolve(&self, sort: Option<&Sort>) -> (&'static str, Direction) {
        let Some(sort) = sort else {
            return self.default;
        };
        match self.columns.iter().find(|(property, _)| *property == sort.property) {
            Some((_, column)) => (*column, sort.direction),
            None => {
                warn!(property = %sort.property, "Ignoring unknown sort property");
                self.default
            }
        }
    }
}

/// Appends `ORDER BY … LIMIT ? OFFSET ?`.
pub fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, pageable: &Pageable, sorting: &SortSpec) {
    let (column, direction) = sorting.resolve(pageable.sort.as_ref());
    qb.push(" ORDER BY ")
        .push(column)
        .push(" ")
        .push(direction.as_sql());
    if column != sorting.tie_breaker {
        qb.push(", ").push(sorting.tie_breaker);
    }
    qb.push(" LIMIT ")
        .push_bind(pageable.limit())
        .push(" OFFSET ")
        .push_bind(pageable.offset());
}

// =============================================================================
// Paged fetch
// =============================================================================

/// Base SQL of a paged query. Neither string may contain a `WHERE`; fixed
/// predicates go through [`Conditions::raw`].
#[derive(Debug, Clone, Copy)]
pub struct PageQuery {
    /// `SELECT <columns> FROM <table> <joins>`
    pub select: &'static str,
    /// `SELECT COUNT(*) FROM <table> <joins>`
    pub count: &'static str,
    /// Appended to `select` after the predicates, for aggregate rows.
    pub group_by: Option<&'static str>,
}

impl PageQuery {
    pub const fn new(select: &'static str, count: &'static str) -> Self {
        PageQuery {
            select,
            count,
            group_by: None,
        }
    }

    pub const fn grouped(mut self, group_by: &'static str) -> Self {
        self.group_by = Some(group_by);
        self
    }
}

/// Runs the count and the page query with the same predicates.
///
/// `apply` is called once per statement and must add the same predicates
/// both times.
pub async fn fetch_page<T>(
    pool: &SqlitePool,
    query: &PageQuery,
    pageable: &Pageable,
    sort: &SortSpec,
    apply: impl Fn(&mut Conditions<'_, '_>),
) -> DbResult<Page<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut count = QueryBuilder::<Sqlite>::new(query.count);
    apply(&mut Conditions::new(&mut count));
    debug!(sql = %count.sql(), "Counting page");
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    if total == 0 || pageable.offset() >= total {
        return Ok(Page::new(Vec::new(), pageable, total));
    }

    let mut select = QueryBuilder::<Sqlite>::new(query.select);
    apply(&mut Conditions::new(&mut select));
    if let Some(group_by) = query.group_by {
        select.push(" ").push(group_by);
    }
    push_page(&mut select, pageable, sort);
    debug!(sql = %select.sql(), "Fetching page");

    let content = select.build_query_as::<T>().fetch_all(pool).await?;
    Ok(Page::new(content, pageable, total))
}

/// Runs an existence check of the form `SELECT EXISTS(... WHERE col = ?)`.
pub async fn exists(pool: &SqlitePool, sql: &str, id: i64) -> DbResult<bool> {
    let found: i64 = sqlx::query_scalar(sql).bind(id).fetch_one(pool).await?;
    Ok(found != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: SortSpec = SortSpec {
        columns: &[("name", "c.name"), ("createdAt", "c.created_at")],
        default: ("c.name", Direction::Asc),
        tie_breaker: "c.id",
    };

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" ana "), "%ana%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }

    #[test]
    fn test_conditions_skip_unset_values() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM customer c");
        {
            let mut c = Conditions::new(&mut qb);
            c.text("c.name", None, MatchMode::Exact)
                .text("c.city", Some("   "), MatchMode::Like)
                .eq::<i64>("c.holding_id", None);
            assert!(!c.has_any());
        }
        assert_eq!(qb.sql(), "SELECT * FROM customer c");
    }

    #[test]
    fn test_conditions_where_then_and() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM customer c");
        Conditions::new(&mut qb)
            .text("c.name", Some("Silva"), MatchMode::Like)
            .eq("c.active", Some(true))
            .on_or_after("c.created_at", NaiveDate::from_ymd_opt(2024, 1, 1));

        assert_eq!(
            qb.sql(),
            "SELECT * FROM customer c WHERE c.name LIKE ? ESCAPE '\\' AND c.active = ? \
             AND date(c.created_at) >= ?"
        );
    }

    #[test]
    fn test_continuing_starts_with_and() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM lead l WHERE l.status = 'new'");
        Conditions::continuing(&mut qb).eq("l.seller_id", Some(3_i64));
        assert_eq!(
            qb.sql(),
            "SELECT * FROM lead l WHERE l.status = 'new' AND l.seller_id = ?"
        );
    }

    #[test]
    fn test_sort_resolution() {
        assert_eq!(SPEC.resolve(None), ("c.name", Direction::Asc));
        assert_eq!(
            SPEC.resolve(Some(&Sort::desc("createdAt"))),
            ("c.created_at", Direction::Desc)
        );
        // unknown properties never reach the SQL
        assert_eq!(
            SPEC.resolve(Some(&Sort::desc("name; DROP TABLE customer"))),
            ("c.name", Direction::Asc)
        );
    }

    #[test]
    fn test_push_page() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM customer c");
        push_page(&mut qb, &Pageable::of(2, 10).sorted(Sort::desc("name")), &SPEC);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM customer c ORDER BY c.name DESC, c.id LIMIT ? OFFSET ?"
        );
    }
}
