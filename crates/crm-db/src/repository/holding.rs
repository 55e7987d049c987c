//! # Holding Repository
//!
//! Economic groups owning customers. A holding with customers cannot be
//! deleted; callers check [`HoldingRepository::has_customer_relationship`]
//! first.

use tracing::debug;

use crm_core::validation::normalize_document;
use crm_core::{Direction, Holding, HoldingFilter, Page, Pageable};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT h.* FROM holding h",
    "SELECT COUNT(*) FROM holding h",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("name", "h.name"),
        ("document", "h.document"),
        ("createdAt", "h.created_at"),
    ],
    default: ("h.name", Direction::Asc),
    tie_breaker: "h.id",
};

/// Repository for holdings.
#[derive(Debug, Clone)]
pub struct HoldingRepository {
    base: RepositoryBase,
}

impl HoldingRepository {
    pub fn new(base: RepositoryBase) -> Self {
        HoldingRepository { base }
    }

    /// Holdings matching every set field exactly.
    pub async fn find(&self, filter: &HoldingFilter, pageable: &Pageable) -> DbResult<Page<Holding>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "holding.find")
    }

    /// Like `find`, with `LIKE` on name and document.
    pub async fn search(
        &self,
        filter: &HoldingFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Holding>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "holding.search")
    }

    async fn query(
        &self,
        filter: &HoldingFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Holding>> {
        debug!(?filter, ?mode, "Querying holdings");

        let document = filter.document.as_deref().map(normalize_document);

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("h.name", filter.name.as_deref(), mode)
                .text("h.document", document.as_deref(), mode)
                .eq("h.active", filter.active);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Holding>> {
        sqlx::query_as::<_, Holding>("SELECT * FROM holding WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "holding.get")
    }

    /// Inserts a holding and returns its generated id.
    ///
    /// The document is stored as digits only.
    pub async fn save(&self, holding: &Holding) -> DbResult<i64> {
        let holding = holding.normalized();
        holding.validate().in_operation(&self.base, "holding.save")?;

        debug!(name = %holding.name, "Saving holding");

        let result = sqlx::query(
            "INSERT INTO holding (name, document, active, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&holding.name)
        .bind(&holding.document)
        .bind(holding.active)
        .bind(holding.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "holding.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, holding: &Holding) -> DbResult<()> {
        let holding = holding.normalized();
        holding.validate().in_operation(&self.base, "holding.update")?;

        debug!(id = holding.id, "Updating holding");

        let result = sqlx::query("UPDATE holding SET name = ?, document = ?, active = ? WHERE id = ?")
            .bind(&holding.name)
            .bind(&holding.document)
            .bind(holding.active)
            .bind(holding.id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "holding.update")?;

        expect_row(result.rows_affected(), "holding", holding.id)
            .in_operation(&self.base, "holding.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting holding");

        let result = sqlx::query("DELETE FROM holding WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "holding.delete")?;

        expect_row(result.rows_affected(), "holding", id).in_operation(&self.base, "holding.delete")
    }

    /// Whether any customer belongs to the holding.
    pub async fn has_customer_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM customer WHERE holding_id = ?)", id)
            .await
            .in_operation(&self.base, "holding.relationship")
    }
}
