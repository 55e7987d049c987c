//! # Seller Repository
//!
//! Sales representatives. Like partners, the name filter matches the
//! linked `person` row.

use tracing::debug;

use crm_core::{Direction, Page, Pageable, Seller, SellerFilter};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT s.* FROM seller s INNER JOIN person pe ON pe.id = s.person_id",
    "SELECT COUNT(*) FROM seller s INNER JOIN person pe ON pe.id = s.person_id",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("code", "s.code"),
        ("name", "pe.name"),
        ("createdAt", "s.created_at"),
    ],
    default: ("pe.name", Direction::Asc),
    tie_breaker: "s.id",
};

#[derive(Debug, Clone)]
pub struct SellerRepository {
    base: RepositoryBase,
}

impl SellerRepository {
    pub fn new(base: RepositoryBase) -> Self {
        SellerRepository { base }
    }

    pub async fn find(&self, filter: &SellerFilter, pageable: &Pageable) -> DbResult<Page<Seller>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "seller.find")
    }

    pub async fn search(
        &self,
        filter: &SellerFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Seller>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "seller.search")
    }

    async fn query(
        &self,
        filter: &SellerFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Seller>> {
        debug!(?filter, ?mode, "Querying sellers");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("s.code", filter.code.as_deref(), mode)
                .text("pe.name", filter.name.as_deref(), mode)
                .eq("s.partner_id", filter.partner_id)
                .eq("s.active", filter.active);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Seller>> {
        sqlx::query_as::<_, Seller>("SELECT * FROM seller WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "seller.get")
    }

    /// Active sellers of a partner, by code.
    pub async fn find_by_partner(&self, partner_id: i64) -> DbResult<Vec<Seller>> {
        sqlx::query_as::<_, Seller>(
            "SELECT * FROM seller WHERE partner_id = ? AND active = 1 ORDER BY code, id",
        )
        .bind(partner_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "seller.list")
    }

    pub async fn save(&self, seller: &Seller) -> DbResult<i64> {
        seller.validate().in_operation(&self.base, "seller.save")?;

        debug!(code = %seller.code, "Saving seller");

        let result = sqlx::query(
            r#"
            INSERT INTO seller (person_id, partner_id, user_id, code, active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(seller.person_id)
        .bind(seller.partner_id)
        .bind(seller.user_id)
        .bind(seller.code.trim())
        .bind(seller.active)
        .bind(seller.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "seller.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, seller: &Seller) -> DbResult<()> {
        seller.validate().in_operation(&self.base, "seller.update")?;

        debug!(id = seller.id, "Updating seller");

        let result = sqlx::query(
            r#"
            UPDATE seller SET person_id = ?, partner_id = ?, user_id = ?, code = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(seller.person_id)
        .bind(seller.partner_id)
        .bind(seller.user_id)
        .bind(seller.code.trim())
        .bind(seller.active)
        .bind(seller.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "seller.update")?;

        expect_row(result.rows_affected(), "seller", seller.id)
            .in_operation(&self.base, "seller.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting seller");

        let result = sqlx::query("DELETE FROM seller WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "seller.delete")?;

        expect_row(result.rows_affected(), "seller", id).in_operation(&self.base, "seller.delete")
    }

    /// Whether the seller is on any proposal detail.
    pub async fn has_proposal_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM proposal_detail WHERE seller_id = ?)", id)
            .await
            .in_operation(&self.base, "seller.relationship")
    }

    pub async fn has_lead_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM lead WHERE seller_id = ?)", id)
            .await
            .in_operation(&self.base, "seller.relationship")
    }
}
