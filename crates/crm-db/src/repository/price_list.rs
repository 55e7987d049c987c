//! # Price List Repository
//!
//! Dated price tables. A list with no partner is global; the current list
//! for a partner is its own list in force on the date, falling back to the
//! newest global list in force.

use chrono::NaiveDate;
use tracing::debug;

use crm_core::{Direction, Page, Pageable, PriceList, PriceListFilter};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT pl.* FROM price_list pl",
    "SELECT COUNT(*) FROM price_list pl",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("name", "pl.name"),
        ("validFrom", "pl.valid_from"),
        ("validUntil", "pl.valid_until"),
    ],
    default: ("pl.valid_from", Direction::Desc),
    tie_breaker: "pl.id",
};

#[derive(Debug, Clone)]
pub struct PriceListRepository {
    base: RepositoryBase,
}

impl PriceListRepository {
    pub fn new(base: RepositoryBase) -> Self {
        PriceListRepository { base }
    }

    pub async fn find(
        &self,
        filter: &PriceListFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<PriceList>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "price_list.find")
    }

    pub async fn search(
        &self,
        filter: &PriceListFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<PriceList>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "price_list.search")
    }

    async fn query(
        &self,
        filter: &PriceListFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<PriceList>> {
        debug!(?filter, ?mode, "Querying price lists");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("pl.name", filter.name.as_deref(), mode)
                .eq("pl.partner_id", filter.partner_id)
                .eq("pl.active", filter.active)
                .on_or_before("pl.valid_from", filter.valid_on)
                .bound(
                    "(pl.valid_until IS NULL OR date(pl.valid_until) >= ",
                    filter.valid_on,
                    ")",
                );
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<PriceList>> {
        sqlx::query_as::<_, PriceList>("SELECT * FROM price_list WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "price_list.get")
    }

    /// The active list in force on `date` for `partner_id`, preferring the
    /// partner's own list over a global one and the newest among equals.
    pub async fn find_current(
        &self,
        partner_id: Option<i64>,
        date: NaiveDate,
    ) -> DbResult<Option<PriceList>> {
        debug!(?partner_id, %date, "Resolving current price list");

        sqlx::query_as::<_, PriceList>(
            r#"
            SELECT * FROM price_list
            WHERE active = 1
              AND date(valid_from) <= ?
              AND (valid_until IS NULL OR date(valid_until) >= ?)
              AND (partner_id = ? OR partner_id IS NULL)
            ORDER BY partner_id IS NULL, valid_from DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(date)
        .bind(date)
        .bind(partner_id)
        .fetch_optional(self.base.pool())
        .await
        .in_operation(&self.base, "price_list.get")
    }

    pub async fn save(&self, list: &PriceList) -> DbResult<i64> {
        list.validate().in_operation(&self.base, "price_list.save")?;

        debug!(name = %list.name, "Saving price list");

        let result = sqlx::query(
            r#"
            INSERT INTO price_list (partner_id, name, valid_from, valid_until, active)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(list.partner_id)
        .bind(list.name.trim())
        .bind(list.valid_from)
        .bind(list.valid_until)
        .bind(list.active)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "price_list.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, list: &PriceList) -> DbResult<()> {
        list.validate().in_operation(&self.base, "price_list.update")?;

        let result = sqlx::query(
            r#"
            UPDATE price_list SET partner_id = ?, name = ?, valid_from = ?, valid_until = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(list.partner_id)
        .bind(list.name.trim())
        .bind(list.valid_from)
        .bind(list.valid_until)
        .bind(list.active)
        .bind(list.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "price_list.update")?;

        expect_row(result.rows_affected(), "price_list", list.id)
            .in_operation(&self.base, "price_list.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting price list");

        let result = sqlx::query("DELETE FROM price_list WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "price_list.delete")?;

        expect_row(result.rows_affected(), "price_list", id)
            .in_operation(&self.base, "price_list.delete")
    }

    pub async fn has_price_product_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM price_product WHERE price_list_id = ?)", id)
            .await
            .in_operation(&self.base, "price_list.relationship")
    }
}
