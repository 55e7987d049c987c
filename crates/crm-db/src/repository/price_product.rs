//! Product prices inside a price list.

use tracing::debug;

use crm_core::{Direction, Page, Pageable, PriceProduct, PriceProductFilter};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT pp.* FROM price_product pp",
    "SELECT COUNT(*) FROM price_product pp",
);

const SORT: SortSpec = SortSpec {
    columns: &[("price", "pp.price_cents"), ("productId", "pp.product_id")],
    default: ("pp.id", Direction::Asc),
    tie_breaker: "pp.id",
};

#[derive(Debug, Clone)]
pub struct PriceProductRepository {
    base: RepositoryBase,
}

impl PriceProductRepository {
    pub fn new(base: RepositoryBase) -> Self {
        PriceProductRepository { base }
    }

    pub async fn find(
        &self,
        filter: &PriceProductFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<PriceProduct>> {
        self.query(filter, pageable)
            .await
            .in_operation(&self.base, "price_product.find")
    }

    /// Same as [`find`](Self::find); the filter has no text fields.
    pub async fn search(
        &self,
        filter: &PriceProductFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<PriceProduct>> {
        self.query(filter, pageable)
            .await
            .in_operation(&self.base, "price_product.search")
    }

    async fn query(
        &self,
        filter: &PriceProductFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<PriceProduct>> {
        debug!(?filter, "Querying price products");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.eq("pp.price_list_id", filter.price_list_id)
                .eq("pp.product_id", filter.product_id);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<PriceProduct>> {
        sqlx::query_as::<_, PriceProduct>("SELECT * FROM price_product WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "price_product.get")
    }

    pub async fn find_by_price_list(&self, price_list_id: i64) -> DbResult<Vec<PriceProduct>> {
        sqlx::query_as::<_, PriceProduct>(
            "SELECT * FROM price_product WHERE price_list_id = ? ORDER BY product_id, id",
        )
        .bind(price_list_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "price_product.list")
    }

    pub async fn save(&self, price: &PriceProduct) -> DbResult<i64> {
        price.validate().in_operation(&self.base, "price_product.save")?;

        debug!(
            price_list_id = price.price_list_id,
            product_id = price.product_id,
            "Saving product price"
        );

        let result = sqlx::query(
            "INSERT INTO price_product (price_list_id, product_id, price_cents) VALUES (?, ?, ?)",
        )
        .bind(price.price_list_id)
        .bind(price.product_id)
        .bind(price.price_cents)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "price_product.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, price: &PriceProduct) -> DbResult<()> {
        price.validate().in_operation(&self.base, "price_product.update")?;

        let result = sqlx::query(
            "UPDATE price_product SET price_list_id = ?, product_id = ?, price_cents = ? WHERE id = ?",
        )
        .bind(price.price_list_id)
        .bind(price.product_id)
        .bind(price.price_cents)
        .bind(price.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "price_product.update")?;

        expect_row(result.rows_affected(), "price_product", price.id)
            .in_operation(&self.base, "price_product.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM price_product WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "price_product.delete")?;

        expect_row(result.rows_affected(), "price_product", id)
            .in_operation(&self.base, "price_product.delete")
    }

    /// Whether a proposal line was priced from this entry.
    pub async fn has_proposal_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists(
                "SELECT EXISTS(SELECT 1 FROM proposal_detail_vehicle WHERE price_product_id = ?)",
                id,
            )
            .await
            .in_operation(&self.base, "price_product.relationship")
    }
}
