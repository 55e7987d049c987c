//! # Product Repository
//!
//! Sellable vehicle packages. A product is offered for one or more models
//! (`product_model`) and priced per list in `price_product`.
//!
//! ```text
//! ┌──────────┐      ┌───────────────┐      ┌────────────┐
//! │  model   │◄─────│ product_model │─────►│  product   │
//! └──────────┘      └───────────────┘      └─────┬──────┘
//!                                                │
//!                   ┌────────────┐      ┌────────▼──────┐
//!                   │ price_list │◄─────│ price_product │
//!                   └────────────┘      └───────────────┘
//! ```

use tracing::{debug, info};

use crm_core::{Direction, Page, Pageable, Product, ProductFilter};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT p.* FROM product p",
    "SELECT COUNT(*) FROM product p",
);

const SORT: SortSpec = SortSpec {
    columns: &[("name", "p.name"), ("code", "p.code")],
    default: ("p.name", Direction::Asc),
    tie_breaker: "p.id",
};

/// Repository for products and their model links.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    base: RepositoryBase,
}

impl ProductRepository {
    pub fn new(base: RepositoryBase) -> Self {
        ProductRepository { base }
    }

    pub async fn find(
        &self,
        filter: &ProductFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Product>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "product.find")
    }

    pub async fn search(
        &self,
        filter: &ProductFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Product>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "product.search")
    }

    async fn query(
        &self,
        filter: &ProductFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Product>> {
        debug!(?filter, ?mode, "Querying products");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("p.name", filter.name.as_deref(), mode)
                .text("p.code", filter.code.as_deref(), mode)
                .bound(
                    "p.id IN (SELECT product_id FROM product_model WHERE model_id = ",
                    filter.model_id,
                    ")",
                )
                .eq("p.active", filter.active);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        sqlx::query_as::<_, Product>("SELECT * FROM product WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "product.get")
    }

    /// Active products offered for a model, by name.
    pub async fn find_by_model(&self, model_id: i64) -> DbResult<Vec<Product>> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT p.* FROM product p
            INNER JOIN product_model pm ON pm.product_id = p.id
            WHERE pm.model_id = ? AND p.active = 1
            ORDER BY p.name, p.id
            "#,
        )
        .bind(model_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "product.list")
    }

    pub async fn save(&self, product: &Product) -> DbResult<i64> {
        product.validate().in_operation(&self.base, "product.save")?;

        debug!(code = %product.code, "Saving product");

        let result = sqlx::query(
            "INSERT INTO product (name, code, description, active) VALUES (?, ?, ?, ?)",
        )
        .bind(product.name.trim())
        .bind(product.code.trim())
        .bind(&product.description)
        .bind(product.active)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "product.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, product: &Product) -> DbResult<()> {
        product.validate().in_operation(&self.base, "product.update")?;

        debug!(id = product.id, "Updating product");

        let result = sqlx::query(
            "UPDATE product SET name = ?, code = ?, description = ?, active = ? WHERE id = ?",
        )
        .bind(product.name.trim())
        .bind(product.code.trim())
        .bind(&product.description)
        .bind(product.active)
        .bind(product.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "product.update")?;

        expect_row(result.rows_affected(), "product", product.id)
            .in_operation(&self.base, "product.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM product WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "product.delete")?;

        expect_row(result.rows_affected(), "product", id).in_operation(&self.base, "product.delete")
    }

    pub async fn add_model(&self, product_id: i64, model_id: i64) -> DbResult<()> {
        info!(product_id, model_id, "Offering product for model");

        sqlx::query("INSERT OR IGNORE INTO product_model (product_id, model_id) VALUES (?, ?)")
            .bind(product_id)
            .bind(model_id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "product.save")?;

        Ok(())
    }

    /// Returns whether the link existed.
    pub async fn remove_model(&self, product_id: i64, model_id: i64) -> DbResult<bool> {
        let result =
            sqlx::query("DELETE FROM product_model WHERE product_id = ? AND model_id = ?")
                .bind(product_id)
                .bind(model_id)
                .execute(self.base.pool())
                .await
                .in_operation(&self.base, "product.delete")?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the product is priced in any list.
    pub async fn has_price_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM price_product WHERE product_id = ?)", id)
            .await
            .in_operation(&self.base, "product.relationship")
    }
}
