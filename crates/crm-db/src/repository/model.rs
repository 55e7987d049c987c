//! # Model Repository
//!
//! Vehicle models of a brand. A model is referenced by stock vehicles,
//! proposal lines and products (`product_model`); each has its own guard.

use tracing::debug;

use crm_core::{Direction, Model, ModelFilter, Page, Pageable};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new("SELECT m.* FROM model m", "SELECT COUNT(*) FROM model m");

const SORT: SortSpec = SortSpec {
    columns: &[("name", "m.name"), ("code", "m.code")],
    default: ("m.name", Direction::Asc),
    tie_breaker: "m.id",
};

#[derive(Debug, Clone)]
pub struct ModelRepository {
    base: RepositoryBase,
}

impl ModelRepository {
    pub fn new(base: RepositoryBase) -> Self {
        ModelRepository { base }
    }

    pub async fn find(&self, filter: &ModelFilter, pageable: &Pageable) -> DbResult<Page<Model>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "model.find")
    }

    pub async fn search(&self, filter: &ModelFilter, pageable: &Pageable) -> DbResult<Page<Model>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "model.search")
    }

    async fn query(
        &self,
        filter: &ModelFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Model>> {
        debug!(?filter, ?mode, "Querying models");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("m.name", filter.name.as_deref(), mode)
                .text("m.code", filter.code.as_deref(), mode)
                .eq("m.brand_id", filter.brand_id)
                .eq("m.active", filter.active);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Model>> {
        sqlx::query_as::<_, Model>("SELECT * FROM model WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "model.get")
    }

    /// Active models of a brand, by name.
    pub async fn find_by_brand(&self, brand_id: i64) -> DbResult<Vec<Model>> {
        sqlx::query_as::<_, Model>(
            "SELECT * FROM model WHERE brand_id = ? AND active = 1 ORDER BY name, id",
        )
        .bind(brand_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "model.list")
    }

    pub async fn save(&self, model: &Model) -> DbResult<i64> {
        model.validate().in_operation(&self.base, "model.save")?;

        debug!(code = %model.code, "Saving model");

        let result = sqlx::query("INSERT INTO model (brand_id, name, code, active) VALUES (?, ?, ?, ?)")
            .bind(model.brand_id)
            .bind(model.name.trim())
            .bind(model.code.trim())
            .bind(model.active)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "model.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, model: &Model) -> DbResult<()> {
        model.validate().in_operation(&self.base, "model.update")?;

        let result =
            sqlx::query("UPDATE model SET brand_id = ?, name = ?, code = ?, active = ? WHERE id = ?")
                .bind(model.brand_id)
                .bind(model.name.trim())
                .bind(model.code.trim())
                .bind(model.active)
                .bind(model.id)
                .execute(self.base.pool())
                .await
                .in_operation(&self.base, "model.update")?;

        expect_row(result.rows_affected(), "model", model.id).in_operation(&self.base, "model.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting model");

        let result = sqlx::query("DELETE FROM model WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "model.delete")?;

        expect_row(result.rows_affected(), "model", id).in_operation(&self.base, "model.delete")
    }

    pub async fn has_vehicle_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM vehicle WHERE model_id = ?)", id)
            .await
            .in_operation(&self.base, "model.relationship")
    }

    /// Whether any proposal line quotes the model.
    pub async fn has_proposal_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists(
                "SELECT EXISTS(SELECT 1 FROM proposal_detail_vehicle WHERE model_id = ?)",
                id,
            )
            .await
            .in_operation(&self.base, "model.relationship")
    }

    pub async fn has_product_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM product_model WHERE model_id = ?)", id)
            .await
            .in_operation(&self.base, "model.relationship")
    }
}
