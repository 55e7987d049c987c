//! Brand repository.

use tracing::debug;

use crm_core::{Brand, BrandFilter, Direction, Page, Pageable};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new("SELECT b.* FROM brand b", "SELECT COUNT(*) FROM brand b");

const SORT: SortSpec = SortSpec {
    columns: &[("name", "b.name")],
    default: ("b.name", Direction::Asc),
    tie_breaker: "b.id",
};

#[derive(Debug, Clone)]
pub struct BrandRepository {
    base: RepositoryBase,
}

impl BrandRepository {
    pub fn new(base: RepositoryBase) -> Self {
        BrandRepository { base }
    }

    pub async fn find(&self, filter: &BrandFilter, pageable: &Pageable) -> DbResult<Page<Brand>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "brand.find")
    }

    pub async fn search(&self, filter: &BrandFilter, pageable: &Pageable) -> DbResult<Page<Brand>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "brand.search")
    }

    async fn query(
        &self,
        filter: &BrandFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Brand>> {
        debug!(?filter, ?mode, "Querying brands");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("b.name", filter.name.as_deref(), mode);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Brand>> {
        sqlx::query_as::<_, Brand>("SELECT * FROM brand WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "brand.get")
    }

    pub async fn save(&self, brand: &Brand) -> DbResult<i64> {
        brand.validate().in_operation(&self.base, "brand.save")?;

        let result = sqlx::query("INSERT INTO brand (name) VALUES (?)")
            .bind(brand.name.trim())
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "brand.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, brand: &Brand) -> DbResult<()> {
        brand.validate().in_operation(&self.base, "brand.update")?;

        let result = sqlx::query("UPDATE brand SET name = ? WHERE id = ?")
            .bind(brand.name.trim())
            .bind(brand.id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "brand.update")?;

        expect_row(result.rows_affected(), "brand", brand.id).in_operation(&self.base, "brand.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM brand WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "brand.delete")?;

        expect_row(result.rows_affected(), "brand", id).in_operation(&self.base, "brand.delete")
    }

    pub async fn has_model_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM model WHERE brand_id = ?)", id)
            .await
            .in_operation(&self.base, "brand.relationship")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_db, Graph};

    fn brand(name: &str) -> Brand {
        Brand {
            id: 0,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_brand_lifecycle() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.brands();

        let scania = repo.save(&brand("Scania")).await.unwrap();
        repo.save(&brand("Mercedes-Benz")).await.unwrap();

        let filter = BrandFilter {
            name: Some("SCAN".to_string()),
        };
        assert_eq!(repo.find(&filter, &Pageable::default()).await.unwrap().total_elements, 0);
        let page = repo.search(&filter, &Pageable::default()).await.unwrap();
        assert_eq!(page.content, vec![Brand { id: scania, name: "Scania".to_string() }]);

        assert!(repo.has_model_relationship(g.brand_id).await.unwrap());
        assert!(!repo.has_model_relationship(scania).await.unwrap());

        repo.update(&brand_with_id(scania, "Scania do Brasil")).await.unwrap();
        assert_eq!(
            repo.get_by_id(scania).await.unwrap().unwrap().name,
            "Scania do Brasil"
        );

        repo.delete(scania).await.unwrap();
        assert!(repo.get_by_id(scania).await.unwrap().is_none());
    }

    fn brand_with_id(id: i64, name: &str) -> Brand {
        Brand {
            id,
            ..brand(name)
        }
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = test_db().await;
        let err = db.brands().save(&brand("  ")).await.unwrap_err();
        assert!(matches!(err.kind(), crate::DbError::Validation(_)));
        assert_eq!(err.to_string(), "Erro ao salvar marca");
    }
}
