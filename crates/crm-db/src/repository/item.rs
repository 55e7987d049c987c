//! # Item Repository
//!
//! Accessories, services and implements, with their model compatibility
//! list kept in `item_model`.

use tracing::{debug, info};

use crm_core::{Direction, Item, ItemFilter, Page, Pageable};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new("SELECT i.* FROM item i", "SELECT COUNT(*) FROM item i");

const SORT: SortSpec = SortSpec {
    columns: &[
        ("name", "i.name"),
        ("code", "i.code"),
        ("itemType", "i.item_type"),
    ],
    default: ("i.name", Direction::Asc),
    tie_breaker: "i.id",
};

#[derive(Debug, Clone)]
pub struct ItemRepository {
    base: RepositoryBase,
}

impl ItemRepository {
    pub fn new(base: RepositoryBase) -> Self {
        ItemRepository { base }
    }

    pub async fn find(&self, filter: &ItemFilter, pageable: &Pageable) -> DbResult<Page<Item>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "item.find")
    }

    pub async fn search(&self, filter: &ItemFilter, pageable: &Pageable) -> DbResult<Page<Item>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "item.search")
    }

    async fn query(
        &self,
        filter: &ItemFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Item>> {
        debug!(?filter, ?mode, "Querying items");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("i.name", filter.name.as_deref(), mode)
                .text("i.code", filter.code.as_deref(), mode)
                .eq("i.item_type", filter.item_type)
                .bound(
                    "i.id IN (SELECT item_id FROM item_model WHERE model_id = ",
                    filter.model_id,
                    ")",
                )
                .eq("i.active", filter.active);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Item>> {
        sqlx::query_as::<_, Item>("SELECT * FROM item WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "item.get")
    }

    pub async fn save(&self, item: &Item) -> DbResult<i64> {
        item.validate().in_operation(&self.base, "item.save")?;

        debug!(code = %item.code, "Saving item");

        let result =
            sqlx::query("INSERT INTO item (name, code, item_type, active) VALUES (?, ?, ?, ?)")
                .bind(item.name.trim())
                .bind(item.code.trim())
                .bind(item.item_type)
                .bind(item.active)
                .execute(self.base.pool())
                .await
                .in_operation(&self.base, "item.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, item: &Item) -> DbResult<()> {
        item.validate().in_operation(&self.base, "item.update")?;

        let result = sqlx::query(
            "UPDATE item SET name = ?, code = ?, item_type = ?, active = ? WHERE id = ?",
        )
        .bind(item.name.trim())
        .bind(item.code.trim())
        .bind(item.item_type)
        .bind(item.active)
        .bind(item.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "item.update")?;

        expect_row(result.rows_affected(), "item", item.id).in_operation(&self.base, "item.update")
    }

    /// Deletes an item together with its compatibility links.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting item");

        let result = sqlx::query("DELETE FROM item WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "item.delete")?;

        expect_row(result.rows_affected(), "item", id).in_operation(&self.base, "item.delete")
    }

    // -------------------------------------------------------------------------
    // Model compatibility
    // -------------------------------------------------------------------------

    pub async fn add_model(&self, item_id: i64, model_id: i64) -> DbResult<()> {
        info!(item_id, model_id, "Adding item compatibility");

        sqlx::query("INSERT OR IGNORE INTO item_model (item_id, model_id) VALUES (?, ?)")
            .bind(item_id)
            .bind(model_id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "item.save")?;

        Ok(())
    }

    /// Returns whether the link existed.
    pub async fn remove_model(&self, item_id: i64, model_id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM item_model WHERE item_id = ? AND model_id = ?")
            .bind(item_id)
            .bind(model_id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "item.delete")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn model_ids(&self, item_id: i64) -> DbResult<Vec<i64>> {
        sqlx::query_scalar("SELECT model_id FROM item_model WHERE item_id = ? ORDER BY model_id")
            .bind(item_id)
            .fetch_all(self.base.pool())
            .await
            .in_operation(&self.base, "item.list")
    }

    pub async fn has_model_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM item_model WHERE item_id = ?)", id)
            .await
            .in_operation(&self.base, "item.relationship")
    }
}

#[cfg(test)]
mod tests {
    use crm_core::ItemType;

    use super::*;
    use crate::test_support::{model, test_db, Graph};

    fn item(name: &str, code: &str, item_type: ItemType) -> Item {
        Item {
            id: 0,
            name: name.to_string(),
            code: code.to_string(),
            item_type,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_compatibility_filter() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.items();

        let other_model = db
            .models()
            .save(&model(g.brand_id, "FM 460", "FM460"))
            .await
            .unwrap();

        let bumper = repo
            .save(&item("Para-choque reforçado", "ACC-01", ItemType::Accessory))
            .await
            .unwrap();
        let tipper = repo
            .save(&item("Caçamba basculante", "IMP-01", ItemType::Implement))
            .await
            .unwrap();
        repo.add_model(bumper, g.model_id).await.unwrap();
        repo.add_model(bumper, other_model).await.unwrap();
        repo.add_model(tipper, other_model).await.unwrap();

        let all = Pageable::default();
        let for_fh = ItemFilter {
            model_id: Some(g.model_id),
            ..Default::default()
        };
        let page = repo.find(&for_fh, &all).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].id, bumper);

        let implements_for_fm = ItemFilter {
            model_id: Some(other_model),
            item_type: Some(ItemType::Implement),
            ..Default::default()
        };
        assert_eq!(repo.find(&implements_for_fm, &all).await.unwrap().content[0].id, tipper);

        let by_name = ItemFilter {
            name: Some("CAÇAMBA".to_string()),
            ..Default::default()
        };
        // SQLite LIKE folds ASCII case only
        assert_eq!(repo.search(&by_name, &all).await.unwrap().total_elements, 0);
        let by_name = ItemFilter {
            name: Some("caçamba".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search(&by_name, &all).await.unwrap().total_elements, 1);
    }

    #[tokio::test]
    async fn test_links_and_delete_cascade() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.items();

        let id = repo
            .save(&item("Revisão 10.000 km", "SRV-10", ItemType::Service))
            .await
            .unwrap();
        assert!(!repo.has_model_relationship(id).await.unwrap());

        repo.add_model(id, g.model_id).await.unwrap();
        repo.add_model(id, g.model_id).await.unwrap();
        assert_eq!(repo.model_ids(id).await.unwrap(), vec![g.model_id]);
        assert!(repo.has_model_relationship(id).await.unwrap());

        assert!(repo.remove_model(id, g.model_id).await.unwrap());
        assert!(!repo.remove_model(id, g.model_id).await.unwrap());

        repo.add_model(id, g.model_id).await.unwrap();
        repo.update(&Item {
            id,
            active: false,
            ..item("Revisão 20.000 km", "SRV-20", ItemType::Service)
        })
        .await
        .unwrap();
        assert_eq!(repo.get_by_id(id).await.unwrap().unwrap().code, "SRV-20");

        repo.delete(id).await.unwrap();
        assert!(repo.model_ids(id).await.unwrap().is_empty());
    }
}
