//! # Menu Repository
//!
//! Navigation tree and the profiles allowed to see each entry.
//!
//! ```text
//! menu ──────────── menu_profile
//!  id ◄──┐           menu_id (cascade)
//!  parent_id         profile
//! ```

use tracing::{debug, info};

use crm_core::{Direction, Menu, MenuFilter, Page, Pageable, Profile};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new("SELECT m.* FROM menu m", "SELECT COUNT(*) FROM menu m");

const SORT: SortSpec = SortSpec {
    columns: &[("label", "m.label"), ("position", "m.position")],
    default: ("m.position", Direction::Asc),
    tie_breaker: "m.id",
};

#[derive(Debug, Clone)]
pub struct MenuRepository {
    base: RepositoryBase,
}

impl MenuRepository {
    pub fn new(base: RepositoryBase) -> Self {
        MenuRepository { base }
    }

    pub async fn find(&self, filter: &MenuFilter, pageable: &Pageable) -> DbResult<Page<Menu>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "menu.find")
    }

    pub async fn search(&self, filter: &MenuFilter, pageable: &Pageable) -> DbResult<Page<Menu>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "menu.search")
    }

    async fn query(
        &self,
        filter: &MenuFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Menu>> {
        debug!(?filter, ?mode, "Querying menus");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("m.label", filter.label.as_deref(), mode)
                .eq("m.parent_id", filter.parent_id)
                .bound(
                    "m.id IN (SELECT menu_id FROM menu_profile WHERE profile = ",
                    filter.profile,
                    ")",
                );
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Menu>> {
        sqlx::query_as::<_, Menu>("SELECT * FROM menu WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "menu.get")
    }

    /// Every entry granted to `profile`: root entries first, then children,
    /// each group ordered by position.
    pub async fn find_for_profile(&self, profile: Profile) -> DbResult<Vec<Menu>> {
        sqlx::query_as::<_, Menu>(
            r#"
            SELECT m.* FROM menu m
            INNER JOIN menu_profile mp ON mp.menu_id = m.id
            WHERE mp.profile = ?
            ORDER BY m.parent_id IS NOT NULL, m.position, m.id
            "#,
        )
        .bind(profile)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "menu.list")
    }

    pub async fn save(&self, menu: &Menu) -> DbResult<i64> {
        menu.validate().in_operation(&self.base, "menu.save")?;

        debug!(label = %menu.label, parent_id = ?menu.parent_id, "Saving menu");

        let result = sqlx::query(
            "INSERT INTO menu (parent_id, label, route, icon, position) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(menu.parent_id)
        .bind(menu.label.trim())
        .bind(menu.route.as_deref())
        .bind(menu.icon.as_deref())
        .bind(menu.position)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "menu.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, menu: &Menu) -> DbResult<()> {
        menu.validate().in_operation(&self.base, "menu.update")?;

        let result = sqlx::query(
            "UPDATE menu SET parent_id = ?, label = ?, route = ?, icon = ?, position = ? WHERE id = ?",
        )
        .bind(menu.parent_id)
        .bind(menu.label.trim())
        .bind(menu.route.as_deref())
        .bind(menu.icon.as_deref())
        .bind(menu.position)
        .bind(menu.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "menu.update")?;

        expect_row(result.rows_affected(), "menu", menu.id).in_operation(&self.base, "menu.update")
    }

    /// Deletes an entry and its grants. Entries with children are refused by
    /// the foreign key.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting menu");

        let result = sqlx::query("DELETE FROM menu WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "menu.delete")?;

        expect_row(result.rows_affected(), "menu", id).in_operation(&self.base, "menu.delete")
    }

    // -------------------------------------------------------------------------
    // Profile grants
    // -------------------------------------------------------------------------

    pub async fn grant(&self, menu_id: i64, profile: Profile) -> DbResult<()> {
        info!(menu_id, %profile, "Granting menu");

        sqlx::query("INSERT OR IGNORE INTO menu_profile (menu_id, profile) VALUES (?, ?)")
            .bind(menu_id)
            .bind(profile)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "menu.grant")?;

        Ok(())
    }

    /// Returns whether the grant existed.
    pub async fn revoke(&self, menu_id: i64, profile: Profile) -> DbResult<bool> {
        info!(menu_id, %profile, "Revoking menu");

        let result = sqlx::query("DELETE FROM menu_profile WHERE menu_id = ? AND profile = ?")
            .bind(menu_id)
            .bind(profile)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "menu.revoke")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_children_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM menu WHERE parent_id = ?)", id)
            .await
            .in_operation(&self.base, "menu.relationship")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    fn menu(parent_id: Option<i64>, label: &str, position: i32) -> Menu {
        Menu {
            id: 0,
            parent_id,
            label: label.to_string(),
            route: None,
            icon: None,
            position,
        }
    }

    #[tokio::test]
    async fn test_profile_tree() {
        let db = test_db().await;
        let repo = db.menus();

        let commercial = repo.save(&menu(None, "Comercial", 2)).await.unwrap();
        let registry = repo.save(&menu(None, "Cadastros", 1)).await.unwrap();
        let approvals = repo
            .save(&Menu {
                route: Some("/aprovacoes".to_string()),
                ..menu(Some(commercial), "Aprovações", 1)
            })
            .await
            .unwrap();
        let proposals = repo
            .save(&Menu {
                route: Some("/propostas".to_string()),
                ..menu(Some(commercial), "Propostas", 0)
            })
            .await
            .unwrap();

        for id in [commercial, registry, approvals, proposals] {
            repo.grant(id, Profile::Approver).await.unwrap();
        }
        repo.grant(commercial, Profile::Seller).await.unwrap();
        repo.grant(proposals, Profile::Seller).await.unwrap();
        repo.grant(proposals, Profile::Seller).await.unwrap();

        let approver = repo.find_for_profile(Profile::Approver).await.unwrap();
        assert_eq!(
            approver.iter().map(|m| m.id).collect::<Vec<_>>(),
            [registry, commercial, proposals, approvals]
        );

        let seller = repo.find_for_profile(Profile::Seller).await.unwrap();
        assert_eq!(seller.iter().map(|m| m.id).collect::<Vec<_>>(), [commercial, proposals]);

        assert!(repo.revoke(proposals, Profile::Seller).await.unwrap());
        assert!(!repo.revoke(proposals, Profile::Seller).await.unwrap());
        assert_eq!(repo.find_for_profile(Profile::Seller).await.unwrap().len(), 1);
        assert!(repo.find_for_profile(Profile::Admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filters() {
        let db = test_db().await;
        let repo = db.menus();

        let commercial = repo.save(&menu(None, "Comercial", 1)).await.unwrap();
        let proposals = repo.save(&menu(Some(commercial), "Propostas", 1)).await.unwrap();
        repo.save(&menu(Some(commercial), "Vendas", 2)).await.unwrap();
        repo.grant(proposals, Profile::Manager).await.unwrap();

        let all = Pageable::default();

        let children = MenuFilter {
            parent_id: Some(commercial),
            ..Default::default()
        };
        assert_eq!(repo.find(&children, &all).await.unwrap().total_elements, 2);

        let for_manager = MenuFilter {
            profile: Some(Profile::Manager),
            ..Default::default()
        };
        let page = repo.find(&for_manager, &all).await.unwrap();
        assert_eq!(page.content.iter().map(|m| m.id).collect::<Vec<_>>(), [proposals]);

        let by_label = MenuFilter {
            label: Some("post".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search(&by_label, &all).await.unwrap().content[0].id, proposals);
        assert_eq!(repo.find(&by_label, &all).await.unwrap().total_elements, 0);
    }

    #[tokio::test]
    async fn test_delete_with_children_and_grants() {
        let db = test_db().await;
        let repo = db.menus();

        let parent = repo.save(&menu(None, "Sistema", 9)).await.unwrap();
        let child = repo.save(&menu(Some(parent), "Usuários", 1)).await.unwrap();
        repo.grant(child, Profile::Admin).await.unwrap();

        assert!(repo.has_children_relationship(parent).await.unwrap());
        let err = repo.delete(parent).await.unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(err.to_string(), "Erro ao excluir menu");

        repo.delete(child).await.unwrap();
        assert!(repo.find_for_profile(Profile::Admin).await.unwrap().is_empty());
        assert!(!repo.has_children_relationship(parent).await.unwrap());
        repo.delete(parent).await.unwrap();

        let err = repo.update(&Menu { id: parent, ..menu(None, "Sistema", 9) }).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
