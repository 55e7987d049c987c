//! # User Repository
//!
//! Application users and their customer portfolio (`user_customer`), which
//! drives approval visibility for approvers and managers.
//!
//! ```text
//! user (approver) ──< user_customer >── customer ──< lead ──< proposal
//! ```

use tracing::{debug, info};

use crm_core::{Direction, Page, Pageable, User, UserFilter};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT u.* FROM user u",
    "SELECT COUNT(*) FROM user u",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("username", "u.username"),
        ("email", "u.email"),
        ("profile", "u.profile"),
        ("createdAt", "u.created_at"),
    ],
    default: ("u.username", Direction::Asc),
    tie_breaker: "u.id",
};

#[derive(Debug, Clone)]
pub struct UserRepository {
    base: RepositoryBase,
}

impl UserRepository {
    pub fn new(base: RepositoryBase) -> Self {
        UserRepository { base }
    }

    pub async fn find(&self, filter: &UserFilter, pageable: &Pageable) -> DbResult<Page<User>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "user.find")
    }

    pub async fn search(&self, filter: &UserFilter, pageable: &Pageable) -> DbResult<Page<User>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "user.search")
    }

    async fn query(
        &self,
        filter: &UserFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<User>> {
        debug!(?filter, ?mode, "Querying users");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("u.username", filter.username.as_deref(), mode)
                .text("u.email", filter.email.as_deref(), mode)
                .eq("u.profile", filter.profile)
                .eq("u.active", filter.active);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM user WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "user.get")
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM user WHERE username = ?")
            .bind(username.trim())
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "user.get")
    }

    pub async fn save(&self, user: &User) -> DbResult<i64> {
        user.validate().in_operation(&self.base, "user.save")?;

        debug!(username = %user.username, profile = %user.profile, "Saving user");

        let result = sqlx::query(
            r#"
            INSERT INTO user (person_id, username, email, profile, active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.person_id)
        .bind(user.username.trim())
        .bind(&user.email)
        .bind(user.profile)
        .bind(user.active)
        .bind(user.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "user.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, user: &User) -> DbResult<()> {
        user.validate().in_operation(&self.base, "user.update")?;

        debug!(id = user.id, "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE user SET person_id = ?, username = ?, email = ?, profile = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(user.person_id)
        .bind(user.username.trim())
        .bind(&user.email)
        .bind(user.profile)
        .bind(user.active)
        .bind(user.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "user.update")?;

        expect_row(result.rows_affected(), "user", user.id).in_operation(&self.base, "user.update")
    }

    /// Deletes a user. Customer links go with it (`ON DELETE CASCADE`).
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting user");

        let result = sqlx::query("DELETE FROM user WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "user.delete")?;

        expect_row(result.rows_affected(), "user", id).in_operation(&self.base, "user.delete")
    }

    // -------------------------------------------------------------------------
    // Customer portfolio
    // -------------------------------------------------------------------------

    /// Adds a customer to the user's portfolio. Linking twice is a no-op.
    pub async fn link_customer(&self, user_id: i64, customer_id: i64) -> DbResult<()> {
        info!(user_id, customer_id, "Linking customer to user");

        sqlx::query("INSERT OR IGNORE INTO user_customer (user_id, customer_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(customer_id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "user.link")?;

        Ok(())
    }

    /// Removes a customer from the portfolio; returns whether a link existed.
    pub async fn unlink_customer(&self, user_id: i64, customer_id: i64) -> DbResult<bool> {
        info!(user_id, customer_id, "Unlinking customer from user");

        let result = sqlx::query("DELETE FROM user_customer WHERE user_id = ? AND customer_id = ?")
            .bind(user_id)
            .bind(customer_id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "user.unlink")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn customer_ids(&self, user_id: i64) -> DbResult<Vec<i64>> {
        sqlx::query_scalar(
            "SELECT customer_id FROM user_customer WHERE user_id = ? ORDER BY customer_id",
        )
        .bind(user_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "user.list")
    }

    /// Whether the user created any proposal.
    pub async fn has_proposal_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM proposal WHERE created_by = ?)", id)
            .await
            .in_operation(&self.base, "user.relationship")
    }
}

#[cfg(test)]
mod tests {
    use crm_core::Profile;

    use super::*;
    use crate::test_support::{test_db, user, Graph};

    #[tokio::test]
    async fn test_filters() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.users();
        let all = Pageable::default();

        let approvers = UserFilter {
            profile: Some(Profile::Approver),
            ..Default::default()
        };
        let page = repo.find(&approvers, &all).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].id, g.approver_id);

        let by_email = UserFilter {
            email: Some("@crm.test".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.find(&by_email, &all).await.unwrap().total_elements, 0);
        assert_eq!(repo.search(&by_email, &all).await.unwrap().total_elements, 3);

        let inactive = UserFilter {
            active: Some(false),
            ..Default::default()
        };
        assert_eq!(repo.find(&inactive, &all).await.unwrap().total_elements, 0);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let db = test_db().await;
        let repo = db.users();

        let new = user("gerente", Profile::Manager);
        let id = repo.save(&new).await.unwrap();
        let saved = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(saved, User { id, ..new });

        let by_name = repo.get_by_username(" gerente ").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);

        repo.update(&User {
            active: false,
            ..saved
        })
        .await
        .unwrap();
        assert!(!repo.get_by_id(id).await.unwrap().unwrap().active);

        repo.delete(id).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_customer_links() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.users();

        assert_eq!(repo.customer_ids(g.approver_id).await.unwrap(), vec![g.silva_id]);

        repo.link_customer(g.approver_id, g.agro_id).await.unwrap();
        repo.link_customer(g.approver_id, g.agro_id).await.unwrap();
        let mut expected = vec![g.silva_id, g.agro_id];
        expected.sort_unstable();
        assert_eq!(repo.customer_ids(g.approver_id).await.unwrap(), expected);

        assert!(repo.unlink_customer(g.approver_id, g.agro_id).await.unwrap());
        assert!(!repo.unlink_customer(g.approver_id, g.agro_id).await.unwrap());
        assert_eq!(repo.customer_ids(g.approver_id).await.unwrap(), vec![g.silva_id]);
    }

    #[tokio::test]
    async fn test_proposal_guard() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.users();

        assert!(repo.has_proposal_relationship(g.seller_user_id).await.unwrap());
        assert!(repo.has_proposal_relationship(g.admin_id).await.unwrap());
        assert!(!repo.has_proposal_relationship(g.approver_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = test_db().await;
        let repo = db.users();
        repo.save(&user("ana", Profile::Seller)).await.unwrap();
        let err = repo.save(&user("ana", Profile::Admin)).await.unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(err.to_string(), "Erro ao salvar usuário");
    }
}
