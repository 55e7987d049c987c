//! # Customer Repository
//!
//! ## Filters
//! ```text
//! CustomerFilter field   find (Exact)        search (Like)
//! ─────────────────────  ──────────────────  ────────────────────────
//! name                   c.name = ?          c.name LIKE %?%
//! document               c.document = ?      c.document LIKE %?%   (digits only)
//! city                   c.city = ?          c.city LIKE %?%
//! state                  c.state = ?         c.state = ?           (UF, always exact)
//! holding_id             c.holding_id = ?    c.holding_id = ?
//! active                 c.active = ?        c.active = ?
//! ```

use tracing::debug;

use crm_core::validation::normalize_document;
use crm_core::{Customer, CustomerFilter, Direction, Page, Pageable};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT c.* FROM customer c",
    "SELECT COUNT(*) FROM customer c",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("name", "c.name"),
        ("document", "c.document"),
        ("city", "c.city"),
        ("state", "c.state"),
        ("createdAt", "c.created_at"),
    ],
    default: ("c.name", Direction::Asc),
    tie_breaker: "c.id",
};

/// Repository for customers.
///
/// ## Usage
/// ```rust,ignore
/// let filter = CustomerFilter { name: Some("silva".into()), ..Default::default() };
/// let page = db.customers().search(&filter, &Pageable::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    base: RepositoryBase,
}

impl CustomerRepository {
    pub fn new(base: RepositoryBase) -> Self {
        CustomerRepository { base }
    }

    pub async fn find(
        &self,
        filter: &CustomerFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Customer>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "customer.find")
    }

    pub async fn search(
        &self,
        filter: &CustomerFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Customer>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "customer.search")
    }

    async fn query(
        &self,
        filter: &CustomerFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Customer>> {
        debug!(?filter, ?mode, "Querying customers");

        let document = filter.document.as_deref().map(normalize_document);
        let state = filter.state.as_deref().map(|s| s.trim().to_uppercase());

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("c.name", filter.name.as_deref(), mode)
                .text("c.document", document.as_deref(), mode)
                .text("c.city", filter.city.as_deref(), mode)
                .text("c.state", state.as_deref(), MatchMode::Exact)
                .eq("c.holding_id", filter.holding_id)
                .eq("c.active", filter.active);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customer WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "customer.get")
    }

    /// Customers linked to a user through `user_customer`, by name.
    pub async fn find_by_user(&self, user_id: i64) -> DbResult<Vec<Customer>> {
        sqlx::query_as::<_, Customer>(
            r#"
            SELECT c.*
            FROM customer c
            INNER JOIN user_customer uc ON uc.customer_id = c.id
            WHERE uc.user_id = ?
            ORDER BY c.name, c.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "customer.list")
    }

    /// Inserts a customer and returns its generated id.
    pub async fn save(&self, customer: &Customer) -> DbResult<i64> {
        let customer = customer.normalized();
        customer.validate().in_operation(&self.base, "customer.save")?;

        debug!(name = %customer.name, "Saving customer");

        let result = sqlx::query(
            r#"
            INSERT INTO customer (
                holding_id, name, document, email, phone, city, state, active, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer.holding_id)
        .bind(&customer.name)
        .bind(&customer.document)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(customer.active)
        .bind(customer.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "customer.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, customer: &Customer) -> DbResult<()> {
        let customer = customer.normalized();
        customer.validate().in_operation(&self.base, "customer.update")?;

        debug!(id = customer.id, "Updating customer");

        let result = sqlx::query(
            r#"
            UPDATE customer SET
                holding_id = ?,
                name = ?,
                document = ?,
                email = ?,
                phone = ?,
                city = ?,
                state = ?,
                active = ?
            WHERE id = ?
            "#,
        )
        .bind(customer.holding_id)
        .bind(&customer.name)
        .bind(&customer.document)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(customer.active)
        .bind(customer.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "customer.update")?;

        expect_row(result.rows_affected(), "customer", customer.id)
            .in_operation(&self.base, "customer.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "customer.delete")?;

        expect_row(result.rows_affected(), "customer", id)
            .in_operation(&self.base, "customer.delete")
    }

    pub async fn has_lead_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM lead WHERE customer_id = ?)", id)
            .await
            .in_operation(&self.base, "customer.relationship")
    }

    pub async fn has_sale_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM sale WHERE customer_id = ?)", id)
            .await
            .in_operation(&self.base, "customer.relationship")
    }
}
