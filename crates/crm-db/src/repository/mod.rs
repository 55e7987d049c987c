//! # Repository Module
//!
//! One repository per entity, all following the same contract.
//!
//! ## Repository Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Uniform Repository Contract                          │
//! │                                                                         │
//! │  Service layer                                                         │
//! │       │                                                                 │
//! │       │  db.customers().search(&filter, &pageable)                     │
//! │       ▼                                                                 │
//! │  CustomerRepository                                                    │
//! │  ├── find(filter, pageable)    set fields → `col = ?`                  │
//! │  ├── search(filter, pageable)  set text fields → `col LIKE %v%`        │
//! │  ├── get_by_id(id)             → Option<T>                             │
//! │  ├── save(model)               → generated id                          │
//! │  ├── update(model)             → NotFound when no row matched          │
//! │  ├── delete(id)                → NotFound when no row matched          │
//! │  └── has_x_relationship(id)    → guards deletes                        │
//! │       │                                                                 │
//! │       │  any failure                                                    │
//! │       ▼                                                                 │
//! │  DbError::Operation { "customer.search", "Erro ao pesquisar clientes" }│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each call is one round trip on a pooled connection. Nothing is cached.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::error;

use crate::error::{DbError, DbResult};
use crate::messages::MessageSource;
use crate::query;

pub mod approval;
pub mod audit;
pub mod brand;
pub mod classifier;
pub mod customer;
pub mod document;
pub mod holding;
pub mod item;
pub mod lead;
pub mod menu;
pub mod model;
pub mod partner;
pub mod person;
pub mod price_list;
pub mod price_product;
pub mod product;
pub mod proposal;
pub mod proposal_detail;
pub mod proposal_vehicle;
pub mod sale;
pub mod seller;
pub mod user;
pub mod vehicle;

pub use approval::ProposalApprovalRepository;
pub use audit::AuditRepository;
pub use brand::BrandRepository;
pub use classifier::ClassifierRepository;
pub use customer::CustomerRepository;
pub use document::DocumentRepository;
pub use holding::HoldingRepository;
pub use item::ItemRepository;
pub use lead::LeadRepository;
pub use menu::MenuRepository;
pub use model::ModelRepository;
pub use partner::PartnerRepository;
pub use person::PersonRepository;
pub use price_list::PriceListRepository;
pub use price_product::PriceProductRepository;
pub use product::ProductRepository;
pub use proposal::ProposalRepository;
pub use proposal_detail::ProposalDetailRepository;
pub use proposal_vehicle::ProposalDetailVehicleRepository;
pub use sale::SaleRepository;
pub use seller::SellerRepository;
pub use user::UserRepository;
pub use vehicle::VehicleRepository;

// =============================================================================
// Shared base
// =============================================================================

/// State every repository carries: the pool and the message source used to
/// name failed operations.
#[derive(Debug, Clone)]
pub struct RepositoryBase {
    pool: SqlitePool,
    messages: Arc<dyn MessageSource>,
}

impl RepositoryBase {
    pub fn new(pool: SqlitePool, messages: Arc<dyn MessageSource>) -> Self {
        RepositoryBase { pool, messages }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wraps `err` as the failure of `operation` and logs it.
    ///
    /// Errors that are already wrapped pass through untouched, so a
    /// repository may call another repository's public method.
    pub fn fail(&self, operation: &str, err: DbError) -> DbError {
        if matches!(err, DbError::Operation { .. }) {
            return err;
        }

        error!(operation = %operation, error = %err, "Repository operation failed");

        DbError::Operation {
            operation: operation.to_string(),
            message: self.messages.message_for(operation),
            source: Box::new(err),
        }
    }

    /// `SELECT EXISTS(...)` check for relationship guards.
    pub async fn exists(&self, sql: &str, id: i64) -> DbResult<bool> {
        query::exists(&self.pool, sql, id).await
    }
}

/// Attaches the operation name to a failed result.
///
/// ```rust,ignore
/// sqlx::query(...).execute(self.base.pool()).await
///     .in_operation(&self.base, "customer.delete")?;
/// ```
pub trait InOperation<T> {
    fn in_operation(self, base: &RepositoryBase, operation: &str) -> DbResult<T>;
}

impl<T, E: Into<DbError>> InOperation<T> for Result<T, E> {
    fn in_operation(self, base: &RepositoryBase, operation: &str) -> DbResult<T> {
        self.map_err(|e| base.fail(operation, e.into()))
    }
}

/// Rejects updates/deletes that matched no row.
pub(crate) fn expect_row(rows_affected: u64, entity: &str, id: i64) -> DbResult<()> {
    if rows_affected == 0 {
        return Err(DbError::not_found(entity, id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{BundleMessages, Locale};
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_fail_wraps_once() {
        let db = test_db().await;
        let base = RepositoryBase::new(
            db.pool().clone(),
            Arc::new(BundleMessages::new(Locale::En)),
        );

        let err = base.fail("customer.get", DbError::not_found("customer", 1));
        assert_eq!(err.to_string(), "Error fetching customer");

        let again = base.fail("proposal.save", err);
        assert_eq!(again.operation(), Some("customer.get"));
        assert!(again.is_not_found());
    }

    #[tokio::test]
    async fn test_in_operation_maps_sqlx_errors() {
        let db = test_db().await;
        let base = RepositoryBase::new(db.pool().clone(), Arc::new(BundleMessages::default()));

        let result: DbResult<i64> = sqlx::query_scalar("SELECT id FROM customer WHERE id = -1")
            .fetch_one(base.pool())
            .await
            .in_operation(&base, "customer.get");

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Erro ao buscar cliente");
        assert!(err.is_not_found());
    }
}
