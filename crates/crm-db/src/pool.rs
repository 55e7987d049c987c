//! # Database Pool Management
//!
//! Connection pool creation and repository access.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Service startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::from_env() ← CRM_DB_PATH, CRM_LOCALE ...                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.customers() / db.proposals() / db.approvals() ...                  │
//! │  (each repository call borrows one connection for one round trip)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so readers don't block
//! writers and writers don't block readers.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::messages::{BundleMessages, MessageSource};
use crate::migrations;
use crate::repository::*;

/// Main database handle providing repository access.
///
/// Cheap to clone: the pool and the message source are reference counted.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env()?).await?;
///
/// let page = db
///     .customers()
///     .search(&CustomerFilter { name: Some("silva".into()), ..Default::default() }, &Pageable::default())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Resolves operation names into failure messages.
    messages: Arc<dyn MessageSource>,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Enables WAL, NORMAL synchronous and foreign keys
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    /// 5. Loads the message bundle for `config.locale`
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            locale = ?config.locale,
            "Database pool created"
        );

        let db = Database {
            pool,
            messages: Arc::new(BundleMessages::new(config.locale)),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Replaces the built-in message bundles.
    pub fn with_messages(mut self, messages: Arc<dyn MessageSource>) -> Self {
        self.messages = messages;
        self
    }

    /// Runs database migrations.
    ///
    /// Idempotent. Called by `new()` unless `run_migrations` is off.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For callers that need their own transaction or an ad-hoc query.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn messages(&self) -> &Arc<dyn MessageSource> {
        &self.messages
    }

    fn base(&self) -> RepositoryBase {
        RepositoryBase::new(self.pool.clone(), Arc::clone(&self.messages))
    }

    // -------------------------------------------------------------------------
    // Parties
    // -------------------------------------------------------------------------

    pub fn holdings(&self) -> HoldingRepository {
        HoldingRepository::new(self.base())
    }

    /// Returns the customer repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let customer = db.customers().get_by_id(42).await?;
    /// ```
    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.base())
    }

    pub fn people(&self) -> PersonRepository {
        PersonRepository::new(self.base())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.base())
    }

    pub fn partners(&self) -> PartnerRepository {
        PartnerRepository::new(self.base())
    }

    pub fn sellers(&self) -> SellerRepository {
        SellerRepository::new(self.base())
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    pub fn brands(&self) -> BrandRepository {
        BrandRepository::new(self.base())
    }

    pub fn models(&self) -> ModelRepository {
        ModelRepository::new(self.base())
    }

    pub fn vehicles(&self) -> VehicleRepository {
        VehicleRepository::new(self.base())
    }

    pub fn items(&self) -> ItemRepository {
        ItemRepository::new(self.base())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.base())
    }

    pub fn price_lists(&self) -> PriceListRepository {
        PriceListRepository::new(self.base())
    }

    pub fn price_products(&self) -> PriceProductRepository {
        PriceProductRepository::new(self.base())
    }

    // -------------------------------------------------------------------------
    // Commercial flow
    // -------------------------------------------------------------------------

    pub fn leads(&self) -> LeadRepository {
        LeadRepository::new(self.base())
    }

    pub fn proposals(&self) -> ProposalRepository {
        ProposalRepository::new(self.base())
    }

    pub fn proposal_details(&self) -> ProposalDetailRepository {
        ProposalDetailRepository::new(self.base())
    }

    pub fn proposal_vehicles(&self) -> ProposalDetailVehicleRepository {
        ProposalDetailVehicleRepository::new(self.base())
    }

    /// Returns the approval work-list repository.
    pub fn approvals(&self) -> ProposalApprovalRepository {
        ProposalApprovalRepository::new(self.base())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.base())
    }

    // -------------------------------------------------------------------------
    // Supporting tables
    // -------------------------------------------------------------------------

    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.base())
    }

    pub fn menus(&self) -> MenuRepository {
        MenuRepository::new(self.base())
    }

    pub fn classifiers(&self) -> ClassifierRepository {
        ClassifierRepository::new(self.base())
    }

    pub fn audits(&self) -> AuditRepository {
        AuditRepository::new(self.base())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
