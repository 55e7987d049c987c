//! # crm-db: Repository Layer for the CRM
//!
//! SQLite data access for customers, holdings, leads, proposals, vehicles,
//! partners, sellers, pricing and the proposal approval work list.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CRM Data Flow                                  │
//! │                                                                         │
//! │  Service layer / controllers (external)                                │
//! │       │  filter + Pageable                                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     crm-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐    │   │
//! │  │   │   Database    │   │  Repositories  │   │  Migrations  │    │   │
//! │  │   │   (pool.rs)   │   │  (one/entity)  │   │  (embedded)  │    │   │
//! │  │   │ SqlitePool    │◄──│ query.rs       │   │ 001 schema   │    │   │
//! │  │   │ MessageSource │   │ Conditions,    │   │ 002 labels   │    │   │
//! │  │   │               │   │ SortSpec, Page │   │ 003 indexes  │    │   │
//! │  │   └───────────────┘   └────────────────┘   └──────────────┘    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (CRM_DB_PATH)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Pool settings, `CRM_*` environment variables
//! - [`pool`] - Connection pool and repository accessors
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`messages`] - Localized operation failure messages
//! - [`query`] - Dynamic filter, sort and paging SQL
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crm_db::{Database, DbConfig};
//! use crm_core::{CustomerFilter, Pageable};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let filter = CustomerFilter { state: Some("SP".into()), ..Default::default() };
//! let page = db.customers().find(&filter, &Pageable::of(0, 20)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod messages;
pub mod migrations;
pub mod pool;
pub mod query;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::DbConfig;
pub use error::{ConfigError, DbError, DbResult};
pub use messages::{BundleMessages, Locale, MessageSource};
pub use pool::Database;
pub use query::MatchMode;

// Repository re-exports for convenience
pub use repository::*;
