//! # crm-core: Domain Types for the CRM Data Layer
//!
//! Entities, classifier enums, filters and paging descriptors shared by the
//! repositories in `crm-db` and by whatever service layer calls them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CRM Data Layer                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Service layer / controllers (external)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CustomerFilter, Pageable              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ crm-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   enums   │  │   page    │  │ validation│  │   │
//! │  │   │ Customer  │  │ Proposal- │  │ Pageable  │  │ CPF/CNPJ  │  │   │
//! │  │   │ Proposal  │  │  Status   │  │ Page<T>   │  │ VIN/plate │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    crm-db (repositories)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities and their filter structs
//! - [`enums`] - Sum types replacing the generic classifier lookups
//! - [`page`] - Pagination and sort descriptors
//! - [`money`] - Integer-cent money type
//! - [`validation`] - Field validators run before writes
//! - [`error`] - Domain error types

pub mod enums;
pub mod error;
pub mod money;
pub mod page;
pub mod types;
pub mod validation;

pub use enums::*;
pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use page::{Direction, Page, Pageable, Sort};
pub use types::*;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Upper bound for vehicles of one model in a single proposal line.
pub const MAX_LINE_QUANTITY: i64 = 500;
