//! # Domain Types
//!
//! One struct per table plus a filter struct per searchable entity.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  party        Holding ◄── Customer      Person ◄── User                 │
//! │                               ▲           ▲  ▲                          │
//! │                               │           │  └── Partner ◄── Seller     │
//! │                          (user_customer)  └───────────────────┘         │
//! │                                                                         │
//! │  catalog      Brand ◄── Model ◄── Vehicle                              │
//! │                          ▲  ▲                                           │
//! │               Item ──────┘  └────── Product ◄── PriceProduct ──► PriceList
//! │                                                                         │
//! │  commercial   Lead ◄── Proposal ◄── ProposalDetail ◄── DetailVehicle   │
//! │                            ▲                                            │
//! │                            └── Sale, ProposalApproval                   │
//! │                                                                         │
//! │  system       Menu, Classifier, Audit, Document                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity carries an `i64` id generated by the database on insert.
//! A freshly built entity uses `id: 0`; `save` returns it with the real key.
//!
//! ## Filters
//! Filter fields are all optional. Only fields that are set (and, for text,
//! non-blank) become SQL predicates. `find` compares text with equality,
//! `search` with `LIKE '%value%'`.

pub mod catalog;
pub mod commercial;
pub mod party;
pub mod system;

pub use catalog::*;
pub use commercial::*;
pub use party::*;
pub use system::*;
