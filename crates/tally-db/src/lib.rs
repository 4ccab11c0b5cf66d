//! # tally-db: Ledger Engine for the Tally Back-Office
//!
//! This crate owns all database access for the Tally back-office. It keeps
//! per-product stock quantities, cost history, counterparty credit balances
//! and sale/purchase payment status mutually consistent, one SQLite
//! transaction per mutating operation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tally Back-Office Data Flow                        │
//! │                                                                         │
//! │  Caller (HTTP handler, desktop shell, importer)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐  │   │
//! │  │   │   service    │   │  repository   │   │    Database      │  │   │
//! │  │   │ one tx per   │   │  read-only    │   │  (pool.rs)       │  │   │
//! │  │   │ mutation:    │   │  projections: │   │                  │  │   │
//! │  │   │ purchases    │──►│ overview,     │◄──│  SqlitePool      │  │   │
//! │  │   │ sales        │   │ history,      │   │  WAL, FKs,       │  │   │
//! │  │   │ settlement   │   │ debtors       │   │  migrations      │  │   │
//! │  │   │ adjustments  │   │               │   │                  │  │   │
//! │  │   └──────────────┘   └───────────────┘   └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (single store, single location)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Error taxonomy ([`DbError`], [`LedgerError`])
//! - [`session`] - Auth/permission collaborators
//! - [`repository`] - Read projections (never mutate)
//! - [`service`] - Transactional ledger operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig, Session};
//! use tally_db::service::sale::{record_sale, RecordSaleInput};
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//! let session = Session::authenticated("admin");
//!
//! let sale = record_sale(&db, &session, RecordSaleInput {
//!     customer_id: None, // walk-in
//!     items: vec![],
//!     paid_amount_cents: Some(500),
//!     payment_method: None,
//!     notes: None,
//! }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};
pub use session::{require_capability, AccessPolicy, AllowAll, DenyAll, Session};

// Repository re-exports for convenience
pub use repository::movement::MovementRepository;
pub use repository::party::PartyRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::SaleRepository;
