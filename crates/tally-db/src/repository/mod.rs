//! # Repository Layer
//!
//! Read-side database access, one repository per aggregate.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Repository vs Service                               │
//! │                                                                         │
//! │  Repositories (this module)          Services (crate::service)         │
//! │  ──────────────────────────          ──────────────────────────        │
//! │  • Pool-based, single statements     • Transaction-based               │
//! │  • Read projections for reporting    • Multi-entity mutations          │
//! │  • Never mutate ledger state         • Own the ledger invariants       │
//! │                                                                         │
//! │  Reporting collaborators consume repositories only; they can never     │
//! │  mutate the ledger by construction.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod movement;
pub mod party;
pub mod product;
pub mod purchase;
pub mod sale;

use uuid::Uuid;

/// Generates a new entity id (UUID v4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
