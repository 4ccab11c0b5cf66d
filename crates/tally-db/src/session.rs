//! # Session and Access Collaborators
//!
//! The ledger does not implement authentication or permission management
//! itself; it consumes them as collaborators. Every mutating operation
//! requires an authenticated actor id, resolved up front so that a missing
//! session fails fast before any transaction opens. Sensitive bulk paths
//! (backup/restore, bulk import) additionally consult an [`AccessPolicy`].

use crate::error::{LedgerError, LedgerResult};

// =============================================================================
// Session
// =============================================================================

/// An (optionally) authenticated caller.
///
/// Constructed by whatever authentication layer fronts the engine - an HTTP
/// middleware, a desktop shell, a test fixture. The ledger only cares about
/// the actor id recorded on movements, adjustments and payments.
#[derive(Debug, Clone)]
pub struct Session {
    actor_id: Option<String>,
}

impl Session {
    /// A session with an authenticated actor.
    pub fn authenticated(actor_id: impl Into<String>) -> Self {
        Session {
            actor_id: Some(actor_id.into()),
        }
    }

    /// A session with no authenticated actor.
    pub fn anonymous() -> Self {
        Session { actor_id: None }
    }

    /// Returns the actor id, or `Authentication` if there is no session.
    ///
    /// Called first in every mutating service, before any transaction opens,
    /// so an unauthenticated call never has a side effect.
    pub fn require_actor(&self) -> LedgerResult<&str> {
        self.actor_id
            .as_deref()
            .ok_or(LedgerError::Authentication)
    }
}

// =============================================================================
// Access Policy
// =============================================================================

/// Boolean capability check gating sensitive bulk paths.
///
/// The engine asks `allows(module, action)` before backup/restore and bulk
/// import; everything else is authenticated-only. Implementations live with
/// the caller (role tables, config files, test stubs).
pub trait AccessPolicy: Send + Sync {
    fn allows(&self, module: &str, action: &str) -> bool;
}

/// Policy that grants every capability. Useful for single-operator
/// deployments and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn allows(&self, _module: &str, _action: &str) -> bool {
        true
    }
}

/// Policy that denies every capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl AccessPolicy for DenyAll {
    fn allows(&self, _module: &str, _action: &str) -> bool {
        false
    }
}

/// Checks a capability, mapping a denial to `Authorization`.
pub fn require_capability(
    policy: &dyn AccessPolicy,
    module: &str,
    action: &str,
) -> LedgerResult<()> {
    if policy.allows(module, action) {
        Ok(())
    } else {
        Err(LedgerError::Authorization {
            module: module.to_string(),
            action: action.to_string(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_session_fails_fast() {
        let session = Session::anonymous();
        assert!(matches!(
            session.require_actor(),
            Err(LedgerError::Authentication)
        ));
    }

    #[test]
    fn test_authenticated_session_yields_actor() {
        let session = Session::authenticated("admin");
        assert_eq!(session.require_actor().unwrap(), "admin");
    }

    #[test]
    fn test_capability_check() {
        assert!(require_capability(&AllowAll, "backup", "restore").is_ok());
        let err = require_capability(&DenyAll, "backup", "restore").unwrap_err();
        assert!(matches!(err, LedgerError::Authorization { .. }));
    }
}
