//! Per-user serialization of balance-gated writes.
//!
//! The overdraft check is a read-then-write sequence over the durable
//! ledger, so two concurrent expense admissions for the same user must not
//! interleave between the balance read and the insert. Each user gets one
//! async mutex, held across the whole sequence. Users never contend with
//! each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

/// Registry handing out one admission lock per user id.
///
/// Entries are two pointers each and there is one per user ever seen by this
/// process, so the map is never evicted.
#[derive(Debug, Default)]
pub(crate) struct UserLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    /// Returns the admission lock for `user_id`, creating it on first use.
    pub(crate) fn lock_for(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(user_id.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_user_gets_same_lock() {
        let locks = UserLocks::default();
        let first = locks.lock_for("alice");
        let again = locks.lock_for("alice");
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn users_do_not_share_locks() {
        let locks = UserLocks::default();
        let alice = locks.lock_for("alice");
        let bob = locks.lock_for("bob");
        assert!(!Arc::ptr_eq(&alice, &bob));
    }
}
