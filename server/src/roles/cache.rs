//! Process-wide Role Cache
//!
//! Holds the complete active role set behind an `Arc` that is swapped as a
//! whole on refresh. Readers clone the `Arc` and keep a consistent snapshot
//! for as long as they need it; a rebuild never mutates a published set.
//!
//! Refreshes take a ticket before reading the store. A set built from an
//! older ticket is discarded if a newer one was already installed, so a
//! slow periodic refresh cannot overwrite the result of a refresh triggered
//! by a later mutation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::models::{Role, RoleId};

/// Immutable, position-sorted set of roles.
#[derive(Debug, Default)]
pub struct RoleSet {
    roles: Vec<Role>,
    by_id: HashMap<RoleId, usize>,
}

impl RoleSet {
    /// Build a set, sorting ascending by position (name breaks ties).
    #[must_use]
    pub fn new(mut roles: Vec<Role>) -> Self {
        roles.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        let by_id = roles.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        Self { roles, by_id }
    }

    #[must_use]
    pub fn get(&self, id: RoleId) -> Option<&Role> {
        self.by_id.get(&id).map(|&i| &self.roles[i])
    }

    #[must_use]
    pub fn contains(&self, id: RoleId) -> bool {
        self.by_id.contains_key(&id)
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// Roles in ascending position order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

struct Installed {
    ticket: u64,
    set: Arc<RoleSet>,
}

/// Thread-safe holder of the current [`RoleSet`].
pub struct RoleCache {
    current: RwLock<Installed>,
    next_ticket: AtomicU64,
}

impl Default for RoleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleCache {
    /// Create an empty cache. Nothing is readable until the first refresh.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Installed {
                ticket: 0,
                set: Arc::new(RoleSet::default()),
            }),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RoleSet> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard.set)
    }

    /// Reserve a ticket before loading roles from storage.
    pub fn begin_refresh(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::AcqRel)
    }

    /// Publish roles loaded under `ticket`.
    ///
    /// Returns `false` when a newer refresh already published its result.
    pub fn install(&self, ticket: u64, roles: Vec<Role>) -> bool {
        let set = Arc::new(RoleSet::new(roles));
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if ticket <= guard.ticket {
            return false;
        }
        *guard = Installed { ticket, set };
        true
    }
}
