//! Single cached source of truth for the user's role
//!
//! Every view reads the role from one [`RoleCache`] instead of fetching it
//! independently, so two views can never disagree about it.

use crate::api::{ApiError, PatronApi};
use crate::types::{RoleKind, UserRole};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RoleCache {
    tx: Arc<watch::Sender<Option<UserRole>>>,
}

impl Default for RoleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleCache {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Last known role, `None` until the first fetch
    pub fn current(&self) -> Option<UserRole> {
        self.tx.borrow().clone()
    }

    pub fn role_kind(&self) -> RoleKind {
        self.tx.borrow().as_ref().map(|r| r.role).unwrap_or_default()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserRole>> {
        self.tx.subscribe()
    }

    /// Replace the cached role; last write wins
    pub fn set(&self, role: UserRole) {
        self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&role) {
                return false;
            }
            info!(role = %role.role, status = ?role.status, "Role updated");
            *current = Some(role);
            true
        });
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Fetch the role from the backend and publish it
    pub async fn refresh(&self, api: &PatronApi) -> Result<UserRole, ApiError> {
        let role = api.role().await.into_result()?;
        debug!(role = %role.role, "Role fetched");
        self.set(role.clone());
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_notifies_subscribers_once() {
        let cache = RoleCache::new();
        let mut rx = cache.subscribe();
        assert_eq!(cache.role_kind(), RoleKind::None);

        let role = UserRole {
            role: RoleKind::Staker,
            ..UserRole::default()
        };
        cache.set(role.clone());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&role));

        // Same value again is not a change
        cache.set(role);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(cache.role_kind(), RoleKind::Staker);
    }

    #[test]
    fn test_clones_share_state() {
        let cache = RoleCache::new();
        let other = cache.clone();
        other.set(UserRole {
            role: RoleKind::Patron,
            ..UserRole::default()
        });
        assert_eq!(cache.role_kind(), RoleKind::Patron);
        cache.clear();
        assert!(other.current().is_none());
    }
}
