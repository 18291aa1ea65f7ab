//! Bearer-token sessions.
//!
//! Tokens are opaque UUID v4 values mapped to a [`Principal`] in memory.
//! Sessions are issued by an admin through the API, or installed at startup
//! for the bootstrap admin token. Restarting the process drops them all.

use campus_ledger_core::Principal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory session directory.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    sessions: RwLock<HashMap<Uuid, Principal>>,
}

impl SessionDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding a single admin session under `token`.
    #[must_use]
    pub fn with_admin_token(token: Uuid) -> Self {
        let mut sessions = HashMap::new();
        sessions.insert(token, Principal::admin());
        Self {
            sessions: RwLock::new(sessions),
        }
    }

    /// Issue a fresh token for `principal`.
    pub async fn issue(&self, principal: Principal) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.write().await.insert(token, principal);
        metrics::gauge!("ledger.sessions.active").increment(1.0);
        tracing::info!(role = %principal.role(), "Session issued");
        token
    }

    /// Principal behind `token`, if the session exists.
    pub async fn resolve(&self, token: &Uuid) -> Option<Principal> {
        self.sessions.read().await.get(token).copied()
    }

    /// Remove a session. Returns whether it existed.
    pub async fn revoke(&self, token: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(token).is_some();
        if removed {
            metrics::gauge!("ledger.sessions.active").decrement(1.0);
            tracing::info!("Session revoked");
        }
        removed
    }
}
