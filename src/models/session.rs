use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tokio::sync::RwLock;

/// Signed-in user as reported by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Session issued by the external login flow
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub token: Option<String>,
}

impl Session {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User, token: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            token: Some(token.into()),
        }
    }

    /// User and bearer token, only when the session is fully authenticated
    pub fn credentials(&self) -> Option<(&User, &str)> {
        if !self.is_authenticated {
            return None;
        }
        match (&self.user, &self.token) {
            (Some(user), Some(token)) if !token.is_empty() => Some((user, token.as_str())),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials().is_some()
    }
}

/// Shared handle to the current session.
///
/// The sync layer only reads from it; the host replaces it on login/logout.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Session>>,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub async fn snapshot(&self) -> Session {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, session: Session) {
        *self.inner.write().await = session;
    }
}
