use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::storage::Storage;

pub const ROLE_KEY: &str = "user_role";
pub const IDENTITY_KEY: &str = "user_identity";

/// Coarse authorization level. Unauthenticated sessions carry no role at
/// all (`Session::role == None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Employee => "employee",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "guest" => Some(Role::Guest),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

/// Current authentication state. Invariant: `identity` is `Some` only when
/// `role == Some(Employee)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub role: Option<Role>,
    pub identity: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.role.is_some()
    }

    pub fn is_employee(&self) -> bool {
        self.role == Some(Role::Employee)
    }
}

/// The screens a user can request. Mirrors the original client's routes:
/// login is public, chat needs any role, upload is employee-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Chat,
    Upload,
}

/// Route guard decision. Pure and synchronous; navigation itself is the
/// caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Allow,
    /// Not authenticated: go to Login, remembering where the user wanted
    /// to go so a successful login can land there.
    RedirectToLogin { wanted: Screen },
    /// Authenticated but not authorized (guest asking for Upload): fall
    /// back to Chat.
    RedirectToChat,
}

/// Holds the session, persists every change, and notifies subscribers
/// through a watch channel. This is the explicit injectable store the
/// original kept as ambient React context.
pub struct SessionStore {
    session: Session,
    storage: Storage,
    tx: watch::Sender<Session>,
}

impl SessionStore {
    /// Restore the session from storage. Absent or unparseable entries mean
    /// unauthenticated. A persisted employee role without an identity
    /// violates the invariant and is also treated as unauthenticated.
    pub fn load(storage: Storage) -> Self {
        let role = storage.get(ROLE_KEY).and_then(|s| Role::from_str(s.trim()));
        let identity = storage
            .get(IDENTITY_KEY)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let session = match (role, identity) {
            (Some(Role::Employee), Some(identity)) => Session {
                role: Some(Role::Employee),
                identity: Some(identity),
            },
            (Some(Role::Guest), _) => Session {
                role: Some(Role::Guest),
                identity: None,
            },
            _ => Session::default(),
        };

        let (tx, _) = watch::channel(session.clone());
        Self { session, storage, tx }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn login_as_guest(&mut self) {
        self.session = Session {
            role: Some(Role::Guest),
            identity: None,
        };
        self.persist();
        self.notify();
    }

    pub fn login_as_employee(&mut self, identity: &str) {
        self.session = Session {
            role: Some(Role::Employee),
            identity: Some(identity.to_string()),
        };
        self.persist();
        self.notify();
    }

    pub fn logout(&mut self) {
        self.session = Session::default();
        self.storage.remove(ROLE_KEY);
        self.storage.remove(IDENTITY_KEY);
        self.notify();
    }

    /// Decide whether the current session may see `wanted`.
    pub fn guard(&self, wanted: Screen) -> RouteOutcome {
        match wanted {
            Screen::Login => RouteOutcome::Allow,
            Screen::Chat => {
                if self.session.is_authenticated() {
                    RouteOutcome::Allow
                } else {
                    RouteOutcome::RedirectToLogin { wanted }
                }
            }
            Screen::Upload => {
                if self.session.is_employee() {
                    RouteOutcome::Allow
                } else if self.session.is_authenticated() {
                    RouteOutcome::RedirectToChat
                } else {
                    RouteOutcome::RedirectToLogin { wanted }
                }
            }
        }
    }

    fn persist(&self) {
        match self.session.role {
            Some(role) => self.storage.set(ROLE_KEY, role.as_str()),
            None => self.storage.remove(ROLE_KEY),
        }
        match &self.session.identity {
            Some(identity) => self.storage.set(IDENTITY_KEY, identity),
            None => self.storage.remove(IDENTITY_KEY),
        }
    }

    fn notify(&self) {
        // Receivers may all have been dropped; that's fine.
        let _ = self.tx.send(self.session.clone());
    }
}
