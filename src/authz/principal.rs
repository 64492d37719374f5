use std::fmt;

use super::scopes::{Scope, ScopeSet};

/// Who is making a request, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A user uuid from the `requesting_uuid` header.
    User(String),
    /// A raw key from the legacy `api_key` header.
    ApiKey(String),
}

impl Identity {
    pub fn user_uuid(&self) -> Option<&str> {
        match self {
            Identity::User(uuid) => Some(uuid),
            Identity::ApiKey(_) => None,
        }
    }

    /// True when this identity is the given user.
    pub fn is_user(&self, user_uuid: &str) -> bool {
        self.user_uuid() == Some(user_uuid)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::User(uuid) => f.write_str(uuid),
            // never print the key itself
            Identity::ApiKey(_) => f.write_str("api-key"),
        }
    }
}

/// An identity together with its resolved scopes.
#[derive(Debug, Clone)]
pub struct Principal {
    pub identity: Identity,
    pub scopes: ScopeSet,
}

impl Principal {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            scopes: ScopeSet::new(),
        }
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(scope)
    }

    pub fn is_admin(&self) -> bool {
        self.scopes.is_admin()
    }
}
