/// Principal realm resolution
///
/// Every request is governed by exactly one realm, derived from the
/// request path before any token is inspected: the verification secret
/// is chosen by realm, so claims are not yet available at resolution
/// time. Admin-scoped routes must therefore be mounted under
/// `/admin/...` for resolution to be correct.
use serde::{Deserialize, Serialize};

/// One of the two disjoint authentication/authorization domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    Admin,
    User,
}

impl Realm {
    /// Resolve the realm governing a request path. The first
    /// non-empty segment being literally "admin" selects the admin
    /// realm; anything else is the user realm.
    pub fn from_path(path: &str) -> Realm {
        match path.split('/').find(|segment| !segment.is_empty()) {
            Some("admin") => Realm::Admin,
            _ => Realm::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Realm::Admin => "admin",
            Realm::User => "user",
        }
    }
}

impl std::fmt::Display for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
