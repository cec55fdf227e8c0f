use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker written to `role`/`userRole` for administrators.
pub const ADMINISTRATOR: &str = "Administrator";

/// Role marker used by older deployments, superseded by [`ADMINISTRATOR`].
pub const LEGACY_ADMIN: &str = "admin";

/// A row of the `users` table. Role columns are stored independently and may drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Option<String>,
    pub user_role: Option<String>,
    pub employee_role: Option<String>,
    pub status: Option<String>,
}

impl UserRecord {
    pub fn role_pair(&self) -> RolePair {
        RolePair {
            role: self.role.clone(),
            user_role: self.user_role.clone(),
        }
    }
}

/// The `(role, userRole)` pair of a record. `None` is SQL NULL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RolePair {
    pub role: Option<String>,
    pub user_role: Option<String>,
}

impl RolePair {
    pub fn new(role: Option<&str>, user_role: Option<&str>) -> Self {
        Self {
            role: role.map(str::to_string),
            user_role: user_role.map(str::to_string),
        }
    }

    /// True when either side is the legacy `admin` literal, any casing.
    pub fn has_legacy_admin(&self) -> bool {
        [&self.role, &self.user_role]
            .into_iter()
            .flatten()
            .any(|v| is_legacy_admin(v))
    }

    /// True when either side marks the user as an administrator.
    pub fn indicates_administrator(&self) -> bool {
        [&self.role, &self.user_role]
            .into_iter()
            .flatten()
            .any(|v| is_legacy_admin(v) || v.eq_ignore_ascii_case(ADMINISTRATOR))
    }

    pub fn is_consistent(&self) -> bool {
        self.role == self.user_role && !self.has_legacy_admin()
    }

    /// The pair this one should be rewritten to.
    ///
    /// Administrators collapse to `Administrator` on both sides. Otherwise
    /// `role` is authoritative, unless it is unset and `userRole` is not.
    pub fn aligned(&self) -> RolePair {
        if self.indicates_administrator() {
            return RolePair::new(Some(ADMINISTRATOR), Some(ADMINISTRATOR));
        }
        let source = match (&self.role, &self.user_role) {
            (Some(r), _) if !r.is_empty() => Some(r.clone()),
            (_, Some(u)) if !u.is_empty() => Some(u.clone()),
            (r, _) => r.clone(),
        };
        RolePair {
            role: source.clone(),
            user_role: source,
        }
    }
}

/// Renders as `role/userRole`, with `NULL` and `''` spelled out.
impl fmt::Display for RolePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn side(value: &Option<String>) -> &str {
            match value.as_deref() {
                None => "NULL",
                Some("") => "''",
                Some(v) => v,
            }
        }
        write!(f, "{}/{}", side(&self.role), side(&self.user_role))
    }
}

pub fn is_legacy_admin(value: &str) -> bool {
    value.eq_ignore_ascii_case(LEGACY_ADMIN)
}
