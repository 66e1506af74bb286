//! Role resolution boundary. The core only ever asks one question: is this
//! email an admin? Creator privileges are derived from the scrim document
//! itself, not from here.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

pub trait RoleProvider: Send + Sync {
    fn role_of(&self, email: &str) -> Role;
}

/// Fixed admin set, resolved at construction. Suits deployments where the
/// admin list comes from configuration, and doubles as the test double.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleProvider {
    admins: HashSet<String>,
}

impl StaticRoleProvider {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { admins: admins.into_iter().map(Into::into).collect() }
    }

    pub fn no_admins() -> Self {
        Self::default()
    }
}

impl RoleProvider for StaticRoleProvider {
    fn role_of(&self, email: &str) -> Role {
        if self.admins.contains(email) {
            Role::Admin
        } else {
            Role::Member
        }
    }
}
