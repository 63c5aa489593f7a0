use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::claims::{Identity, Role};

/// What a route requires of the caller.
///
/// The set is closed: a capability arriving from configuration or a route
/// table with an unknown tag fails to deserialize and can never allow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Capability {
    Any,
    AdminOnly,
    /// Exact identity name, regular role only. Admins are not owners.
    OwnerOnly(String),
    MemberOf(BTreeSet<String>),
}

impl Capability {
    pub fn owner(name: impl Into<String>) -> Self {
        Capability::OwnerOnly(name.into())
    }

    pub fn member_of<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Capability::MemberOf(emails.into_iter().map(Into::into).collect())
    }

    pub fn permits(&self, identity: &Identity) -> bool {
        evaluate(identity, self)
    }
}

/// Decides whether verified claims satisfy `capability`.
pub fn evaluate(identity: &Identity, capability: &Capability) -> bool {
    match capability {
        Capability::Any => true,
        Capability::AdminOnly => identity.role == Role::Admin,
        Capability::OwnerOnly(name) => identity.role == Role::Regular && identity.name == *name,
        Capability::MemberOf(emails) => emails.contains(&identity.email),
    }
}
