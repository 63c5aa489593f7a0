use serde::{Deserialize, Serialize};

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// Role carried by both credentials of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Regular,
}

/// JWT payload as decoded from the wire.
///
/// Identity fields stay optional here so that an incomplete token can be
/// told apart from a forged one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: TokenKind, // access or refresh
    pub iat: i64,        // issued at (unix timestamp)
    pub exp: i64,        // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}

impl TokenClaims {
    /// Complete identity, or `None` when name, email or role is absent.
    pub fn identity(&self) -> Option<Identity> {
        let name = self.name.as_deref().filter(|s| !s.is_empty())?;
        let email = self.email.as_deref().filter(|s| !s.is_empty())?;
        let role = self.role?;
        Some(Identity {
            name: name.to_owned(),
            email: email.to_owned(),
            role,
            id: self.id.clone(),
        })
    }

    /// Lifetime the credential was issued with.
    pub fn ttl_secs(&self) -> i64 {
        self.exp - self.iat
    }
}

/// Verified identity of the caller, built only from complete claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Name, email and role agree; the optional id is not part of the identity.
    pub fn same_principal(&self, other: &Identity) -> bool {
        self.name == other.name && self.email == other.email && self.role == other.role
    }
}
