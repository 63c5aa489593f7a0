use std::time::Duration;

use anyhow::Context;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::{Identity, TokenClaims, TokenKind};
use crate::config::AuthConfig;

/// Why a credential could not be turned into claims.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Signature and structure check out but `exp` has passed. The stale,
    /// signature-verified claims are kept for the pair comparison.
    #[error("credential expired")]
    Expired(Box<TokenClaims>),
    #[error("credential invalid")]
    Invalid,
}

/// Access and refresh credentials minted together at login.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies HS256 credentials with the process-wide secret.
#[derive(Clone)]
pub struct CredentialCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl CredentialCodec {
    pub fn new(cfg: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by hand so that "expired" keeps its claims.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        validation.set_audience(std::slice::from_ref(&cfg.audience));

        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: minutes(cfg.ttl_minutes),
            refresh_ttl: minutes(cfg.refresh_ttl_minutes),
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    pub(crate) fn sign_at(
        &self,
        identity: &Identity,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let exp = i64::try_from(self.ttl(kind).as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .with_context(|| format!("{kind:?} expiry is out of range"))?;
        let claims = TokenClaims {
            name: Some(identity.name.clone()),
            email: Some(identity.email.clone()),
            role: Some(identity.role),
            id: identity.id.clone(),
            kind,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(name = %identity.name, kind = ?kind, "jwt signed");
        Ok(token)
    }

    /// Signs `identity` with a fresh expiry of now + the TTL for `kind`.
    pub fn encode(&self, identity: &Identity, kind: TokenKind) -> anyhow::Result<String> {
        self.sign_at(identity, kind, OffsetDateTime::now_utc())
    }

    pub fn sign_access(&self, identity: &Identity) -> anyhow::Result<String> {
        self.encode(identity, TokenKind::Access)
    }

    pub fn sign_refresh(&self, identity: &Identity) -> anyhow::Result<String> {
        self.encode(identity, TokenKind::Refresh)
    }

    pub fn issue_pair(&self, identity: &Identity) -> anyhow::Result<IssuedPair> {
        Ok(IssuedPair {
            access_token: self.sign_access(identity)?,
            refresh_token: self.sign_refresh(identity)?,
        })
    }

    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, DecodeError> {
        self.decode_at(token, expected, OffsetDateTime::now_utc())
    }

    pub(crate) fn decode_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: OffsetDateTime,
    ) -> Result<TokenClaims, DecodeError> {
        let claims = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!(error = %e, kind = ?expected, "jwt rejected");
                DecodeError::Invalid
            })?
            .claims;

        if claims.kind != expected {
            debug!(expected = ?expected, found = ?claims.kind, "jwt kind mismatch");
            return Err(DecodeError::Invalid);
        }

        if claims.exp <= now.unix_timestamp() {
            debug!(kind = ?expected, exp = claims.exp, "jwt expired");
            return Err(DecodeError::Expired(Box::new(claims)));
        }

        debug!(kind = ?expected, "jwt verified");
        Ok(claims)
    }
}

fn minutes(value: i64) -> Duration {
    Duration::from_secs(u64::try_from(value).unwrap_or(0).saturating_mul(60))
}
