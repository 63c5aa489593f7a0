use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, error, warn};

use super::capability::{evaluate, Capability};
use super::claims::{Identity, TokenKind};
use super::codec::{CredentialCodec, DecodeError};
use super::pair::{validate_pair, PairError};
use super::renewal::{attempt_renewal_at, RenewalError, RenewedCredential};
use crate::config::AuthConfig;

/// Stable, machine-checkable outcome tag of one authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Authorized,
    CredentialsMissing,
    CredentialsInvalid,
    ClaimsIncomplete,
    IdentityMismatch,
    ReauthenticationRequired,
    CapabilityDenied,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Authorized => "authorized",
            Reason::CredentialsMissing => "credentials_missing",
            Reason::CredentialsInvalid => "credentials_invalid",
            Reason::ClaimsIncomplete => "claims_incomplete",
            Reason::IdentityMismatch => "identity_mismatch",
            Reason::ReauthenticationRequired => "reauthentication_required",
            Reason::CapabilityDenied => "capability_denied",
        }
    }

    fn message(self) -> &'static str {
        match self {
            Reason::Authorized => "authorized",
            Reason::CredentialsMissing => "credentials missing",
            Reason::CredentialsInvalid => "credentials invalid",
            Reason::ClaimsIncomplete => "credential claims incomplete",
            Reason::IdentityMismatch => "credentials describe different identities",
            Reason::ReauthenticationRequired => "re-authentication required",
            Reason::CapabilityDenied => "insufficient permissions",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<PairError> for Reason {
    fn from(e: PairError) -> Self {
        match e {
            PairError::MissingClaims => Reason::ClaimsIncomplete,
            PairError::MismatchedIdentity => Reason::IdentityMismatch,
        }
    }
}

/// The two raw credentials found on a request.
#[derive(Debug, Clone, Default)]
pub struct PresentedCredentials {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl PresentedCredentials {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: Some(refresh.into()),
        }
    }

    fn both(&self) -> Option<(&str, &str)> {
        let access = self.access.as_deref().filter(|s| !s.is_empty())?;
        let refresh = self.refresh.as_deref().filter(|s| !s.is_empty())?;
        Some((access, refresh))
    }
}

/// Result of [`CredentialVerifier::check_authorization`].
#[derive(Debug, Clone)]
pub struct AuthorizationDecision {
    pub authorized: bool,
    pub reason: Reason,
    /// Caller identity whenever authentication succeeded, even if the
    /// capability was then denied.
    pub identity: Option<Identity>,
    /// Present only when the access credential was renewed on this request.
    pub renewed: Option<RenewedCredential>,
}

impl AuthorizationDecision {
    fn reject(reason: Reason) -> Self {
        Self {
            authorized: false,
            reason,
            identity: None,
            renewed: None,
        }
    }
}

/// Single entry point every route goes through.
///
/// Holds nothing but immutable keys, so one instance is shared by all
/// requests.
#[derive(Clone)]
pub struct CredentialVerifier {
    codec: CredentialCodec,
}

impl CredentialVerifier {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            codec: CredentialCodec::new(cfg),
        }
    }

    pub fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    pub fn check_authorization(
        &self,
        presented: &PresentedCredentials,
        capability: &Capability,
    ) -> AuthorizationDecision {
        self.check_at(presented, capability, OffsetDateTime::now_utc())
    }

    pub(crate) fn check_at(
        &self,
        presented: &PresentedCredentials,
        capability: &Capability,
        now: OffsetDateTime,
    ) -> AuthorizationDecision {
        let Some((access_token, refresh_token)) = presented.both() else {
            warn!(reason = Reason::CredentialsMissing.as_str(), "authorization rejected");
            return AuthorizationDecision::reject(Reason::CredentialsMissing);
        };

        let (identity, renewed) = match self.authenticate(access_token, refresh_token, now) {
            Ok(authenticated) => authenticated,
            Err(reason) => {
                warn!(reason = reason.as_str(), "authorization rejected");
                return AuthorizationDecision::reject(reason);
            }
        };

        let authorized = evaluate(&identity, capability);
        let reason = if authorized {
            debug!(name = %identity.name, renewed = renewed.is_some(), "authorized");
            Reason::Authorized
        } else {
            warn!(
                name = %identity.name,
                role = ?identity.role,
                capability = ?capability,
                "capability denied"
            );
            Reason::CapabilityDenied
        };

        AuthorizationDecision {
            authorized,
            reason,
            identity: Some(identity),
            renewed,
        }
    }

    fn authenticate(
        &self,
        access_token: &str,
        refresh_token: &str,
        now: OffsetDateTime,
    ) -> Result<(Identity, Option<RenewedCredential>), Reason> {
        match self.codec.decode_at(access_token, TokenKind::Access, now) {
            Ok(access) => {
                let refresh = self
                    .codec
                    .decode_at(refresh_token, TokenKind::Refresh, now)
                    .map_err(|_| Reason::CredentialsInvalid)?;
                let identity = validate_pair(&access, &refresh)?;
                Ok((identity, None))
            }
            Err(DecodeError::Invalid) => Err(Reason::CredentialsInvalid),
            Err(DecodeError::Expired(stale)) => {
                let renewal =
                    attempt_renewal_at(&self.codec, refresh_token, now).map_err(|e| match e {
                        RenewalError::RefreshExpired => Reason::ReauthenticationRequired,
                        RenewalError::RefreshInvalid => Reason::CredentialsInvalid,
                        RenewalError::ClaimsIncomplete => Reason::ClaimsIncomplete,
                        RenewalError::Mint(err) => {
                            error!(error = %err, "access credential renewal failed");
                            Reason::CredentialsInvalid
                        }
                    })?;
                // The expired access credential must still belong to the
                // refresh credential's owner.
                validate_pair(&stale, &renewal.claims)?;
                let identity = renewal.claims.identity().ok_or(Reason::ClaimsIncomplete)?;
                Ok((identity, Some(renewal.credential)))
            }
        }
    }
}
