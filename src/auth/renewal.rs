use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use super::claims::{TokenClaims, TokenKind};
use super::codec::{CredentialCodec, DecodeError};

/// Freshly minted access credential the transport must hand back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewedCredential {
    pub token: String,
    pub max_age: Duration,
}

/// Successful renewal: the new credential and its decoded claims.
#[derive(Debug, Clone)]
pub struct Renewal {
    pub credential: RenewedCredential,
    pub claims: TokenClaims,
}

#[derive(Debug, Error)]
pub enum RenewalError {
    #[error("refresh credential expired")]
    RefreshExpired,
    #[error("refresh credential invalid")]
    RefreshInvalid,
    #[error("refresh credential lacks name, email or role")]
    ClaimsIncomplete,
    #[error("failed to mint access credential: {0}")]
    Mint(anyhow::Error),
}

/// Mints a new access credential from a still-valid refresh credential.
///
/// Only called once the access credential has been found expired. The new
/// credential copies the refresh identity and always lives for the access TTL.
pub fn attempt_renewal(
    codec: &CredentialCodec,
    refresh_token: &str,
) -> Result<Renewal, RenewalError> {
    attempt_renewal_at(codec, refresh_token, OffsetDateTime::now_utc())
}

pub(crate) fn attempt_renewal_at(
    codec: &CredentialCodec,
    refresh_token: &str,
    now: OffsetDateTime,
) -> Result<Renewal, RenewalError> {
    let refresh = codec
        .decode_at(refresh_token, TokenKind::Refresh, now)
        .map_err(|e| match e {
            DecodeError::Expired(_) => RenewalError::RefreshExpired,
            DecodeError::Invalid => RenewalError::RefreshInvalid,
        })?;
    let identity = refresh.identity().ok_or(RenewalError::ClaimsIncomplete)?;

    let token = codec
        .sign_at(&identity, TokenKind::Access, now)
        .map_err(RenewalError::Mint)?;
    let claims = codec
        .decode_at(&token, TokenKind::Access, now)
        .map_err(|e| RenewalError::Mint(e.into()))?;

    debug!(name = %identity.name, "access credential renewed");
    Ok(Renewal {
        credential: RenewedCredential {
            token,
            max_age: codec.access_ttl,
        },
        claims,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{Identity, Role};
    use crate::auth::test_support::{codec, hours_ago};

    fn carol() -> Identity {
        Identity::new("carol", "carol@x.com", Role::Regular)
    }

    #[test]
    fn renewal_copies_refresh_identity_with_access_ttl() {
        let codec = codec("renew");
        // Issued six days ago: one day of refresh life left.
        let refresh = codec
            .sign_at(&carol(), TokenKind::Refresh, hours_ago(6 * 24))
            .expect("sign");
        let renewal = attempt_renewal(&codec, &refresh).expect("renewed");

        assert_eq!(renewal.claims.identity(), Some(carol()));
        assert_eq!(renewal.claims.kind, TokenKind::Access);
        assert_eq!(renewal.claims.ttl_secs(), 3600);
        assert_eq!(renewal.credential.max_age, Duration::from_secs(3600));

        let decoded = codec
            .decode(&renewal.credential.token, TokenKind::Access)
            .expect("renewed token decodes");
        assert_eq!(decoded, renewal.claims);
    }

    #[test]
    fn expired_refresh_requires_reauthentication() {
        let codec = codec("renew");
        let refresh = codec
            .sign_at(&carol(), TokenKind::Refresh, hours_ago(8 * 24))
            .expect("sign");
        assert!(matches!(
            attempt_renewal(&codec, &refresh),
            Err(RenewalError::RefreshExpired)
        ));
    }

    #[test]
    fn invalid_refresh_is_rejected() {
        let codec = codec("renew");
        assert!(matches!(
            attempt_renewal(&codec, "garbage"),
            Err(RenewalError::RefreshInvalid)
        ));
        let access = codec.sign_access(&carol()).expect("sign");
        assert!(matches!(
            attempt_renewal(&codec, &access),
            Err(RenewalError::RefreshInvalid)
        ));
    }

    #[test]
    fn incomplete_refresh_claims_mint_nothing() {
        let codec = codec("renew");
        let nameless = Identity::new("", "carol@x.com", Role::Regular);
        let refresh = codec.sign_refresh(&nameless).expect("sign");
        assert!(matches!(
            attempt_renewal(&codec, &refresh),
            Err(RenewalError::ClaimsIncomplete)
        ));
    }
}
