use thiserror::Error;

use super::claims::{Identity, TokenClaims};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairError {
    #[error("credential lacks name, email or role")]
    MissingClaims,
    #[error("access and refresh credentials describe different identities")]
    MismatchedIdentity,
}

/// Checks that both credentials are complete and describe the same principal.
///
/// Completeness of both sides is checked before anything is compared. The
/// returned identity is taken from the access claims.
pub fn validate_pair(access: &TokenClaims, refresh: &TokenClaims) -> Result<Identity, PairError> {
    let access_identity = access.identity().ok_or(PairError::MissingClaims)?;
    let refresh_identity = refresh.identity().ok_or(PairError::MissingClaims)?;

    if !access_identity.same_principal(&refresh_identity) {
        return Err(PairError::MismatchedIdentity);
    }
    Ok(access_identity)
}
