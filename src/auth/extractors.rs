use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{
        header::{AUTHORIZATION, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, IntoResponseParts, Response, ResponseParts},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use super::capability::Capability;
use super::claims::Identity;
use super::renewal::RenewedCredential;
use super::verifier::{PresentedCredentials, Reason};
use crate::config::AuthConfig;
use crate::state::AppState;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const REFRESH_HEADER: &str = "x-refresh-token";
pub const RENEWED_ACCESS_HEADER: &str = "x-access-token";

/// Credentials of one request plus where the access credential came from.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    pub presented: PresentedCredentials,
    /// The access credential was read from the HttpOnly cookie.
    pub via_cookie: bool,
}

impl RequestCredentials {
    /// Reads both credentials from cookies, falling back to
    /// `Authorization: Bearer` and `X-Refresh-Token`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let jar = CookieJar::from_headers(headers);
        let cookie_access = jar.get(ACCESS_COOKIE).map(|c| c.value().to_owned());
        let via_cookie = cookie_access.is_some();

        let access = cookie_access.or_else(|| bearer_token(headers));
        let refresh = jar
            .get(REFRESH_COOKIE)
            .map(|c| c.value().to_owned())
            .or_else(|| header_value(headers, REFRESH_HEADER));

        Self {
            presented: PresentedCredentials { access, refresh },
            via_cookie,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?;
    Some(token.trim().to_owned())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(|v| v.trim().to_owned())
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestCredentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Response part carrying a renewed access credential, if one was minted.
///
/// Cookie clients only get the HttpOnly cookie. Header clients, which
/// cannot read cookies they never sent, also get `X-Access-Token`.
#[derive(Debug, Clone)]
pub struct RenewedAccess {
    credential: Option<RenewedCredential>,
    cookie_path: String,
    cookie_secure: bool,
    echo_header: bool,
}

impl RenewedAccess {
    pub fn new(credential: Option<RenewedCredential>, cfg: &AuthConfig) -> Self {
        Self {
            credential,
            cookie_path: cfg.cookie_path.clone(),
            cookie_secure: cfg.cookie_secure,
            echo_header: false,
        }
    }

    pub fn with_header(mut self, echo: bool) -> Self {
        self.echo_header = echo;
        self
    }

    pub fn credential(&self) -> Option<&RenewedCredential> {
        self.credential.as_ref()
    }

    /// Same attributes the login flow uses for the access cookie.
    pub fn cookie(&self) -> Option<Cookie<'static>> {
        let renewed = self.credential()?;
        Some(
            Cookie::build((ACCESS_COOKIE, renewed.token.clone()))
                .http_only(true)
                .secure(self.cookie_secure)
                .same_site(SameSite::Strict)
                .path(self.cookie_path.clone())
                .max_age(time::Duration::seconds(renewed.max_age.as_secs() as i64))
                .build(),
        )
    }
}

impl IntoResponseParts for RenewedAccess {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let (Some(cookie), Some(renewed)) = (self.cookie(), self.credential()) else {
            return Ok(res);
        };
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                res.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "renewed cookie is not a valid header value"),
        }
        if self.echo_header {
            if let Ok(value) = HeaderValue::from_str(&renewed.token) {
                res.headers_mut().insert(RENEWED_ACCESS_HEADER, value);
            }
        }
        Ok(res)
    }
}

/// Rejected authorization, rendered as 401 (or 403 for a denied capability).
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct AuthRejection {
    pub reason: Reason,
    pub renewal: RenewedAccess,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = match self.reason {
            Reason::CapabilityDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = Json(json!({
            "error": {
                "code": self.reason.as_str(),
                "message": self.reason.to_string(),
            }
        }));
        (status, self.renewal, body).into_response()
    }
}

/// Caller that passed the check, plus any credential to send back.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub identity: Identity,
    pub renewal: RenewedAccess,
}

pub fn authorize(
    state: &AppState,
    credentials: &RequestCredentials,
    capability: &Capability,
) -> Result<Authorized, AuthRejection> {
    let decision = state
        .verifier
        .check_authorization(&credentials.presented, capability);
    let renewal = RenewedAccess::new(decision.renewed, &state.config.auth)
        .with_header(!credentials.via_cookie);
    match decision.identity {
        Some(identity) if decision.authorized => Ok(Authorized { identity, renewal }),
        _ => Err(AuthRejection {
            reason: decision.reason,
            renewal,
        }),
    }
}

async fn guard(
    state: AppState,
    capability: Capability,
    mut request: Request,
    next: Next,
) -> Response {
    let credentials = RequestCredentials::from_headers(request.headers());
    match authorize(&state, &credentials, &capability) {
        Ok(Authorized { identity, renewal }) => {
            request.extensions_mut().insert(identity);
            let response = next.run(request).await;
            (renewal, response).into_response()
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Any authenticated caller.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    guard(state, Capability::Any, request, next).await
}

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    guard(state, Capability::AdminOnly, request, next).await
}
