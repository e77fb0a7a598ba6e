use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, marker::PhantomData, sync::Arc};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::Role,
    repository::RepositoryState,
};

/// Name of the cookie browsers carry the session token in.
pub const SESSION_COOKIE: &str = "session_token";
/// Header accepted in `Env::Local` only: authenticates as the given profile id.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of a session token. The role is deliberately absent: it is read from the
/// profile on every request so a role change applies to the next session lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Profile id.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// Session
///
/// Proof of an authenticated identity plus its single role. Read-only for the rest
/// of the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// SessionProvider
///
/// The capability every gate and handler consults to learn who is calling. Resolves
/// a request to a live session, or `None` when there is no valid, unexpired one.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self, parts: &Parts) -> Option<Session>;
}

pub type SessionState = Arc<dyn SessionProvider>;

/// JwtSessionProvider
///
/// Validates HS256 session tokens from the `Authorization: Bearer` header or the
/// session cookie, then loads the profile to obtain the current role. A token whose
/// profile no longer exists yields no session.
pub struct JwtSessionProvider {
    repo: RepositoryState,
    config: AppConfig,
}

impl JwtSessionProvider {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }

    async fn local_bypass(&self, headers: &HeaderMap) -> Option<Session> {
        let user_id = headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())?;

        let user = self.repo.get_user(user_id).await.ok().flatten()?;
        Some(Session {
            user_id: user.id,
            role: user.role,
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    fn decode_token(&self, token: &str) -> Option<Claims> {
        let key = DecodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Expiry is exact; the session model has no grace period.
        validation.leeway = 0;

        match decode::<Claims>(token, &key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected");
                None
            }
        }
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn get_session(&self, parts: &Parts) -> Option<Session> {
        if self.config.env == Env::Local {
            if let Some(session) = self.local_bypass(&parts.headers).await {
                return Some(session);
            }
        }

        let token = session_token(&parts.headers)?;
        let claims = self.decode_token(&token)?;

        let user = match self.repo.get_user(claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(error = %e, user_id = %claims.sub, "profile lookup failed");
                return None;
            }
        };

        let session = Session {
            user_id: user.id,
            role: user.role,
            expires_at: DateTime::from_timestamp(claims.exp as i64, 0)?,
        };
        (!session.is_expired(Utc::now())).then_some(session)
    }
}

/// Extracts the raw token: the bearer header wins over the cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(bearer.trim().to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Resolves the session once per request; later extractors reuse the cached value.
pub async fn resolve_session(parts: &mut Parts, sessions: &SessionState) -> Option<Session> {
    if let Some(cached) = parts.extensions.get::<ResolvedSession>() {
        return cached.0.clone();
    }
    let session = sessions.get_session(parts).await;
    parts.extensions.insert(ResolvedSession(session.clone()));
    session
}

#[derive(Clone)]
struct ResolvedSession(Option<Session>);

/// A required session. Rejects with 401 before the handler (or any body extractor) runs.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);
        resolve_session(parts, &sessions)
            .await
            .ok_or(ApiError::Unauthenticated)
    }
}

/// `Option<Session>` for routes that behave differently for anonymous callers.
impl<S> OptionalFromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let sessions = SessionState::from_ref(state);
        Ok(resolve_session(parts, &sessions).await)
    }
}

// --- Role Policies ---

/// RolePolicy
///
/// Declares which roles may invoke an operation. Attached to handlers through
/// `Authorized<P>` so every mutating endpoint states its requirement in its signature.
pub trait RolePolicy: Send + Sync + 'static {
    const ROLES: &'static [Role];

    fn allows(role: Role) -> bool {
        Self::ROLES.contains(&role)
    }
}

pub struct AdminOnly;
impl RolePolicy for AdminOnly {
    const ROLES: &'static [Role] = &[Role::Admin];
}

pub struct ApplicantOnly;
impl RolePolicy for ApplicantOnly {
    const ROLES: &'static [Role] = &[Role::Applicant];
}

pub struct ApplicantOrAdmin;
impl RolePolicy for ApplicantOrAdmin {
    const ROLES: &'static [Role] = &[Role::Applicant, Role::Admin];
}

pub struct ReviewerOrAdmin;
impl RolePolicy for ReviewerOrAdmin {
    const ROLES: &'static [Role] = &[Role::Reviewer, Role::Admin];
}

/// Authorized
///
/// A session whose role satisfies `P`. 401 without a session, 403 with the wrong role.
pub struct Authorized<P: RolePolicy>(pub Session, pub PhantomData<P>);

impl<P, S> FromRequestParts<S> for Authorized<P>
where
    P: RolePolicy,
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = <Session as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        if !P::allows(session.role) {
            let roles = P::ROLES
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ApiError::Forbidden(roles));
        }
        Ok(Authorized(session, PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session_token=from-cookie"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn missing_token_yields_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert!(session_token(&headers).is_none());
    }

    #[test]
    fn policies_list_their_roles() {
        assert!(AdminOnly::allows(Role::Admin));
        assert!(!AdminOnly::allows(Role::Reviewer));
        assert!(ReviewerOrAdmin::allows(Role::Reviewer));
        assert!(!ApplicantOnly::allows(Role::Compliance));
    }

    #[test]
    fn session_expiry_is_inclusive_of_now() {
        let now = Utc::now();
        let session = Session {
            user_id: Uuid::new_v4(),
            role: Role::Applicant,
            expires_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }
}
