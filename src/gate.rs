//! Page-level access gate.
//!
//! Every role area of the portal (`/applicant`, `/reviewer`, `/admin`, `/compliance`) sits
//! behind `page_gate`, which runs before the page handler and therefore before any
//! repository query. A failed check is a navigation event: the caller is redirected,
//! never shown an error page.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{
    auth::{Session, SessionState, resolve_session},
    models::Role,
};

pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const HOME_PATH: &str = "/";

/// RouteRule
///
/// Static guard configuration: every path under `prefix` requires one of `roles`.
#[derive(Debug)]
pub struct RouteRule {
    pub prefix: &'static str,
    pub roles: &'static [Role],
}

pub const ROUTE_RULES: &[RouteRule] = &[
    RouteRule { prefix: "/applicant", roles: &[Role::Applicant] },
    RouteRule { prefix: "/reviewer", roles: &[Role::Reviewer] },
    RouteRule { prefix: "/admin", roles: &[Role::Admin] },
    RouteRule { prefix: "/compliance", roles: &[Role::Compliance] },
];

impl RouteRule {
    /// Segment-aware prefix match: `/admin` covers `/admin` and `/admin/x`, not `/administrator`.
    pub fn covers(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

pub fn rule_for(path: &str) -> Option<&'static RouteRule> {
    ROUTE_RULES.iter().find(|rule| rule.covers(path))
}

/// GateDecision
///
/// Terminal outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    /// No session: go to sign-in, then come back to `callback`.
    RedirectSignIn { callback: String },
    /// Session with the wrong role: go to the neutral landing page.
    RedirectHome,
}

impl GateDecision {
    /// Where the caller is sent, if anywhere.
    pub fn location(&self) -> Option<String> {
        match self {
            GateDecision::Allowed => None,
            GateDecision::RedirectSignIn { callback } => Some(format!(
                "{SIGN_IN_PATH}?callbackUrl={}",
                utf8_percent_encode(callback, NON_ALPHANUMERIC)
            )),
            GateDecision::RedirectHome => Some(HOME_PATH.to_string()),
        }
    }
}

/// evaluate
///
/// Decides whether `session` may enter a route guarded by `rule`. `requested` is the
/// original path (with query) and becomes the sign-in callback. Pure: the same inputs
/// always give the same decision and the session is never modified.
pub fn evaluate(session: Option<&Session>, rule: &RouteRule, requested: &str) -> GateDecision {
    match session {
        None => GateDecision::RedirectSignIn {
            callback: requested.to_string(),
        },
        Some(session) if rule.roles.contains(&session.role) => GateDecision::Allowed,
        Some(_) => GateDecision::RedirectHome,
    }
}

/// page_gate
///
/// Router middleware applying `evaluate` with the rule matching the request path.
/// The resolved session is cached on the request so page handlers do not look it up again.
pub async fn page_gate(
    State(sessions): State<SessionState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let Some(rule) = rule_for(parts.uri.path()) else {
        return next.run(Request::from_parts(parts, body)).await;
    };

    let requested = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let session = resolve_session(&mut parts, &sessions).await;
    let decision = evaluate(session.as_ref(), rule, &requested);

    match decision.location() {
        None => next.run(Request::from_parts(parts, body)).await,
        Some(location) => {
            tracing::debug!(
                path = %requested,
                role = ?session.as_ref().map(|s| s.role),
                ?decision,
                "page gate redirect"
            );
            Redirect::temporary(&location).into_response()
        }
    }
}
