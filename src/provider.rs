use serde::Deserialize;
use uuid::Uuid;

use crate::{config::AppConfig, error::ApiError};

/// ProviderSignupResponse
///
/// The part of the auth provider's `/auth/v1/signup` answer we need: the new user's id,
/// either at the top level or under `user` when e-mail confirmation is pending.
#[derive(Deserialize)]
struct ProviderSignupResponse {
    id: Option<Uuid>,
    user: Option<ProviderUser>,
}

#[derive(Deserialize)]
struct ProviderUser {
    id: Uuid,
}

impl ProviderSignupResponse {
    fn user_id(&self) -> Option<Uuid> {
        self.id.or(self.user.as_ref().map(|u| u.id))
    }
}

/// AuthProvider
///
/// Client for the external auth provider's sign-up endpoint. Built once at startup and
/// shared through `AppState`; every call is bounded by `AUTH_PROVIDER_TIMEOUT_SECS`.
#[derive(Clone)]
pub struct AuthProvider {
    http: reqwest::Client,
    signup_url: String,
    api_key: Option<String>,
}

impl AuthProvider {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.auth_provider_timeout)
            .build()?;

        Ok(Self {
            http,
            signup_url: format!(
                "{}/auth/v1/signup",
                config.auth_provider_url.trim_end_matches('/')
            ),
            api_key: config.auth_provider_key.clone(),
        })
    }

    /// Creates the account upstream and returns the provider's user id.
    ///
    /// A 4xx from the provider is the caller's problem (400 on `email`); an unreachable,
    /// slow or failing provider is ours (500).
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, ApiError> {
        let mut request = self
            .http
            .post(&self.signup_url)
            .json(&serde_json::json!({ "email": email, "password": password }));
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("auth provider unreachable: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            tracing::warn!(%status, %email, "auth provider rejected sign-up");
            return Err(ApiError::invalid_field(
                "email",
                format!("sign-up rejected by the auth provider ({status})"),
            ));
        }
        if !status.is_success() {
            return Err(ApiError::Internal(format!(
                "auth provider answered {status}"
            )));
        }

        response
            .json::<ProviderSignupResponse>()
            .await
            .ok()
            .and_then(|body| body.user_id())
            .ok_or_else(|| ApiError::Internal("auth provider returned no user id".into()))
    }
}
