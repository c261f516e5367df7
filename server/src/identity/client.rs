//! Identity core HTTP client
//!
//! The gateway fronts a separately-deployed identity core that owns
//! credentials. This client wraps its recipe endpoints: credential sign-up
//! and sign-in, third-party sign-in/up, password reset, email lookup, and
//! session revocation. Provider-shaped statuses pass through to callers
//! unchanged.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use thiserror::Error;

use crate::core::config::IdentityConfig;

use super::provisioning::SessionRevoker;

const IDENTITY_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Identity core request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity core returned {status} for {operation}")]
    UnexpectedStatus {
        operation: &'static str,
        status: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Account as the identity core reports it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    pub email: String,
}

/// Outcome of a credential sign-up
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    Ok(ProviderUser),
    EmailAlreadyExists,
}

/// Outcome of a credential sign-in
#[derive(Debug, Clone, PartialEq)]
pub enum SignInOutcome {
    Ok(ProviderUser),
    WrongCredentials,
}

/// Outcome of consuming a password-reset token
#[derive(Debug, Clone, PartialEq)]
pub enum ResetOutcome {
    Ok { user_id: Option<String> },
    InvalidToken,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    status: String,
    user: Option<ProviderUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInUpResponse {
    status: String,
    user: Option<ProviderUser>,
    created_new_user: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetTokenResponse {
    status: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetResponse {
    status: String,
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersByEmailResponse {
    users: Vec<ProviderUser>,
}

/// Operations the gateway needs from the identity core.
///
/// The auth routes hold this trait object so tests can stand in for the
/// remote core.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new email/password account
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, IdentityError>;

    /// Verify email/password credentials
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome, IdentityError>;

    /// Sign a third-party account in, creating it on first contact
    ///
    /// Returns the provider user and whether a new account was created.
    async fn third_party_sign_in_up(
        &self,
        provider_id: &str,
        provider_user_id: &str,
        email: &str,
    ) -> Result<(ProviderUser, bool), IdentityError>;

    /// Generate a password-reset token for an account
    async fn generate_password_reset_token(
        &self,
        user_id: &str,
    ) -> Result<Option<String>, IdentityError>;

    /// Consume a password-reset token and set the new password
    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<ResetOutcome, IdentityError>;

    /// All identity accounts registered under an email
    async fn get_users_by_email(&self, email: &str) -> Result<Vec<ProviderUser>, IdentityError>;
}

/// Client for the identity core
pub struct IdentityClient {
    client: reqwest::Client,
    connection_uri: String,
}

impl IdentityClient {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| IdentityError::Config(format!("invalid identity api key: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(IDENTITY_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| IdentityError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            connection_uri: config.connection_uri.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.connection_uri, path)
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, IdentityError> {
        let body: UserResponse = self
            .client
            .post(self.url("/recipe/signup"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (body.status.as_str(), body.user) {
            ("OK", Some(user)) => Ok(SignUpOutcome::Ok(user)),
            ("EMAIL_ALREADY_EXISTS_ERROR", _) => Ok(SignUpOutcome::EmailAlreadyExists),
            (status, _) => Err(IdentityError::UnexpectedStatus {
                operation: "signup",
                status: status.to_string(),
            }),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome, IdentityError> {
        let body: UserResponse = self
            .client
            .post(self.url("/recipe/signin"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (body.status.as_str(), body.user) {
            ("OK", Some(user)) => Ok(SignInOutcome::Ok(user)),
            ("WRONG_CREDENTIALS_ERROR", _) => Ok(SignInOutcome::WrongCredentials),
            (status, _) => Err(IdentityError::UnexpectedStatus {
                operation: "signin",
                status: status.to_string(),
            }),
        }
    }

    async fn third_party_sign_in_up(
        &self,
        provider_id: &str,
        provider_user_id: &str,
        email: &str,
    ) -> Result<(ProviderUser, bool), IdentityError> {
        let body: SignInUpResponse = self
            .client
            .post(self.url("/recipe/signinup"))
            .json(&serde_json::json!({
                "thirdPartyId": provider_id,
                "thirdPartyUserId": provider_user_id,
                "email": { "id": email },
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (body.status.as_str(), body.user) {
            ("OK", Some(user)) => Ok((user, body.created_new_user.unwrap_or(false))),
            (status, _) => Err(IdentityError::UnexpectedStatus {
                operation: "signinup",
                status: status.to_string(),
            }),
        }
    }

    async fn generate_password_reset_token(
        &self,
        user_id: &str,
    ) -> Result<Option<String>, IdentityError> {
        let body: ResetTokenResponse = self
            .client
            .post(self.url("/recipe/user/password/reset/token"))
            .json(&serde_json::json!({ "userId": user_id }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match body.status.as_str() {
            "OK" => Ok(body.token),
            // Account disappeared between lookup and token generation
            "UNKNOWN_USER_ID_ERROR" => Ok(None),
            status => Err(IdentityError::UnexpectedStatus {
                operation: "password reset token",
                status: status.to_string(),
            }),
        }
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<ResetOutcome, IdentityError> {
        let body: ResetResponse = self
            .client
            .post(self.url("/recipe/user/password/reset"))
            .json(&serde_json::json!({
                "method": "token",
                "token": token,
                "newPassword": new_password,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match body.status.as_str() {
            "OK" => Ok(ResetOutcome::Ok {
                user_id: body.user_id,
            }),
            "RESET_PASSWORD_INVALID_TOKEN_ERROR" => Ok(ResetOutcome::InvalidToken),
            status => Err(IdentityError::UnexpectedStatus {
                operation: "password reset",
                status: status.to_string(),
            }),
        }
    }

    async fn get_users_by_email(&self, email: &str) -> Result<Vec<ProviderUser>, IdentityError> {
        let body: UsersByEmailResponse = self
            .client
            .get(self.url("/recipe/users/by-email"))
            .query(&[("email", email)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body.users)
    }
}

#[async_trait]
impl SessionRevoker for IdentityClient {
    async fn revoke_all_sessions_for_user(&self, subject_id: &str) -> anyhow::Result<()> {
        self.client
            .post(self.url("/recipe/session/remove"))
            .json(&serde_json::json!({ "userId": subject_id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_up_response_deserializes_camel_case() {
        let body: SignInUpResponse = serde_json::from_str(
            r#"{"status":"OK","createdNewUser":true,"user":{"id":"u1","email":"a@b.c"}}"#,
        )
        .unwrap();
        assert_eq!(body.status, "OK");
        assert_eq!(body.created_new_user, Some(true));
        assert_eq!(body.user.unwrap().id, "u1");
    }

    #[test]
    fn test_reset_response_tolerates_missing_user_id() {
        let body: ResetResponse = serde_json::from_str(r#"{"status":"OK"}"#).unwrap();
        assert_eq!(body.user_id, None);
    }

    #[test]
    fn test_connection_uri_trailing_slash_stripped() {
        let config = IdentityConfig {
            connection_uri: "http://identity:3567/".to_string(),
            api_key: "key".to_string(),
            api_domain: "http://api".to_string(),
            website_domain: "http://web".to_string(),
            app_name: "Beacon".to_string(),
        };
        let client = IdentityClient::new(&config).unwrap();
        assert_eq!(client.url("/recipe/signin"), "http://identity:3567/recipe/signin");
    }
}
