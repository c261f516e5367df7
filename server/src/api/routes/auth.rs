//! Authentication API endpoints
//!
//! Thin gateway in front of the identity core: routes validate input,
//! enforce the email-collision policy, call the provider, dispatch auth
//! events, and issue the session cookie. Provider-shaped statuses pass
//! through to the client unchanged.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::core::constants::{SESSION_COOKIE_NAME, SESSION_TTL_DAYS};
use crate::data::types::UserRow;
use crate::identity::{
    AuthEvent, AuthHooks, EmailsClient, IdentityProvider, IdentityVerifier, ResetOutcome,
    SessionPayload, SignInOutcome, SignUpOutcome, UserStore, password,
};
use crate::identity::session::issue_session_token;

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInUpRequest {
    #[validate(length(min = 1, max = 50, message = "Invalid provider"))]
    pub provider: String,
    #[validate(length(min = 1, message = "Provider user id cannot be empty"))]
    pub provider_user_id: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub token: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInfoRequest {
    #[validate(length(min = 1, max = 100, message = "Username must be 1-100 characters"))]
    pub username: String,
}

/// Shared state for auth routes
#[derive(Clone)]
pub struct AuthRoutesState {
    pub identity: Arc<dyn IdentityProvider>,
    pub emails: Arc<EmailsClient>,
    pub hooks: Arc<AuthHooks>,
    pub verifier: Arc<IdentityVerifier>,
    pub users: Arc<dyn UserStore>,
    pub signing_key: Arc<Vec<u8>>,
    pub require_email_verification: bool,
    /// Third-party providers signinup accepts
    pub enabled_providers: Vec<String>,
    pub website_domain: String,
    pub api_domain: String,
}

/// Create auth routes
pub fn routes(state: AuthRoutesState) -> Router {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signinup", post(sign_in_up))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/logout", post(logout))
        .route("/updateinfo", post(update_info))
        .with_state(state)
}

/// Sign up with email and password
pub async fn sign_up(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<SignUpRequest>,
) -> Result<Response, ApiError> {
    if !password::is_acceptable(&request.password) {
        return Ok(general_error(&password::policy_description()));
    }

    // Collision check before touching the provider: a known email means no
    // record is created anywhere
    if state
        .users
        .find_by_email(&request.email)
        .await
        .map_err(ApiError::from_store)?
        .is_some()
    {
        return Ok(status_response("EMAIL_ALREADY_EXISTS_ERROR"));
    }

    let provider_user = match state
        .identity
        .sign_up(&request.email, &request.password)
        .await
        .map_err(ApiError::from_identity)?
    {
        SignUpOutcome::Ok(user) => user,
        SignUpOutcome::EmailAlreadyExists => {
            return Ok(status_response("EMAIL_ALREADY_EXISTS_ERROR"));
        }
    };

    state
        .hooks
        .dispatch(&AuthEvent::SignedUp {
            subject_id: provider_user.id.clone(),
            email: request.email.clone(),
        })
        .await
        .map_err(ApiError::from_dispatch)?;

    let row = state
        .users
        .find_by_subject_id(&provider_user.id)
        .await
        .map_err(ApiError::from_store)?;

    if state.require_email_verification {
        let link = format!(
            "{}/auth/verify-email",
            state.website_domain.trim_end_matches('/')
        );
        if let Err(e) = state
            .emails
            .send_email_verification_email(&request.email, &link)
            .await
        {
            tracing::warn!(error = %e, "Sending verification email failed");
        }
    }

    let payload = SessionPayload {
        subject_id: provider_user.id.clone(),
        external_id: None,
        email: request.email,
        username: row.as_ref().and_then(|r| r.username.clone()),
    };
    let token = issue_token(&state, &payload)?;

    Ok((
        jar.add(session_cookie(token)),
        ok_response(row.as_ref(), &provider_user.id),
    )
        .into_response())
}

/// Sign in with email and password
pub async fn sign_in(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> Result<Response, ApiError> {
    let provider_user = match state
        .identity
        .sign_in(&request.email, &request.password)
        .await
        .map_err(ApiError::from_identity)?
    {
        SignInOutcome::Ok(user) => user,
        SignInOutcome::WrongCredentials => {
            return Ok(status_response("WRONG_CREDENTIALS_ERROR"));
        }
    };

    state
        .hooks
        .dispatch(&AuthEvent::SignedIn {
            subject_id: provider_user.id.clone(),
            email: request.email.clone(),
        })
        .await
        .map_err(ApiError::from_dispatch)?;

    let row = state
        .users
        .find_by_subject_id(&provider_user.id)
        .await
        .map_err(ApiError::from_store)?;

    let payload = SessionPayload {
        subject_id: provider_user.id.clone(),
        external_id: row.as_ref().and_then(|r| r.external_auth_id.clone()),
        email: request.email,
        username: row.as_ref().and_then(|r| r.username.clone()),
    };
    let token = issue_token(&state, &payload)?;

    Ok((
        jar.add(session_cookie(token)),
        ok_response(row.as_ref(), &provider_user.id),
    )
        .into_response())
}

/// Third-party sign-in or sign-up
pub async fn sign_in_up(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<SignInUpRequest>,
) -> Result<Response, ApiError> {
    if !state.enabled_providers.iter().any(|p| p == &request.provider) {
        return Ok(general_error("Unknown sign-in provider"));
    }

    // An email already owned through a different method cannot be taken
    // over by a social login; only the exact same social account passes
    if let Some(existing) = state
        .users
        .find_by_email(&request.email)
        .await
        .map_err(ApiError::from_store)?
        && method_conflict(&existing, &request.provider, &request.provider_user_id)
    {
        return Ok(general_error(
            "An account already exists for this email with a different sign-in method",
        ));
    }

    let (provider_user, created_new) = state
        .identity
        .third_party_sign_in_up(&request.provider, &request.provider_user_id, &request.email)
        .await
        .map_err(ApiError::from_identity)?;

    state
        .hooks
        .dispatch(&AuthEvent::ThirdPartySignedIn {
            subject_id: provider_user.id.clone(),
            email: request.email.clone(),
            provider: Some((request.provider.clone(), request.provider_user_id.clone())),
        })
        .await
        .map_err(ApiError::from_dispatch)?;

    let row = state
        .users
        .find_by_subject_id(&provider_user.id)
        .await
        .map_err(ApiError::from_store)?;

    let payload = SessionPayload {
        subject_id: provider_user.id.clone(),
        external_id: Some(format!(
            "{}|{}",
            request.provider, request.provider_user_id
        )),
        email: request.email,
        username: row.as_ref().and_then(|r| r.username.clone()),
    };
    let token = issue_token(&state, &payload)?;

    let body = Json(serde_json::json!({
        "status": "OK",
        "createdNewUser": created_new,
        "user": user_json(row.as_ref(), &provider_user.id),
    }));

    Ok((jar.add(session_cookie(token)), body).into_response())
}

/// Request a password-reset email, or consume a reset token
pub async fn reset_password(
    State(state): State<AuthRoutesState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    if let Some(token) = &request.token {
        return consume_reset_token(&state, token, &request).await;
    }

    let Some(email) = request.email.as_deref() else {
        return Ok(general_error("Provide an email or a reset token"));
    };

    // Respond OK regardless of whether the email is known
    let users = state
        .identity
        .get_users_by_email(email)
        .await
        .map_err(ApiError::from_identity)?;

    if let Some(provider_user) = users.first()
        && let Some(token) = state
            .identity
            .generate_password_reset_token(&provider_user.id)
            .await
            .map_err(ApiError::from_identity)?
    {
        let link = format!(
            "{}/api/auth/redirect?token={}",
            state.api_domain.trim_end_matches('/'),
            token
        );
        if let Err(e) = state.emails.send_password_reset_email(email, &link).await {
            tracing::warn!(error = %e, "Sending password reset email failed");
        }
    }

    Ok(status_response("OK"))
}

async fn consume_reset_token(
    state: &AuthRoutesState,
    token: &str,
    request: &ResetPasswordRequest,
) -> Result<Response, ApiError> {
    let (Some(new_password), Some(confirmation)) =
        (request.password.as_deref(), request.password_confirmation.as_deref())
    else {
        return Ok(general_error("Password and confirmation are required"));
    };
    if new_password != confirmation {
        return Ok(general_error("Passwords do not match"));
    }
    if !password::is_acceptable(new_password) {
        return Ok(general_error(&password::policy_description()));
    }

    match state
        .identity
        .reset_password(token, new_password)
        .await
        .map_err(ApiError::from_identity)?
    {
        ResetOutcome::InvalidToken => Ok(status_response("RESET_PASSWORD_INVALID_TOKEN_ERROR")),
        ResetOutcome::Ok { user_id } => {
            // The reset is already committed at the provider; a revocation
            // failure surfaces as an error without undoing it
            if let Some(subject_id) = user_id {
                state
                    .hooks
                    .dispatch(&AuthEvent::PasswordReset { subject_id })
                    .await
                    .map_err(ApiError::from_dispatch)?;
            }
            Ok(status_response("OK"))
        }
    }
}

/// Logout and clear the session cookie
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build();

    (jar.remove(cookie), Json(serde_json::json!({ "status": "OK" })))
}

/// Update profile info; merges the username into a refreshed session token
pub async fn update_info(
    State(state): State<AuthRoutesState>,
    headers: HeaderMap,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<UpdateInfoRequest>,
) -> Result<Response, ApiError> {
    let session = state.verifier.verify(&headers).ok_or_else(|| {
        ApiError::unauthorized("SESSION_REQUIRED", "Sign in to update your profile")
    })?;

    let username = request.username.trim();

    let row = match state
        .users
        .update_username(&session.subject_id, username)
        .await
        .map_err(ApiError::from_store)?
    {
        Some(row) => row,
        None => {
            // No domain row yet: provision one, then retry
            state
                .users
                .ensure_user_exists(
                    &session.subject_id,
                    Some(&session.email),
                    session.external_id.as_deref(),
                )
                .await
                .map_err(ApiError::from_store)?;

            state
                .users
                .update_username(&session.subject_id, username)
                .await
                .map_err(ApiError::from_store)?
                .ok_or_else(|| ApiError::internal("User row missing after provisioning"))?
        }
    };

    let payload = SessionPayload {
        subject_id: session.subject_id,
        external_id: session.external_id,
        email: session.email,
        username: row.username.clone(),
    };
    let token = issue_token(&state, &payload)?;

    Ok((
        jar.add(session_cookie(token)),
        ok_response(Some(&row), &row.subject_id),
    )
        .into_response())
}

fn issue_token(state: &AuthRoutesState, payload: &SessionPayload) -> Result<String, ApiError> {
    issue_session_token(&state.signing_key, payload).map_err(|e| {
        tracing::error!(error = %e, "Signing session token failed");
        ApiError::internal("Session issuance failed")
    })
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::days(SESSION_TTL_DAYS as i64))
        .build()
}

/// Whether an existing domain row blocks this social login
fn method_conflict(existing: &UserRow, provider: &str, provider_user_id: &str) -> bool {
    match existing.external_auth_id.as_deref() {
        // Only the identical social account may sign back in
        Some(external) => external != format!("{provider}|{provider_user_id}"),
        // Row created through email/password
        None => true,
    }
}

fn status_response(status: &str) -> Response {
    Json(serde_json::json!({ "status": status })).into_response()
}

fn general_error(message: &str) -> Response {
    Json(serde_json::json!({
        "status": "GENERAL_ERROR",
        "message": message
    }))
    .into_response()
}

fn ok_response(row: Option<&UserRow>, subject_id: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "user": user_json(row, subject_id),
    }))
}

fn user_json(row: Option<&UserRow>, subject_id: &str) -> serde_json::Value {
    match row {
        Some(row) => serde_json::json!({
            "id": row.id,
            "subjectId": row.subject_id,
            "email": row.email,
            "username": row.username,
        }),
        None => serde_json::json!({ "subjectId": subject_id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::core::config::Environment;
    use crate::identity::{IdentityError, ProviderUser};

    /// Identity core double that records which operations were reached
    #[derive(Default)]
    struct StubIdentity {
        sign_up_calls: Mutex<usize>,
        sign_in_up_calls: Mutex<usize>,
    }

    #[async_trait]
    impl IdentityProvider for StubIdentity {
        async fn sign_up(
            &self,
            email: &str,
            _password: &str,
        ) -> Result<SignUpOutcome, IdentityError> {
            *self.sign_up_calls.lock() += 1;
            Ok(SignUpOutcome::Ok(ProviderUser {
                id: "subject-new".to_string(),
                email: email.to_string(),
            }))
        }

        async fn sign_in(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<SignInOutcome, IdentityError> {
            Ok(SignInOutcome::WrongCredentials)
        }

        async fn third_party_sign_in_up(
            &self,
            _provider_id: &str,
            _provider_user_id: &str,
            email: &str,
        ) -> Result<(ProviderUser, bool), IdentityError> {
            *self.sign_in_up_calls.lock() += 1;
            Ok((
                ProviderUser {
                    id: "subject-new".to_string(),
                    email: email.to_string(),
                },
                false,
            ))
        }

        async fn generate_password_reset_token(
            &self,
            _user_id: &str,
        ) -> Result<Option<String>, IdentityError> {
            Ok(None)
        }

        async fn reset_password(
            &self,
            _token: &str,
            _new_password: &str,
        ) -> Result<ResetOutcome, IdentityError> {
            Ok(ResetOutcome::InvalidToken)
        }

        async fn get_users_by_email(
            &self,
            _email: &str,
        ) -> Result<Vec<ProviderUser>, IdentityError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MemoryUsers {
        rows: Mutex<HashMap<String, UserRow>>,
    }

    impl MemoryUsers {
        fn with_row(row: UserRow) -> Self {
            let store = Self::default();
            store.rows.lock().insert(row.subject_id.clone(), row);
            store
        }
    }

    #[async_trait]
    impl UserStore for MemoryUsers {
        async fn ensure_user_exists(
            &self,
            subject_id: &str,
            email: Option<&str>,
            external_auth_id: Option<&str>,
        ) -> anyhow::Result<UserRow> {
            let mut rows = self.rows.lock();
            let row = rows.entry(subject_id.to_string()).or_insert_with(|| UserRow {
                id: format!("row-{subject_id}"),
                subject_id: subject_id.to_string(),
                email: email.map(String::from),
                username: None,
                external_auth_id: external_auth_id.map(String::from),
                created_at: 0,
                updated_at: 0,
            });
            Ok(row.clone())
        }

        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
            Ok(self
                .rows
                .lock()
                .values()
                .find(|r| r.email.as_deref() == Some(email))
                .cloned())
        }

        async fn find_by_subject_id(&self, subject_id: &str) -> anyhow::Result<Option<UserRow>> {
            Ok(self.rows.lock().get(subject_id).cloned())
        }

        async fn update_username(
            &self,
            subject_id: &str,
            username: &str,
        ) -> anyhow::Result<Option<UserRow>> {
            let mut rows = self.rows.lock();
            Ok(rows.get_mut(subject_id).map(|row| {
                row.username = Some(username.to_string());
                row.clone()
            }))
        }
    }

    fn state(identity: Arc<StubIdentity>, users: Arc<MemoryUsers>) -> AuthRoutesState {
        AuthRoutesState {
            identity,
            emails: Arc::new(
                EmailsClient::new("http://127.0.0.1:9", Environment::Development, "Beacon")
                    .unwrap(),
            ),
            hooks: Arc::new(AuthHooks::new()),
            verifier: Arc::new(IdentityVerifier::new(b"test-secret")),
            users,
            signing_key: Arc::new(b"test-secret".to_vec()),
            require_email_verification: false,
            enabled_providers: vec!["github".to_string()],
            website_domain: "http://web.local".to_string(),
            api_domain: "http://api.local".to_string(),
        }
    }

    fn row(external_auth_id: Option<&str>) -> UserRow {
        UserRow {
            id: "row-1".to_string(),
            subject_id: "subject-1".to_string(),
            email: Some("user@example.com".to_string()),
            username: None,
            external_auth_id: external_auth_id.map(str::to_string),
            created_at: 0,
            updated_at: 0,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_email_password_account_blocks_social_login() {
        assert!(method_conflict(&row(None), "github", "gh-1"));
    }

    #[test]
    fn test_different_provider_blocks_social_login() {
        assert!(method_conflict(&row(Some("google|g-1")), "github", "gh-1"));
    }

    #[test]
    fn test_same_provider_different_account_blocks_social_login() {
        assert!(method_conflict(&row(Some("github|gh-2")), "github", "gh-1"));
    }

    #[test]
    fn test_same_social_account_allowed() {
        assert!(!method_conflict(&row(Some("github|gh-1")), "github", "gh-1"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::days(SESSION_TTL_DAYS as i64))
        );
    }

    #[tokio::test]
    async fn test_sign_up_with_taken_email_never_reaches_provider() {
        let identity = Arc::new(StubIdentity::default());
        let users = Arc::new(MemoryUsers::with_row(row(Some("google|g-1"))));
        let state = state(Arc::clone(&identity), Arc::clone(&users));

        let response = sign_up(
            State(state),
            CookieJar::new(),
            ValidatedJson(SignUpRequest {
                email: "user@example.com".to_string(),
                password: "Abc123!x".to_string(),
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["status"], "EMAIL_ALREADY_EXISTS_ERROR");
        assert_eq!(*identity.sign_up_calls.lock(), 0);
        // The pre-existing row is the only one
        assert_eq!(users.rows.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_sign_up_with_fresh_email_issues_session() {
        let identity = Arc::new(StubIdentity::default());
        let users = Arc::new(MemoryUsers::default());
        let state = state(Arc::clone(&identity), users);

        let response = sign_up(
            State(state),
            CookieJar::new(),
            ValidatedJson(SignUpRequest {
                email: "fresh@example.com".to_string(),
                password: "Abc123!x".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(response.headers().contains_key("set-cookie"));
        let body = body_json(response).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["user"]["subjectId"], "subject-new");
        assert_eq!(*identity.sign_up_calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_up_rejects_same_provider_different_account() {
        let identity = Arc::new(StubIdentity::default());
        let users = Arc::new(MemoryUsers::with_row(row(Some("github|gh-2"))));
        let state = state(Arc::clone(&identity), users);

        let response = sign_in_up(
            State(state),
            CookieJar::new(),
            ValidatedJson(SignInUpRequest {
                provider: "github".to_string(),
                provider_user_id: "gh-1".to_string(),
                email: "user@example.com".to_string(),
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["status"], "GENERAL_ERROR");
        assert_eq!(*identity.sign_in_up_calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_sign_in_up_same_social_account_passes_through() {
        let identity = Arc::new(StubIdentity::default());
        let users = Arc::new(MemoryUsers::with_row(row(Some("github|gh-1"))));
        let state = state(Arc::clone(&identity), users);

        let response = sign_in_up(
            State(state),
            CookieJar::new(),
            ValidatedJson(SignInUpRequest {
                provider: "github".to_string(),
                provider_user_id: "gh-1".to_string(),
                email: "user@example.com".to_string(),
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(*identity.sign_in_up_calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_up_rejects_unconfigured_provider() {
        let identity = Arc::new(StubIdentity::default());
        let users = Arc::new(MemoryUsers::default());
        let state = state(Arc::clone(&identity), users);

        let response = sign_in_up(
            State(state),
            CookieJar::new(),
            ValidatedJson(SignInUpRequest {
                provider: "gitlab".to_string(),
                provider_user_id: "gl-1".to_string(),
                email: "user@example.com".to_string(),
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["status"], "GENERAL_ERROR");
        assert_eq!(*identity.sign_in_up_calls.lock(), 0);
    }
}
