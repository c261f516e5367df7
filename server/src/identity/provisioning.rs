//! Provisioning bridge
//!
//! Keeps the domain `users` table in step with the identity provider: every
//! confirmed sign-up or sign-in guarantees a matching domain row, and a
//! password reset revokes all live sessions for the account.

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::cache::CacheService;
use crate::data::postgres::{PgPool, repositories};
use crate::data::types::UserRow;

use super::events::{AuthEvent, AuthListener};

/// Store for domain user rows
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create the domain row for a subject if it does not exist; return it
    async fn ensure_user_exists(
        &self,
        subject_id: &str,
        email: Option<&str>,
        external_auth_id: Option<&str>,
    ) -> anyhow::Result<UserRow>;

    /// Row owning an email, if any
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>>;

    /// Row for a subject, if one has been provisioned
    async fn find_by_subject_id(&self, subject_id: &str) -> anyhow::Result<Option<UserRow>>;

    /// Set the username on a subject's row; `None` when no row exists yet
    async fn update_username(
        &self,
        subject_id: &str,
        username: &str,
    ) -> anyhow::Result<Option<UserRow>>;
}

/// Revokes live sessions at the identity provider
#[async_trait]
pub trait SessionRevoker: Send + Sync {
    async fn revoke_all_sessions_for_user(&self, subject_id: &str) -> anyhow::Result<()>;
}

/// Postgres-backed user store
pub struct PgUserStore {
    pool: PgPool,
    cache: Arc<CacheService>,
}

impl PgUserStore {
    pub fn new(pool: PgPool, cache: Arc<CacheService>) -> Self {
        Self { pool, cache }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn ensure_user_exists(
        &self,
        subject_id: &str,
        email: Option<&str>,
        external_auth_id: Option<&str>,
    ) -> anyhow::Result<UserRow> {
        let mut conn = self.pool.acquire().await?;
        let row = repositories::user::ensure_user_exists(
            &mut conn,
            Some(self.cache.as_ref()),
            subject_id,
            email,
            external_auth_id,
        )
        .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
        let mut conn = self.pool.acquire().await?;
        let row = repositories::user::get_user_by_email(&mut conn, email).await?;
        Ok(row)
    }

    async fn find_by_subject_id(&self, subject_id: &str) -> anyhow::Result<Option<UserRow>> {
        let mut conn = self.pool.acquire().await?;
        let row = repositories::user::get_user_by_subject_id(
            &mut conn,
            Some(self.cache.as_ref()),
            subject_id,
        )
        .await?;
        Ok(row)
    }

    async fn update_username(
        &self,
        subject_id: &str,
        username: &str,
    ) -> anyhow::Result<Option<UserRow>> {
        let mut conn = self.pool.acquire().await?;
        let row = repositories::user::update_username(
            &mut conn,
            Some(self.cache.as_ref()),
            subject_id,
            username,
        )
        .await?;
        Ok(row)
    }
}

/// Sole production auth listener: provisions domain rows and revokes
/// sessions on password reset
pub struct ProvisioningBridge {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionRevoker>,
}

impl ProvisioningBridge {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionRevoker>) -> Self {
        Self { users, sessions }
    }
}

#[async_trait]
impl AuthListener for ProvisioningBridge {
    async fn on_event(&self, event: &AuthEvent) -> anyhow::Result<()> {
        match event {
            AuthEvent::SignedUp { subject_id, email }
            | AuthEvent::SignedIn { subject_id, email } => {
                self.users
                    .ensure_user_exists(subject_id, Some(email), None)
                    .await?;
            }
            AuthEvent::ThirdPartySignedIn {
                subject_id,
                email,
                provider,
            } => {
                let external_auth_id = provider
                    .as_ref()
                    .map(|(id, user_id)| format!("{id}|{user_id}"));
                self.users
                    .ensure_user_exists(subject_id, Some(email), external_auth_id.as_deref())
                    .await?;
            }
            AuthEvent::PasswordReset { subject_id } => {
                // The reset itself is already committed at the provider;
                // a revocation failure surfaces but does not undo it.
                self.sessions.revoke_all_sessions_for_user(subject_id).await?;
            }
        }
        Ok(())
    }
}
