//! External emails service client
//!
//! Delivery of password-reset and email-verification messages goes through a
//! separate emails service; the gateway only posts the recipient and link.
//! Outside production the link is also logged so local flows work without
//! the service running.

use thiserror::Error;

use crate::core::config::Environment;

const EMAILS_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum EmailsError {
    #[error("Emails service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Emails service returned {0}")]
    Status(reqwest::StatusCode),
}

/// Client for the external emails service
pub struct EmailsClient {
    client: reqwest::Client,
    endpoint: String,
    environment: Environment,
    /// Shown in email templates
    app_name: String,
}

impl EmailsClient {
    pub fn new(
        endpoint: &str,
        environment: Environment,
        app_name: &str,
    ) -> Result<Self, EmailsError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(EMAILS_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            environment,
            app_name: app_name.to_string(),
        })
    }

    /// Send a password-reset email carrying the deep link
    pub async fn send_password_reset_email(
        &self,
        to: &str,
        link: &str,
    ) -> Result<(), EmailsError> {
        if !self.environment.is_production() {
            tracing::info!(to = %to, link = %link, "Password reset link");
        }
        self.send("password_reset", to, link).await
    }

    /// Send an email-verification email carrying the deep link
    pub async fn send_email_verification_email(
        &self,
        to: &str,
        link: &str,
    ) -> Result<(), EmailsError> {
        if !self.environment.is_production() {
            tracing::info!(to = %to, link = %link, "Email verification link");
        }
        self.send("email_verification", to, link).await
    }

    async fn send(&self, kind: &str, to: &str, link: &str) -> Result<(), EmailsError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "type": kind,
                "appName": self.app_name,
                "to": to,
                "link": link,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(EmailsError::Status(resp.status()));
        }
        Ok(())
    }
}
