//! Identity layer
//!
//! Session tokens, auth lifecycle events, user provisioning, and clients
//! for the identity core and emails service.

pub mod client;
pub mod emails;
pub mod events;
pub mod password;
pub mod provisioning;
pub mod session;

pub use client::{
    IdentityClient, IdentityError, IdentityProvider, ProviderUser, ResetOutcome, SignInOutcome,
    SignUpOutcome,
};
pub use emails::EmailsClient;
pub use events::{AuthEvent, AuthHooks, AuthListener};
pub use provisioning::{PgUserStore, ProvisioningBridge, SessionRevoker, UserStore};
pub use session::{IdentityVerifier, SessionPayload, VerificationError};
