//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::routing::{any, get};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use super::middleware::{self, AllowedOrigins};
use super::routes::{auth, graphql, health, redirect};
use crate::core::CoreApp;
use crate::core::constants::{DEFAULT_HOST, GRAPHQL_PATH};
use crate::graphql::{GraphqlState, build_schema};
use crate::identity::{IdentityProvider, IdentityVerifier, PgUserStore, UserStore};

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.identity);

        Self {
            app,
            allowed_origins,
        }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self {
            app,
            allowed_origins,
        } = self;

        // Clone shutdown before moving app
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(DEFAULT_HOST.parse()?, app.config.http.port);
        let signing_key = app.config.encryption_secret.as_bytes().to_vec();

        let graphql_state = Arc::new(GraphqlState {
            schema: build_schema(Arc::clone(&app.storage)),
            environment: app.config.environment,
            introspection_signature: app.introspection_signature.clone(),
            verifier: IdentityVerifier::new(&signing_key),
            pool: app.postgres.pool().clone(),
            cache: Arc::clone(&app.cache),
            topics: Arc::clone(&app.topics),
        });

        let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(
            app.postgres.pool().clone(),
            Arc::clone(&app.cache),
        ));

        let mut enabled_providers = Vec::new();
        if app.config.auth.github {
            enabled_providers.push("github".to_string());
        }

        let auth_state = auth::AuthRoutesState {
            identity: Arc::clone(&app.identity) as Arc<dyn IdentityProvider>,
            emails: Arc::clone(&app.emails),
            hooks: Arc::clone(&app.hooks),
            verifier: Arc::new(IdentityVerifier::new(&signing_key)),
            users,
            signing_key: Arc::new(signing_key),
            require_email_verification: app.config.auth.require_email_verification,
            enabled_providers,
            website_domain: app.config.identity.website_domain.clone(),
            api_domain: app.config.identity.api_domain.clone(),
        };

        let graphql_routes = Router::new()
            .route(
                GRAPHQL_PATH,
                get(graphql::graphql).post(graphql::graphql),
            )
            .with_state(graphql_state);

        let router = Router::new()
            .route("/_health", get(health::health))
            .route("/api/auth/redirect", any(redirect::redirect))
            .merge(graphql_routes)
            .merge(auth::routes(auth_state))
            .fallback(middleware::handle_404)
            .layer(CompressionLayer::new())
            .layer(middleware::cors(&allowed_origins));

        tracing::info!(%addr, "Listening");

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}
