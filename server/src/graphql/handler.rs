//! GraphQL dispatch
//!
//! One entry point for GET and POST `/graphql`. Per request: build the
//! context, gate introspection in production, consult the response cache,
//! execute, store, respond. Every response carries exactly one
//! `x-request-id` header.

use std::sync::Arc;

use async_graphql::parser::types::{DocumentOperations, ExecutableDocument, OperationDefinition};
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use crate::core::config::Environment;
use crate::core::constants::{REQUEST_ID_HEADER, SIGNATURE_HEADER};
use crate::data::cache::CacheService;
use crate::data::postgres::PgPool;
use crate::data::topics::TopicService;
use crate::graphql::context::RequestContext;
use crate::graphql::response_cache::{self, top_level_fields};
use crate::graphql::schema::BeaconSchema;
use crate::identity::IdentityVerifier;
use crate::utils::crypto::constant_time_eq;
use crate::utils::request_id::resolve_request_id;

/// Everything the dispatch layer needs, shared across requests
pub struct GraphqlState {
    pub schema: BeaconSchema,
    pub environment: Environment,
    /// Per-process random token that unlocks introspection in production
    pub introspection_signature: String,
    pub verifier: IdentityVerifier,
    pub pool: PgPool,
    pub cache: Arc<CacheService>,
    pub topics: Arc<TopicService>,
}

/// Handle one GraphQL request end to end
pub async fn dispatch(
    state: &GraphqlState,
    headers: &HeaderMap,
    request: async_graphql::Request,
) -> Response {
    let ctx = match RequestContext::build(
        headers,
        &state.verifier,
        &state.pool,
        Arc::clone(&state.cache),
        Arc::clone(&state.topics),
    )
    .await
    {
        Ok(ctx) => ctx,
        Err(e) => {
            let request_id = resolve_request_id(
                headers
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok()),
            );
            tracing::error!(%request_id, error = %e, "Acquiring database session failed");
            return internal_error_response(&request_id, response_content_type(headers));
        }
    };

    let request_id = ctx.request_id.clone();
    let span = tracing::info_span!("request", request_id = %request_id);

    execute(state, headers, request, ctx).instrument(span).await
}

async fn execute(
    state: &GraphqlState,
    headers: &HeaderMap,
    request: async_graphql::Request,
    ctx: RequestContext,
) -> Response {
    let request_id = ctx.request_id.clone();
    let cache = Arc::clone(&ctx.cache);
    let content_type = response_content_type(headers);

    // A parse failure falls through to execution, which reports it as a
    // regular GraphQL error
    let doc = async_graphql::parser::parse_query(&request.query).ok();

    if let Some(doc) = &doc
        && introspection_rejected(state.environment, &state.introspection_signature, headers, doc)
    {
        tracing::debug!("Introspection rejected");
        let response = async_graphql::Response::from_errors(vec![
            async_graphql::ServerError::new("Introspection is disabled", None),
        ]);
        return graphql_response(&response, &request_id, content_type);
    }

    let plan = doc.as_ref().and_then(|doc| {
        let variables_json = serde_json::to_string(&request.variables).unwrap_or_default();
        response_cache::plan_for(
            &request.query,
            &variables_json,
            request.operation_name.as_deref(),
            doc,
            ctx.subject_id(),
            state.environment,
        )
    });

    if let Some(plan) = &plan {
        match cache.get_raw(&plan.key).await {
            Ok(Some(body)) => {
                tracing::debug!("Response cache hit");
                return json_response(StatusCode::OK, body, &request_id, content_type);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Response cache read failed"),
        }
    }

    let response = state.schema.execute(request.data(ctx)).await;

    let body = match serde_json::to_vec(&response) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Serializing GraphQL response failed");
            return internal_error_response(&request_id, content_type);
        }
    };

    // Single atomic SET: an abandoned request never leaves a partial entry
    if let Some(plan) = &plan
        && response_cache::should_store(&response)
        && let Err(e) = cache.set_raw(&plan.key, body.clone(), Some(plan.ttl)).await
    {
        tracing::warn!(error = %e, "Response cache write failed");
    }

    json_response(StatusCode::OK, body, &request_id, content_type)
}

/// Whether any operation in the document selects introspection fields
fn uses_introspection(doc: &ExecutableDocument) -> bool {
    let operations: Vec<&OperationDefinition> = match &doc.operations {
        DocumentOperations::Single(op) => vec![&op.node],
        DocumentOperations::Multiple(ops) => ops.values().map(|op| &op.node).collect(),
    };

    operations.iter().any(|op| {
        top_level_fields(doc, op)
            .iter()
            .any(|field| *field == "__schema" || *field == "__type")
    })
}

/// Introspection gate: in production a document selecting introspection
/// fields only passes with the per-process signature attached
fn introspection_rejected(
    environment: Environment,
    expected_signature: &str,
    headers: &HeaderMap,
    doc: &ExecutableDocument,
) -> bool {
    environment.is_production()
        && uses_introspection(doc)
        && !signature_matches(expected_signature, headers)
}

fn signature_matches(expected: &str, headers: &HeaderMap) -> bool {
    headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|signature| constant_time_eq(signature, expected))
        .unwrap_or(false)
}

/// Response media type per the caller's Accept header; plain JSON unless
/// the GraphQL-over-HTTP media type is explicitly requested
fn response_content_type(headers: &HeaderMap) -> &'static str {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if accept.contains("application/graphql-response+json") {
        "application/graphql-response+json"
    } else {
        "application/json"
    }
}

fn graphql_response(
    response: &async_graphql::Response,
    request_id: &str,
    content_type: &'static str,
) -> Response {
    match serde_json::to_vec(response) {
        Ok(body) => json_response(StatusCode::OK, body, request_id, content_type),
        Err(e) => {
            tracing::error!(error = %e, "Serializing GraphQL response failed");
            internal_error_response(request_id, content_type)
        }
    }
}

fn internal_error_response(request_id: &str, content_type: &'static str) -> Response {
    let body = serde_json::json!({
        "errors": [{ "message": "Internal server error" }]
    });
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        body.to_string().into_bytes(),
        request_id,
        content_type,
    )
}

fn json_response(
    status: StatusCode,
    body: Vec<u8>,
    request_id: &str,
    content_type: &'static str,
) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE.as_str(), content_type),
            (REQUEST_ID_HEADER, request_id),
        ],
        Body::from(body),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::parser::parse_query;

    #[test]
    fn test_introspection_detected_at_top_level() {
        let doc = parse_query("{ __schema { types { name } } }").unwrap();
        assert!(uses_introspection(&doc));

        let doc = parse_query("{ __type(name: \"User\") { name } }").unwrap();
        assert!(uses_introspection(&doc));
    }

    #[test]
    fn test_introspection_detected_behind_fragment() {
        let doc = parse_query(
            "query { ...Peek } fragment Peek on Query { __schema { types { name } } }",
        )
        .unwrap();
        assert!(uses_introspection(&doc));
    }

    #[test]
    fn test_plain_query_not_flagged() {
        let doc = parse_query("{ me { id } emergencies { id } }").unwrap();
        assert!(!uses_introspection(&doc));
    }

    #[test]
    fn test_typename_not_flagged() {
        let doc = parse_query("{ me { __typename id } }").unwrap();
        assert!(!uses_introspection(&doc));
    }

    #[test]
    fn test_introspection_passes_with_matching_signature() {
        let doc = parse_query("{ __schema { types { name } } }").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, "tok-1".parse().unwrap());

        assert!(!introspection_rejected(
            Environment::Production,
            "tok-1",
            &headers,
            &doc
        ));
    }

    #[test]
    fn test_introspection_rejected_with_wrong_or_missing_signature() {
        let doc = parse_query("{ __schema { types { name } } }").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, "tok-2".parse().unwrap());
        assert!(introspection_rejected(
            Environment::Production,
            "tok-1",
            &headers,
            &doc
        ));

        assert!(introspection_rejected(
            Environment::Production,
            "tok-1",
            &HeaderMap::new(),
            &doc
        ));
    }

    #[test]
    fn test_introspection_open_outside_production() {
        let doc = parse_query("{ __schema { types { name } } }").unwrap();
        assert!(!introspection_rejected(
            Environment::Development,
            "tok-1",
            &HeaderMap::new(),
            &doc
        ));
    }

    #[test]
    fn test_content_type_defaults_to_json() {
        assert_eq!(response_content_type(&HeaderMap::new()), "application/json");

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, "*/*".parse().unwrap());
        assert_eq!(response_content_type(&headers), "application/json");
    }

    #[test]
    fn test_content_type_honors_graphql_accept() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            "application/graphql-response+json".parse().unwrap(),
        );
        assert_eq!(
            response_content_type(&headers),
            "application/graphql-response+json"
        );
    }

    #[test]
    fn test_json_response_carries_one_request_id() {
        let response = json_response(StatusCode::OK, b"{}".to_vec(), "req-1", "application/json");
        let values: Vec<_> = response.headers().get_all(REQUEST_ID_HEADER).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "req-1");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
