//! GraphQL endpoint glue
//!
//! `GraphQLRequest` handles both GET (query string) and POST bodies; the
//! actual work happens in the dispatch layer.

use std::sync::Arc;

use async_graphql_axum::GraphQLRequest;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;

use crate::graphql::{GraphqlState, dispatch};

pub async fn graphql(
    State(state): State<Arc<GraphqlState>>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> Response {
    dispatch(&state, &headers, request.into_inner()).await
}
