//! Response caching for GraphQL queries
//!
//! Successful query responses are cached under a key derived from the
//! request content (query text, variables, operation name) plus a viewer
//! discriminator, so authenticated and anonymous viewers never share
//! entries. Mutations and error responses are never cached.
//!
//! The TTL is per schema coordinate: each top-level field carries a TTL
//! and the response gets the smallest TTL among the fields it touches.

use std::collections::HashSet;
use std::time::Duration;

use async_graphql::parser::types::{
    DocumentOperations, ExecutableDocument, OperationDefinition, OperationType, Selection,
    SelectionSet,
};
use crate::core::config::Environment;
use crate::core::constants::{
    RESPONSE_CACHE_TTL_EMERGENCIES_DEV_SECS, RESPONSE_CACHE_TTL_EMERGENCIES_PROD_SECS,
    RESPONSE_CACHE_TTL_SECS,
};
use crate::data::cache::CacheKey;
use crate::utils::crypto::sha256_hex;

/// Decision to cache one response: where and for how long
#[derive(Debug, Clone, PartialEq)]
pub struct CachePlan {
    pub key: String,
    pub ttl: Duration,
}

/// Compute the cache plan for a request, or `None` when it must not be
/// cached (mutations, subscriptions, unresolvable operations).
pub fn plan_for(
    query: &str,
    variables_json: &str,
    operation_name: Option<&str>,
    doc: &ExecutableDocument,
    viewer_subject_id: Option<&str>,
    environment: Environment,
) -> Option<CachePlan> {
    let operation = selected_operation(doc, operation_name)?;
    if operation.ty != OperationType::Query {
        return None;
    }

    let fields = top_level_fields(doc, operation);
    let ttl_secs = fields
        .iter()
        .map(|f| field_ttl_secs(f, environment))
        .min()
        .unwrap_or(RESPONSE_CACHE_TTL_SECS);

    let content = format!(
        "{}\0{}\0{}",
        query,
        variables_json,
        operation_name.unwrap_or("")
    );
    let discriminator = match viewer_subject_id {
        Some(subject_id) => format!("u:{subject_id}"),
        None => "anon".to_string(),
    };
    let key = CacheKey::graphql_response(&sha256_hex(&content), &discriminator);

    Some(CachePlan {
        key,
        ttl: Duration::from_secs(ttl_secs),
    })
}

/// Whether a response is storable: only error-free responses are
pub fn should_store(response: &async_graphql::Response) -> bool {
    response.errors.is_empty()
}

/// Resolve which operation in the document the request executes
pub fn selected_operation<'a>(
    doc: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Option<&'a OperationDefinition> {
    match &doc.operations {
        DocumentOperations::Single(op) => Some(&op.node),
        DocumentOperations::Multiple(ops) => match operation_name {
            Some(name) => ops.get(name).map(|op| &op.node),
            None if ops.len() == 1 => ops.values().next().map(|op| &op.node),
            None => None,
        },
    }
}

/// Collect the top-level field names of an operation, resolving fragment
/// spreads and inline fragments
pub fn top_level_fields<'a>(
    doc: &'a ExecutableDocument,
    operation: &'a OperationDefinition,
) -> Vec<&'a str> {
    let mut fields = Vec::new();
    let mut seen_fragments = HashSet::new();
    collect_fields(doc, &operation.selection_set.node, &mut fields, &mut seen_fragments);
    fields
}

fn collect_fields<'a>(
    doc: &'a ExecutableDocument,
    selection_set: &'a SelectionSet,
    out: &mut Vec<&'a str>,
    seen_fragments: &mut HashSet<&'a str>,
) {
    for item in &selection_set.items {
        match &item.node {
            Selection::Field(field) => out.push(field.node.name.node.as_str()),
            Selection::InlineFragment(inline) => {
                collect_fields(doc, &inline.node.selection_set.node, out, seen_fragments);
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.node.fragment_name.node.as_str();
                // Guard against fragment cycles in hostile documents
                if seen_fragments.insert(name)
                    && let Some(fragment) = doc.fragments.get(&spread.node.fragment_name.node)
                {
                    collect_fields(doc, &fragment.node.selection_set.node, out, seen_fragments);
                }
            }
        }
    }
}

fn field_ttl_secs(field: &str, environment: Environment) -> u64 {
    match field {
        "emergencies" => {
            if environment.is_production() {
                RESPONSE_CACHE_TTL_EMERGENCIES_PROD_SECS
            } else {
                RESPONSE_CACHE_TTL_EMERGENCIES_DEV_SECS
            }
        }
        _ => RESPONSE_CACHE_TTL_SECS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::parser::parse_query;

    fn plan(
        query: &str,
        viewer: Option<&str>,
        environment: Environment,
    ) -> Option<CachePlan> {
        let doc = parse_query(query).unwrap();
        plan_for(query, "{}", None, &doc, viewer, environment)
    }

    #[test]
    fn test_mutation_never_cached() {
        let query = "mutation { reportEmergency(input: {category: \"x\", description: \"y\", latitude: 1.0, longitude: 2.0}) { id } }";
        assert!(plan(query, Some("u1"), Environment::Development).is_none());
    }

    #[test]
    fn test_query_default_ttl() {
        let p = plan("{ me { id } }", None, Environment::Production).unwrap();
        assert_eq!(p.ttl, Duration::from_secs(RESPONSE_CACHE_TTL_SECS));
    }

    #[test]
    fn test_emergencies_ttl_override_per_environment() {
        let prod = plan("{ emergencies { id } }", None, Environment::Production).unwrap();
        assert_eq!(
            prod.ttl,
            Duration::from_secs(RESPONSE_CACHE_TTL_EMERGENCIES_PROD_SECS)
        );

        let dev = plan("{ emergencies { id } }", None, Environment::Development).unwrap();
        assert_eq!(
            dev.ttl,
            Duration::from_secs(RESPONSE_CACHE_TTL_EMERGENCIES_DEV_SECS)
        );
    }

    #[test]
    fn test_mixed_query_takes_smallest_ttl() {
        let p = plan(
            "{ me { id } emergencies { id } }",
            None,
            Environment::Production,
        )
        .unwrap();
        assert_eq!(p.ttl, Duration::from_secs(RESPONSE_CACHE_TTL_SECS));
    }

    #[test]
    fn test_viewer_separates_keys() {
        let query = "{ me { id } }";
        let anon = plan(query, None, Environment::Development).unwrap();
        let viewer = plan(query, Some("subject-1"), Environment::Development).unwrap();
        assert_ne!(anon.key, viewer.key);
    }

    #[test]
    fn test_variables_separate_keys() {
        let query = "query E($l: Int) { emergencies(limit: $l) { id } }";
        let doc = parse_query(query).unwrap();
        let a = plan_for(query, "{\"l\":1}", None, &doc, None, Environment::Development).unwrap();
        let b = plan_for(query, "{\"l\":2}", None, &doc, None, Environment::Development).unwrap();
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_fragment_fields_resolved() {
        let query = "query { ...Recent } fragment Recent on Query { emergencies { id } }";
        let p = plan(query, None, Environment::Production).unwrap();
        assert_eq!(
            p.ttl,
            Duration::from_secs(RESPONSE_CACHE_TTL_EMERGENCIES_PROD_SECS)
        );
    }

    #[test]
    fn test_unresolvable_operation_not_cached() {
        let query = "query A { me { id } } query B { emergencies { id } }";
        let doc = parse_query(query).unwrap();
        assert!(plan_for(query, "{}", None, &doc, None, Environment::Development).is_none());
        assert!(plan_for(query, "{}", Some("A"), &doc, None, Environment::Development).is_some());
    }
}
