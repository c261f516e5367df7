//! API route handlers

pub mod auth;
pub mod graphql;
pub mod health;
pub mod redirect;
