//! Core application infrastructure

pub mod config;
pub mod constants;
pub mod shutdown;

pub use crate::app::CoreApp;
pub use config::{AppConfig, ConfigError, Environment};
pub use shutdown::ShutdownService;
