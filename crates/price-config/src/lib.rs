//! Network configuration for the price resolution engine.
//!
//! A network configuration lists which price sources exist on a chain, their
//! contract addresses and activation blocks, the default priority order, and
//! the base assets router-based sources price against. Configurations are
//! immutable once loaded and are looked up by name through a
//! [`NetworkRegistry`].

use thiserror::Error;

pub mod loader;
pub mod registry;
pub mod schema;
pub mod types;

pub use loader::{ConfigLoader, Format};
pub use registry::NetworkRegistry;
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Schema error: {0}")]
	Schema(#[from] price_types::ValidationError),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("Network '{0}' already registered")]
	DuplicateNetwork(String),
}
