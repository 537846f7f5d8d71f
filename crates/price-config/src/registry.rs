//! Registry mapping network names to their price configuration.
//!
//! The registry is populated once at startup, from the presets compiled into
//! this crate and from any configuration files the operator supplies. After
//! that it is read-only; configurations are handed out as `Arc`s so engines
//! for several networks can share them.

use crate::loader::{ConfigLoader, Format};
use crate::types::NetworkConfig;
use crate::ConfigError;
use price_types::PriceError;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const MAINNET_PRESET: &str = include_str!("../presets/mainnet.toml");

/// Registry of network configurations indexed by network name.
pub struct NetworkRegistry {
	networks: HashMap<String, Arc<NetworkConfig>>,
}

impl NetworkRegistry {
	pub fn new() -> Self {
		Self {
			networks: HashMap::new(),
		}
	}

	/// Creates a registry holding the built-in network presets.
	pub fn builtin() -> Result<Self, ConfigError> {
		let mut registry = Self::new();
		registry.register(ConfigLoader::from_str(MAINNET_PRESET, Format::Toml)?)?;
		Ok(registry)
	}

	/// Registers a configuration.
	///
	/// # Errors
	///
	/// Returns an error if a configuration with the same name is already
	/// registered.
	pub fn register(&mut self, config: NetworkConfig) -> Result<(), ConfigError> {
		info!("Registering price configuration for network {}", config.name);

		if self.networks.contains_key(&config.name) {
			return Err(ConfigError::DuplicateNetwork(config.name));
		}

		self.networks.insert(config.name.clone(), Arc::new(config));
		Ok(())
	}

	/// Registers a configuration, replacing any existing one with the same name.
	pub fn replace(&mut self, config: NetworkConfig) -> Option<Arc<NetworkConfig>> {
		info!("Replacing price configuration for network {}", config.name);
		self.networks.insert(config.name.clone(), Arc::new(config))
	}

	/// Loads a configuration file and registers it, replacing a preset of the
	/// same name. Returns the registered network name.
	pub async fn load_file(&mut self, path: impl AsRef<Path>) -> Result<String, ConfigError> {
		let config = ConfigLoader::new().with_file(path).load().await?;
		let name = config.name.clone();
		self.replace(config);
		Ok(name)
	}

	pub fn get(&self, network: &str) -> Option<Arc<NetworkConfig>> {
		self.networks.get(network).cloned()
	}

	/// Retrieves a configuration, failing loudly when the network is unknown.
	pub fn get_required(&self, network: &str) -> Result<Arc<NetworkConfig>, PriceError> {
		self.get(network)
			.ok_or_else(|| PriceError::ConfigurationMissing(network.to_string()))
	}

	/// Registered network names in sorted order.
	pub fn networks(&self) -> Vec<String> {
		let mut names: Vec<String> = self.networks.keys().cloned().collect();
		names.sort();
		names
	}
}

impl Default for NetworkRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for NetworkRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NetworkRegistry")
			.field("networks", &self.networks())
			.finish()
	}
}
