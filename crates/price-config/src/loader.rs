//! Configuration loading from files and environment.

use crate::schema;
use crate::types::NetworkConfig;
use crate::ConfigError;
use price_types::OracleKind;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Source format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
	Toml,
	Json,
	Yaml,
}

impl Format {
	/// Picks the format from a file extension.
	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Ok(Format::Toml),
			Some("json") => Ok(Format::Json),
			Some("yaml") | Some("yml") => Ok(Format::Yaml),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {:?}",
				path
			))),
		}
	}
}

/// Network configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "PRICE_RESOLVER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<NetworkConfig, ConfigError> {
		let path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;
		info!("Loading network configuration from {:?}", path);

		let content = tokio::fs::read_to_string(path)
			.await
			.map_err(|e| ConfigError::FileNotFound(format!("{:?}: {}", path, e)))?;

		let substituted = substitute_env_vars(&content)?;
		let mut config = parse(&substituted, Format::from_path(path)?)?;

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	/// Parses an in-memory document without touching the environment.
	pub fn from_str(content: &str, format: Format) -> Result<NetworkConfig, ConfigError> {
		let config = parse(content, format)?;
		validate_config(&config)?;
		Ok(config)
	}

	fn apply_env_overrides(&self, config: &mut NetworkConfig) -> Result<(), ConfigError> {
		if let Ok(count) = env::var(format!("{}ORACLE_COUNT", self.env_prefix)) {
			debug!("Overriding oracle count from environment");
			config.oracle_count = count
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid oracle count: {}", e)))?;
		}

		Ok(())
	}
}

/// Replaces `${VAR_NAME}` placeholders with values from the environment.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = regex::Regex::new(r"\$\{([^}]+)\}")
		.map_err(|e| ConfigError::ParseError(e.to_string()))?;

	let mut result = content.to_string();
	for cap in re.captures_iter(content) {
		let var_name = &cap[1];
		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
		result = result.replace(&cap[0], &env_value);
	}

	Ok(result)
}

fn parse(content: &str, format: Format) -> Result<NetworkConfig, ConfigError> {
	let document: toml::Value = match format {
		Format::Toml => {
			toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?
		}
		Format::Json => {
			serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?
		}
		Format::Yaml => {
			serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?
		}
	};

	schema::validate_document(&document)?;

	document
		.try_into()
		.map_err(|e: toml::de::Error| ConfigError::ParseError(e.to_string()))
}

/// Cross-field checks the per-table schemas cannot express.
pub fn validate_config(config: &NetworkConfig) -> Result<(), ConfigError> {
	let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

	let max_count = OracleKind::ADAPTERS.len();
	if config.oracle_count == 0 || config.oracle_count > max_count {
		return invalid(format!("oracle_count must be between 1 and {}", max_count));
	}

	let mut configured = HashSet::new();
	for settings in &config.oracles {
		if !configured.insert(settings.kind()) {
			return invalid(format!("Oracle '{}' configured more than once", settings.kind()));
		}
	}

	let check_order = |order: &[OracleKind], context: &str| -> Result<(), ConfigError> {
		for kind in order {
			if !configured.contains(kind) {
				return invalid(format!("{} references unconfigured oracle '{}'", context, kind));
			}
		}
		Ok(())
	};

	check_order(&config.oracle_order, "oracle_order")?;

	for (idx, rule) in config.overrides.iter().enumerate() {
		let context = format!("overrides[{}]", idx);
		if rule.tokens.is_empty() {
			return invalid(format!("{} lists no tokens", context));
		}
		if rule.oracle_count == 0 || rule.oracle_count > max_count {
			return invalid(format!(
				"{} oracle_count must be between 1 and {}",
				context, max_count
			));
		}
		if let (Some(after), Some(before)) = (rule.after_block, rule.before_block) {
			if after >= before {
				return invalid(format!("{} block window is empty", context));
			}
		}
		check_order(&rule.oracle_order, &context)?;
	}

	if config.assets.stablecoin_decimals > 28 || config.assets.wrapped_native_decimals > 28 {
		return invalid("asset decimals must not exceed 28".to_string());
	}

	Ok(())
}
