//! Schema validation for raw configuration tables.
//!
//! Configuration files are checked against a [`Schema`] before typed
//! deserialization so that a typo in an oracle table is reported with the
//! offending field path instead of a generic serde message.

use alloy_primitives::Address;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	/// A strict schema found a key it does not know.
	#[error("Unknown field: {0}")]
	UnknownField(String),
}

impl ValidationError {
	/// Prepends `parent` to the field path carried by this error.
	fn nested(self, parent: &str) -> Self {
		let join = |field: String| format!("{}.{}", parent, field);
		match self {
			ValidationError::MissingField(f) => ValidationError::MissingField(join(f)),
			ValidationError::UnknownField(f) => ValidationError::UnknownField(join(f)),
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: join(field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: join(field),
				expected,
				actual,
			},
		}
	}
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	Integer { min: Option<i64>, max: Option<i64> },
	/// A `0x`-prefixed, 20-byte hex string.
	Address,
	Array(Box<FieldType>),
	Table(Schema),
}

/// Type alias for field validator functions.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A field definition with name and type.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;

		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}

		Ok(())
	}
}

/// Schema definition with required and optional fields.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
	/// Keys accepted without validation, such as a variant tag.
	pub passthrough: Vec<String>,
	/// Reject keys that are neither required, optional nor passthrough.
	pub strict: bool,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self {
			required,
			optional,
			passthrough: Vec::new(),
			strict: false,
		}
	}

	/// Rejects unknown keys, except the listed passthrough keys.
	pub fn strict(mut self, passthrough: &[&str]) -> Self {
		self.strict = true;
		self.passthrough = passthrough.iter().map(|k| k.to_string()).collect();
		self
	}

	/// Validates a TOML value against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		if self.strict {
			let known = |key: &str| {
				self.required.iter().any(|f| f.name == key)
					|| self.optional.iter().any(|f| f.name == key)
					|| self.passthrough.iter().any(|k| k == key)
			};
			if let Some(key) = table.keys().find(|key| !known(key)) {
				return Err(ValidationError::UnknownField(key.clone()));
			}
		}

		Ok(())
	}
}

fn mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

/// Validates that a value matches the expected field type.
fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch(field_name, "string", value));
			}
		}
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field_name, "integer", value))?;

			let out_of_range = |message: String| ValidationError::InvalidValue {
				field: field_name.to_string(),
				message,
			};
			if let Some(min) = min.filter(|min| int_val < *min) {
				return Err(out_of_range(format!("{} is below the minimum of {}", int_val, min)));
			}
			if let Some(max) = max.filter(|max| int_val > *max) {
				return Err(out_of_range(format!("{} is above the maximum of {}", int_val, max)));
			}
		}
		FieldType::Address => {
			let text = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "address", value))?;
			if !text.starts_with("0x") || text.parse::<Address>().is_err() {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("'{}' is not a valid address", text),
				});
			}
		}
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| mismatch(field_name, "array", value))?;

			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		}
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| e.nested(field_name))?;
		}
	}

	Ok(())
}
