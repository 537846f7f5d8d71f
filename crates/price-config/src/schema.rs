//! Raw-table schemas for network configuration files.
//!
//! Each adapter kind has its own table layout. The loader checks every
//! `[[oracles]]` entry against the schema for its `kind` before handing the
//! document to serde.

use price_types::{Field, FieldType, OracleKind, Schema, ValidationError};

fn block_field(name: &str) -> Field {
	Field::new(
		name,
		FieldType::Integer {
			min: Some(0),
			max: None,
		},
	)
}

fn address_list(name: &str) -> Field {
	Field::new(name, FieldType::Array(Box::new(FieldType::Address)))
}

fn kind_list(name: &str) -> Field {
	Field::new(name, FieldType::Array(Box::new(FieldType::String))).with_validator(|value| {
		let entries = value.as_array().map(Vec::as_slice).unwrap_or_default();
		if entries.is_empty() {
			return Err("at least one oracle kind is required".to_string());
		}
		for entry in entries {
			let name = entry.as_str().unwrap_or_default();
			match name.parse::<OracleKind>() {
				Ok(kind) if OracleKind::ADAPTERS.contains(&kind) => {}
				Ok(kind) => return Err(format!("{} cannot be configured", kind)),
				Err(e) => return Err(e),
			}
		}
		Ok(())
	})
}

fn count_field() -> Field {
	Field::new(
		"oracle_count",
		FieldType::Integer {
			min: Some(1),
			max: Some(OracleKind::ADAPTERS.len() as i64),
		},
	)
}

fn contract_ref_schema() -> Schema {
	Schema::new(
		vec![Field::new("address", FieldType::Address)],
		vec![block_field("start_block")],
	)
	.strict(&[])
}

fn contract_schema() -> Schema {
	Schema::new(
		vec![Field::new("address", FieldType::Address)],
		vec![block_field("start_block"), address_list("blacklist")],
	)
	.strict(&["kind"])
}

fn router_schema() -> Schema {
	Schema::new(
		vec![Field::new(
			"routers",
			FieldType::Array(Box::new(FieldType::Table(contract_ref_schema()))),
		)],
		vec![
			// Two hops must leave a positive fee denominator.
			Field::new(
				"fee_bps",
				FieldType::Integer {
					min: Some(0),
					max: Some(4_999),
				},
			),
			address_list("blacklist"),
		],
	)
	.strict(&["kind"])
}

fn curve_router_schema() -> Schema {
	Schema::new(
		vec![Field::new(
			"registries",
			FieldType::Array(Box::new(FieldType::Table(contract_ref_schema()))),
		)],
		vec![address_list("blacklist")],
	)
	.strict(&["kind"])
}

/// Schema for one `[[oracles]]` table of the given kind.
pub fn oracle_schema(kind: OracleKind) -> Schema {
	match kind {
		OracleKind::UniswapForksRouter => router_schema(),
		OracleKind::CurveRouter => curve_router_schema(),
		_ => contract_schema(),
	}
}

fn assets_schema() -> Schema {
	let decimals = |name: &str| {
		Field::new(
			name,
			FieldType::Integer {
				min: Some(0),
				max: Some(28),
			},
		)
	};
	Schema::new(
		vec![
			Field::new("wrapped_native", FieldType::Address),
			Field::new("stablecoin", FieldType::Address),
		],
		vec![
			Field::new("native", FieldType::Address),
			decimals("wrapped_native_decimals"),
			decimals("stablecoin_decimals"),
		],
	)
	.strict(&[])
}

fn override_schema() -> Schema {
	Schema::new(
		vec![address_list("tokens"), kind_list("oracle_order")],
		vec![
			count_field(),
			block_field("after_block"),
			block_field("before_block"),
		],
	)
	.strict(&[])
}

/// Schema for the network document as a whole.
///
/// `oracles` is only checked for shape here; [`validate_document`] applies
/// the per-kind schema to each entry.
pub fn network_schema() -> Schema {
	Schema::new(
		vec![
			Field::new("name", FieldType::String),
			Field::new(
				"chain_id",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			),
			kind_list("oracle_order"),
			Field::new("assets", FieldType::Table(assets_schema())),
		],
		vec![
			count_field(),
			address_list("hardcoded_stables"),
			Field::new(
				"oracles",
				FieldType::Array(Box::new(FieldType::Table(Schema::new(
					vec![Field::new("kind", FieldType::String)],
					vec![],
				)))),
			),
			Field::new(
				"overrides",
				FieldType::Array(Box::new(FieldType::Table(override_schema()))),
			),
		],
	)
	.strict(&[])
}

/// Validates a whole network document, including every oracle table.
pub fn validate_document(document: &toml::Value) -> Result<(), ValidationError> {
	network_schema().validate(document)?;

	let oracles = document
		.get("oracles")
		.and_then(toml::Value::as_array)
		.map(Vec::as_slice)
		.unwrap_or_default();

	for (idx, table) in oracles.iter().enumerate() {
		let field = format!("oracles[{}]", idx);
		let name = table.get("kind").and_then(toml::Value::as_str).unwrap_or_default();
		let kind = name
			.parse::<OracleKind>()
			.ok()
			.filter(|kind| OracleKind::ADAPTERS.contains(kind))
			.ok_or_else(|| ValidationError::InvalidValue {
				field: format!("{}.kind", field),
				message: format!("'{}' is not a configurable oracle kind", name),
			})?;

		oracle_schema(kind)
			.validate(table)
			.map_err(|e| ValidationError::InvalidValue {
				field,
				message: e.to_string(),
			})?;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn document(oracles: &str) -> toml::Value {
		let text = format!(
			r#"
name = "testnet"
chain_id = 1
oracle_order = ["yearn_lens"]

[assets]
wrapped_native = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
stablecoin = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
{}
"#,
			oracles
		);
		toml::from_str(&text).unwrap()
	}

	#[test]
	fn test_minimal_document() {
		assert!(validate_document(&document("")).is_ok());
	}

	#[test]
	fn test_unknown_oracle_kind() {
		let doc = document(
			r#"
[[oracles]]
kind = "pyth"
address = "0x83d95e0d5f402511db06817aff3f9ea88224b030"
"#,
		);
		let err = validate_document(&doc).unwrap_err();
		assert!(err.to_string().contains("oracles[0].kind"));
	}

	#[test]
	fn test_router_table_requires_routers() {
		let doc = document(
			r#"
[[oracles]]
kind = "uniswap_forks_router"
fee_bps = 30
"#,
		);
		let err = validate_document(&doc).unwrap_err();
		assert!(err.to_string().contains("routers"));
	}

	#[test]
	fn test_router_fee_upper_bound() {
		let doc = document(
			r#"
[[oracles]]
kind = "uniswap_forks_router"
fee_bps = 5000
routers = [{ address = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d" }]
"#,
		);
		assert!(validate_document(&doc).is_err());
	}

	#[test]
	fn test_synthetic_kind_rejected_in_order() {
		let mut doc = document("");
		doc.as_table_mut().unwrap().insert(
			"oracle_order".to_string(),
			toml::Value::Array(vec![toml::Value::String("averaged".to_string())]),
		);
		assert!(validate_document(&doc).is_err());
	}
}
