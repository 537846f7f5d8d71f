//! Contract call helpers shared by the adapters.

use alloy_sol_types::{sol, SolCall};
use price_config::ContractSettings;
use price_types::{
	decimal, Address, BlockNumber, CallError, ChainReader, Decimal, OracleKind, PriceError, U256,
};

sol! {
	interface IERC20Metadata {
		function decimals() external view returns (uint8);
		function totalSupply() external view returns (uint256);
	}
}

/// Decimals assumed for tokens that do not report them.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Scale of the USDC-denominated helper contracts.
pub const USDC_DECIMALS: i32 = 6;

/// Issues a typed read-only call.
pub async fn call_contract<C: SolCall + Send>(
	reader: &dyn ChainReader,
	to: Address,
	call: C,
	block: Option<BlockNumber>,
) -> Result<C::Return, CallError> {
	let data = reader.call(to, call.abi_encode().into(), block).await?;
	C::abi_decode_returns(&data, true).map_err(|e| CallError::Decode(e.to_string()))
}

/// ERC-20 decimals of `token`, falling back to 18 when the call fails.
pub async fn decimals_of(reader: &dyn ChainReader, token: Address, block: Option<BlockNumber>) -> u8 {
	call_contract(reader, token, IERC20Metadata::decimalsCall {}, block)
		.await
		.map(|ret| ret._0)
		.unwrap_or(DEFAULT_DECIMALS)
}

/// Total supply of `token` in whole units.
pub async fn total_supply_of(
	reader: &dyn ChainReader,
	token: Address,
	block: Option<BlockNumber>,
) -> Result<Decimal, CallError> {
	let raw = call_contract(reader, token, IERC20Metadata::totalSupplyCall {}, block)
		.await?
		._0;
	let decimals = decimals_of(reader, token, block).await;
	decimal::normalize_amount(raw, decimals)
		.ok_or_else(|| CallError::Decode(format!("supply {} does not fit a decimal", raw)))
}

/// Returns the contract address when it may be asked about `token` at `block`.
pub fn ensure_available(
	kind: OracleKind,
	settings: &ContractSettings,
	token: &Address,
	block: Option<BlockNumber>,
) -> Result<Address, PriceError> {
	if !settings.is_active_at(block) {
		return Err(PriceError::unavailable(
			kind,
			format!("not active before block {}", settings.start_block),
		));
	}
	if settings.is_blacklisted(token) {
		return Err(PriceError::unavailable(kind, format!("{} is blacklisted", token)));
	}
	Ok(settings.address)
}

/// Narrows a raw on-chain value, treating overflow as a revert.
pub fn to_decimal(kind: OracleKind, value: U256) -> Result<Decimal, PriceError> {
	decimal::from_u256(value)
		.ok_or_else(|| PriceError::reverted(kind, format!("value {} does not fit a decimal", value)))
}
