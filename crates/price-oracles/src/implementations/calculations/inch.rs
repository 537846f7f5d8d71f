//! 1inch OffchainOracle adapter.
//!
//! `getRate` returns the rate between raw token units scaled by `1e18`, so a
//! token with `d` decimals quoted against a stablecoin with `s` decimals is
//! priced at `rate / 10^(18 + s - d)`.

use crate::contract::{call_contract, decimals_of, ensure_available, to_decimal};
use crate::{OracleInterface, QuoteRequest};
use alloy_sol_types::sol;
use async_trait::async_trait;
use price_config::{BaseAssets, ContractSettings};
use price_types::{ChainReader, OracleKind, PriceError, Quote};
use std::sync::Arc;

sol! {
	interface IOffchainOracle {
		function getRate(address srcToken, address dstToken, bool useWrappers)
			external
			view
			returns (uint256 weightedRate);
	}
}

const RATE_DECIMALS: i32 = 18;

pub struct InchOracle {
	settings: ContractSettings,
	assets: BaseAssets,
	reader: Arc<dyn ChainReader>,
}

impl InchOracle {
	pub fn new(settings: ContractSettings, assets: BaseAssets, reader: Arc<dyn ChainReader>) -> Self {
		Self {
			settings,
			assets,
			reader,
		}
	}
}

#[async_trait]
impl OracleInterface for InchOracle {
	fn kind(&self) -> OracleKind {
		OracleKind::InchOracle
	}

	async fn fetch_quote(&self, request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let oracle = ensure_available(kind, &self.settings, &request.token, request.block)?;

		let rate = call_contract(
			self.reader.as_ref(),
			oracle,
			IOffchainOracle::getRateCall {
				srcToken: request.token,
				dstToken: self.assets.stablecoin,
				useWrappers: false,
			},
			request.block,
		)
		.await
		.map_err(|e| PriceError::reverted(kind, e))?
		.weightedRate;

		let token_decimals = decimals_of(self.reader.as_ref(), request.token, request.block).await;
		let implied_decimals =
			RATE_DECIMALS + i32::from(self.assets.stablecoin_decimals) - i32::from(token_decimals);

		Ok(Quote::new(to_decimal(kind, rate)?, implied_decimals, kind))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::contract::IERC20Metadata;
	use crate::testing::{FixedLookup, MockReader};
	use alloy_sol_types::SolValue;
	use price_types::{address, Address, U256};
	use rust_decimal_macros::dec;

	const ORACLE: Address = address!("07d91f5fb9bf7798734c3f606db065549f6893bb");
	const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
	const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
	const WBTC: Address = address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599");

	fn assets() -> BaseAssets {
		BaseAssets {
			native: price_config::NATIVE_PLACEHOLDER,
			wrapped_native: WETH,
			wrapped_native_decimals: 18,
			stablecoin: USDC,
			stablecoin_decimals: 6,
		}
	}

	fn rate_call(token: Address) -> IOffchainOracle::getRateCall {
		IOffchainOracle::getRateCall {
			srcToken: token,
			dstToken: USDC,
			useWrappers: false,
		}
	}

	fn oracle(reader: MockReader) -> InchOracle {
		InchOracle::new(
			ContractSettings {
				address: ORACLE,
				start_block: 12_522_266,
				blacklist: vec![],
			},
			assets(),
			Arc::new(reader),
		)
	}

	#[tokio::test]
	async fn test_eighteen_decimal_token() {
		// 1 WETH = 2000 USDC: 2000e6 raw out per 1e18 raw in, times 1e18.
		let reader = MockReader::new()
			.on(ORACLE, rate_call(WETH), U256::from(2_000_000_000u64).abi_encode())
			.on(WETH, IERC20Metadata::decimalsCall {}, U256::from(18u8).abi_encode());
		let lookup = FixedLookup::default();

		let quote = oracle(reader).quote(&QuoteRequest::new(WETH, None, &lookup)).await;
		assert_eq!(quote.implied_decimals, 6);
		assert_eq!(quote.normalized_price(), dec!(2000));
	}

	#[tokio::test]
	async fn test_eight_decimal_token() {
		// 1 WBTC = 30000 USDC: 300 raw out per raw in, times 1e18.
		let rate = U256::from(300u64) * U256::from(10u64).pow(U256::from(18u64));
		let reader = MockReader::new()
			.on(ORACLE, rate_call(WBTC), rate.abi_encode())
			.on(WBTC, IERC20Metadata::decimalsCall {}, U256::from(8u8).abi_encode());
		let lookup = FixedLookup::default();

		let quote = oracle(reader).quote(&QuoteRequest::new(WBTC, None, &lookup)).await;
		assert_eq!(quote.implied_decimals, 16);
		assert_eq!(quote.normalized_price(), dec!(30000));
	}
}
