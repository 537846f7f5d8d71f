//! Chainlink Feed Registry adapter.

use crate::contract::{call_contract, ensure_available};
use crate::{OracleInterface, QuoteRequest};
use alloy_sol_types::sol;
use async_trait::async_trait;
use price_config::ContractSettings;
use price_types::{address, decimal, Address, ChainReader, OracleKind, PriceError, Quote, I256};
use std::sync::Arc;
use tracing::trace;

sol! {
	interface IFeedRegistry {
		function latestRoundData(address base, address quote)
			external
			view
			returns (uint80 roundId, int256 answer, uint256 startedAt, uint256 updatedAt, uint80 answeredInRound);
		function decimals(address base, address quote) external view returns (uint8);
	}
}

/// Denomination address the registry uses for USD.
pub const USD_DENOMINATION: Address = address!("0000000000000000000000000000000000000348");

pub struct ChainlinkFeed {
	settings: ContractSettings,
	reader: Arc<dyn ChainReader>,
}

impl ChainlinkFeed {
	pub fn new(settings: ContractSettings, reader: Arc<dyn ChainReader>) -> Self {
		Self { settings, reader }
	}
}

#[async_trait]
impl OracleInterface for ChainlinkFeed {
	fn kind(&self) -> OracleKind {
		OracleKind::ChainlinkFeed
	}

	async fn fetch_quote(&self, request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let registry = ensure_available(kind, &self.settings, &request.token, request.block)?;

		let round = call_contract(
			self.reader.as_ref(),
			registry,
			IFeedRegistry::latestRoundDataCall {
				base: request.token,
				quote: USD_DENOMINATION,
			},
			request.block,
		)
		.await
		.map_err(|e| PriceError::reverted(kind, e))?;

		if round.answer <= I256::ZERO {
			return Err(PriceError::reverted(
				kind,
				format!("non-positive answer {}", round.answer),
			));
		}

		let feed_decimals = call_contract(
			self.reader.as_ref(),
			registry,
			IFeedRegistry::decimalsCall {
				base: request.token,
				quote: USD_DENOMINATION,
			},
			request.block,
		)
		.await
		.map_err(|e| PriceError::reverted(kind, e))?
		._0;

		let answer = decimal::from_i256(round.answer).ok_or_else(|| {
			PriceError::reverted(kind, format!("answer {} does not fit a decimal", round.answer))
		})?;
		trace!("Chainlink answer {} at {} decimals", answer, feed_decimals);

		Ok(Quote::new(answer, i32::from(feed_decimals), kind))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{FixedLookup, MockReader};
	use alloy_sol_types::SolValue;
	use price_types::U256;
	use rust_decimal_macros::dec;

	const REGISTRY: Address = address!("47fb2585d2c56fe188d0e6ec628a38b74fceeedf");
	const LINK: Address = address!("514910771af9ca656af840dff83e8264ecf986ca");

	fn round_data(answer: i64) -> Vec<u8> {
		(
			U256::from(1u64),
			I256::try_from(answer).unwrap(),
			U256::from(1_700_000_000u64),
			U256::from(1_700_000_000u64),
			U256::from(1u64),
		)
			.abi_encode_params()
	}

	fn feed(answer: i64) -> ChainlinkFeed {
		let reader = MockReader::new()
			.on(
				REGISTRY,
				IFeedRegistry::latestRoundDataCall {
					base: LINK,
					quote: USD_DENOMINATION,
				},
				round_data(answer),
			)
			.on(
				REGISTRY,
				IFeedRegistry::decimalsCall {
					base: LINK,
					quote: USD_DENOMINATION,
				},
				U256::from(8u8).abi_encode(),
			);
		ChainlinkFeed::new(
			ContractSettings {
				address: REGISTRY,
				start_block: 12_864_088,
				blacklist: vec![],
			},
			Arc::new(reader),
		)
	}

	#[tokio::test]
	async fn test_quote_uses_feed_decimals() {
		let lookup = FixedLookup::default();
		let quote = feed(1_425_000_000).quote(&QuoteRequest::new(LINK, None, &lookup)).await;

		assert_eq!(quote.implied_decimals, 8);
		assert_eq!(quote.normalized_price(), dec!(14.25));
	}

	#[tokio::test]
	async fn test_non_positive_answer_reverts() {
		let lookup = FixedLookup::default();
		let request = QuoteRequest::new(LINK, None, &lookup);

		assert!(feed(0).quote(&request).await.is_reverted());
		assert!(matches!(
			feed(-5).fetch_quote(&request).await,
			Err(PriceError::SourceReverted { .. })
		));
	}

	#[tokio::test]
	async fn test_missing_feed_reverts() {
		let lookup = FixedLookup::default();
		let request = QuoteRequest::new(Address::repeat_byte(0x42), None, &lookup);

		assert!(feed(100).quote(&request).await.is_reverted());
	}
}
