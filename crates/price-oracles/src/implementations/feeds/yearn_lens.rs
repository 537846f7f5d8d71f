//! Yearn lens price oracle.
//!
//! The lens answers `getPriceUsdcRecommended`, a USDC-denominated price at
//! six decimals chosen by Yearn from its own set of calculation contracts.

use crate::contract::{call_contract, ensure_available, to_decimal, USDC_DECIMALS};
use crate::{OracleInterface, QuoteRequest};
use alloy_sol_types::sol;
use async_trait::async_trait;
use price_config::ContractSettings;
use price_types::{ChainReader, OracleKind, PriceError, Quote};
use std::sync::Arc;

sol! {
	interface IYearnLensOracle {
		function getPriceUsdcRecommended(address tokenAddress) external view returns (uint256 price);
	}
}

pub struct YearnLensOracle {
	settings: ContractSettings,
	reader: Arc<dyn ChainReader>,
}

impl YearnLensOracle {
	pub fn new(settings: ContractSettings, reader: Arc<dyn ChainReader>) -> Self {
		Self { settings, reader }
	}
}

#[async_trait]
impl OracleInterface for YearnLensOracle {
	fn kind(&self) -> OracleKind {
		OracleKind::YearnLens
	}

	async fn fetch_quote(&self, request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let lens = ensure_available(kind, &self.settings, &request.token, request.block)?;

		let price = call_contract(
			self.reader.as_ref(),
			lens,
			IYearnLensOracle::getPriceUsdcRecommendedCall {
				tokenAddress: request.token,
			},
			request.block,
		)
		.await
		.map_err(|e| PriceError::reverted(kind, e))?
		.price;

		Ok(Quote::new(to_decimal(kind, price)?, USDC_DECIMALS, kind))
	}
}
