//! Yearn's SushiSwap calculations contract, answering in USDC at six decimals.

use crate::contract::{call_contract, ensure_available, to_decimal, USDC_DECIMALS};
use crate::{OracleInterface, QuoteRequest};
use alloy_sol_types::sol;
use async_trait::async_trait;
use price_config::ContractSettings;
use price_types::{ChainReader, OracleKind, PriceError, Quote};
use std::sync::Arc;

sol! {
	interface ICalculationsSushiswap {
		function getPriceUsdc(address tokenAddress) external view returns (uint256);
	}
}

pub struct SushiCalculations {
	settings: ContractSettings,
	reader: Arc<dyn ChainReader>,
}

impl SushiCalculations {
	pub fn new(settings: ContractSettings, reader: Arc<dyn ChainReader>) -> Self {
		Self { settings, reader }
	}
}

#[async_trait]
impl OracleInterface for SushiCalculations {
	fn kind(&self) -> OracleKind {
		OracleKind::SushiCalculations
	}

	async fn fetch_quote(&self, request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let calculations = ensure_available(kind, &self.settings, &request.token, request.block)?;

		let price = call_contract(
			self.reader.as_ref(),
			calculations,
			ICalculationsSushiswap::getPriceUsdcCall {
				tokenAddress: request.token,
			},
			request.block,
		)
		.await
		.map_err(|e| PriceError::reverted(kind, e))?
		._0;

		Ok(Quote::new(to_decimal(kind, price)?, USDC_DECIMALS, kind))
	}
}
