//! Aave price oracle adapter. Prices are USD at 8 decimals.

use crate::contract::{call_contract, ensure_available, to_decimal};
use crate::{OracleInterface, QuoteRequest};
use alloy_sol_types::sol;
use async_trait::async_trait;
use price_config::ContractSettings;
use price_types::{ChainReader, OracleKind, PriceError, Quote};
use std::sync::Arc;

sol! {
	interface IAaveOracle {
		function getAssetPrice(address asset) external view returns (uint256);
	}
}

const AAVE_DECIMALS: i32 = 8;

pub struct AaveOracle {
	settings: ContractSettings,
	reader: Arc<dyn ChainReader>,
}

impl AaveOracle {
	pub fn new(settings: ContractSettings, reader: Arc<dyn ChainReader>) -> Self {
		Self { settings, reader }
	}
}

#[async_trait]
impl OracleInterface for AaveOracle {
	fn kind(&self) -> OracleKind {
		OracleKind::AaveOracle
	}

	async fn fetch_quote(&self, request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let oracle = ensure_available(kind, &self.settings, &request.token, request.block)?;

		let price = call_contract(
			self.reader.as_ref(),
			oracle,
			IAaveOracle::getAssetPriceCall {
				asset: request.token,
			},
			request.block,
		)
		.await
		.map_err(|e| PriceError::reverted(kind, e))?
		._0;

		Ok(Quote::new(to_decimal(kind, price)?, AAVE_DECIMALS, kind))
	}
}
