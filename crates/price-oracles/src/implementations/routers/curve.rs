//! Curve pool pricing through the Curve registries.
//!
//! LP tokens are resolved to their pool through the first active registry
//! that knows them. Crypto pools are valued from their balances and the
//! price of every coin; stable pools are valued as the virtual price times
//! the price of a representative underlying coin. A token that no registry
//! knows is tried as a pool contract itself.

use crate::contract::{call_contract, decimals_of, total_supply_of, to_decimal};
use crate::{OracleInterface, QuoteRequest};
use alloy_sol_types::sol;
use async_trait::async_trait;
use price_config::CurveRouterSettings;
use price_types::{
	decimal, Address, BlockNumber, ChainReader, Decimal, OracleKind, PriceError, Quote, U256,
};
use std::sync::Arc;
use tracing::debug;

sol! {
	interface ICurveRegistry {
		function get_pool_from_lp_token(address lp_token) external view returns (address);
		function get_virtual_price_from_lp_token(address lp_token) external view returns (uint256);
		function get_underlying_coins(address pool) external view returns (address[8]);
	}

	interface ICurvePool {
		function price_oracle() external view returns (uint256);
		function coins(uint256 i) external view returns (address);
		function balances(uint256 i) external view returns (uint256);
		function get_virtual_price() external view returns (uint256);
	}

	interface ICurveMultiPool {
		function price_oracle(uint256 k) external view returns (uint256);
	}
}

/// Most coins a Curve pool holds.
const MAX_COINS: usize = 8;

/// Scale of Curve virtual prices.
const VIRTUAL_PRICE_DECIMALS: i32 = 18;

/// Picks the coin used to value a stable pool: the last coin of the first
/// contiguous run of non-null entries.
pub fn preferred_coin(coins: &[Address]) -> Option<Address> {
	coins
		.iter()
		.copied()
		.skip_while(|coin| *coin == Address::ZERO)
		.take_while(|coin| *coin != Address::ZERO)
		.last()
}

pub struct CurveRouter {
	settings: CurveRouterSettings,
	reader: Arc<dyn ChainReader>,
}

impl CurveRouter {
	pub fn new(settings: CurveRouterSettings, reader: Arc<dyn ChainReader>) -> Self {
		Self { settings, reader }
	}

	fn reader(&self) -> &dyn ChainReader {
		self.reader.as_ref()
	}

	fn active_registries(&self, block: Option<BlockNumber>) -> impl Iterator<Item = Address> + '_ {
		self.settings
			.registries
			.iter()
			.filter(move |registry| registry.is_active_at(block))
			.map(|registry| registry.address)
	}

	async fn pool_of(&self, lp_token: Address, block: Option<BlockNumber>) -> Option<Address> {
		for registry in self.active_registries(block) {
			let call = ICurveRegistry::get_pool_from_lp_tokenCall { lp_token };
			if let Ok(ret) = call_contract(self.reader(), registry, call, block).await {
				if ret._0 != Address::ZERO {
					return Some(ret._0);
				}
			}
		}
		None
	}

	async fn is_crypto_pool(&self, pool: Address, block: Option<BlockNumber>) -> bool {
		if call_contract(self.reader(), pool, ICurvePool::price_oracleCall {}, block)
			.await
			.is_ok()
		{
			return true;
		}
		call_contract(
			self.reader(),
			pool,
			ICurveMultiPool::price_oracleCall { k: U256::ZERO },
			block,
		)
		.await
		.is_ok()
	}

	async fn virtual_price(&self, lp_token: Address, block: Option<BlockNumber>) -> Option<U256> {
		for registry in self.active_registries(block) {
			let call = ICurveRegistry::get_virtual_price_from_lp_tokenCall { lp_token };
			if let Ok(ret) = call_contract(self.reader(), registry, call, block).await {
				return Some(ret._0);
			}
		}
		None
	}

	async fn underlying_coins(&self, pool: Address, block: Option<BlockNumber>) -> Option<[Address; MAX_COINS]> {
		for registry in self.active_registries(block) {
			let call = ICurveRegistry::get_underlying_coinsCall { pool };
			if let Ok(ret) = call_contract(self.reader(), registry, call, block).await {
				if ret._0.iter().any(|coin| *coin != Address::ZERO) {
					return Some(ret._0);
				}
			}
		}
		None
	}

	/// Coins of `pool`, read one index at a time until the pool runs out.
	async fn pool_coins(&self, pool: Address, block: Option<BlockNumber>) -> Vec<Address> {
		let mut coins = Vec::new();
		for i in 0..MAX_COINS {
			let call = ICurvePool::coinsCall { i: U256::from(i) };
			match call_contract(self.reader(), pool, call, block).await {
				Ok(ret) if ret._0 != Address::ZERO => coins.push(ret._0),
				_ => break,
			}
		}
		coins
	}

	/// Values a crypto pool LP token as the pool's holdings over the LP supply.
	async fn crypto_pool_quote(
		&self,
		lp_token: Address,
		pool: Address,
		request: &QuoteRequest<'_>,
	) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let block = request.block;
		let out_of_range = || PriceError::reverted(kind, "pool value out of range");

		let coins = self.pool_coins(pool, block).await;
		if coins.is_empty() {
			return Err(PriceError::reverted(kind, format!("pool {} lists no coins", pool)));
		}

		let mut total = Decimal::ZERO;
		for (i, coin) in coins.into_iter().enumerate() {
			let balance = call_contract(self.reader(), pool, ICurvePool::balancesCall { i: U256::from(i) }, block)
				.await
				.map(|ret| ret._0)
				.unwrap_or(U256::ZERO);
			if balance.is_zero() {
				continue;
			}

			let price = request.nested_price(coin).await;
			if price.is_reverted() {
				return Err(PriceError::reverted(kind, format!("no price for pool coin {}", coin)));
			}

			let decimals = decimals_of(self.reader(), coin, block).await;
			total = decimal::normalize_amount(balance, decimals)
				.and_then(|amount| amount.checked_mul(price.normalized_price()))
				.and_then(|value| total.checked_add(value))
				.ok_or_else(out_of_range)?;
		}

		let supply = total_supply_of(self.reader(), lp_token, block)
			.await
			.map_err(|e| PriceError::reverted(kind, e))?;
		if supply.is_zero() {
			return Err(PriceError::reverted(kind, format!("{} has no supply", lp_token)));
		}

		let price = total.checked_div(supply).ok_or_else(out_of_range)?;
		Ok(Quote::new(price, 0, kind))
	}

	/// Values `virtual_price` units of `coin`.
	async fn virtual_price_quote(
		&self,
		virtual_price: U256,
		coin: Option<Address>,
		request: &QuoteRequest<'_>,
	) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let coin = coin.ok_or_else(|| PriceError::reverted(kind, "pool has no underlying coin"))?;

		let base = request.nested_price(coin).await;
		if base.is_reverted() {
			return Err(PriceError::reverted(kind, format!("no price for underlying coin {}", coin)));
		}

		let price = to_decimal(kind, virtual_price)?
			.checked_mul(base.normalized_price())
			.ok_or_else(|| PriceError::reverted(kind, "virtual price out of range"))?;
		Ok(Quote::new(price, VIRTUAL_PRICE_DECIMALS, kind))
	}

	async fn stable_pool_quote(
		&self,
		lp_token: Address,
		pool: Address,
		request: &QuoteRequest<'_>,
	) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let virtual_price = self
			.virtual_price(lp_token, request.block)
			.await
			.ok_or_else(|| PriceError::reverted(kind, format!("no virtual price for {}", lp_token)))?;
		let coin = self
			.underlying_coins(pool, request.block)
			.await
			.and_then(|coins| preferred_coin(&coins));

		self.virtual_price_quote(virtual_price, coin, request).await
	}

	/// Treats `token` as a pool contract that is its own LP token.
	async fn pool_token_quote(&self, token: Address, request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let virtual_price = call_contract(self.reader(), token, ICurvePool::get_virtual_priceCall {}, request.block)
			.await
			.map_err(|_| PriceError::unavailable(kind, format!("{} is not a Curve token", token)))?
			._0;
		let coins = self.pool_coins(token, request.block).await;

		self.virtual_price_quote(virtual_price, preferred_coin(&coins), request)
			.await
	}
}

#[async_trait]
impl OracleInterface for CurveRouter {
	fn kind(&self) -> OracleKind {
		OracleKind::CurveRouter
	}

	async fn fetch_quote(&self, request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
		let kind = self.kind();
		let token = request.token;
		if self.settings.blacklist.contains(&token) {
			return Err(PriceError::unavailable(kind, format!("{} is blacklisted", token)));
		}
		if self.active_registries(request.block).next().is_none() {
			return Err(PriceError::unavailable(kind, "no registry active at this block"));
		}

		let Some(pool) = self.pool_of(token, request.block).await else {
			return self.pool_token_quote(token, request).await;
		};

		if self.is_crypto_pool(pool, request.block).await {
			debug!("Pricing {} from crypto pool {}", token, pool);
			self.crypto_pool_quote(token, pool, request).await
		} else {
			debug!("Pricing {} from the virtual price of pool {}", token, pool);
			self.stable_pool_quote(token, pool, request).await
		}
	}
}
