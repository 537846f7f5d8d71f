//! Uniswap V2 style router adapter.
//!
//! A token is priced by simulating the sale of one whole unit into the
//! reference stablecoin with `getAmountsOut`, routing through the wrapped
//! native asset when neither side of the trade is that asset. The simulated
//! output is grossed up by the per-hop trading fee. Quotes carry the depth
//! of the token's pair against the wrapped native asset as liquidity.
//!
//! Pair tokens themselves (anything answering `factory()`) are priced from
//! their reserves instead.

use crate::contract::{call_contract, decimals_of, total_supply_of, to_decimal};
use crate::{OracleInterface, QuoteRequest};
use alloy_sol_types::sol;
use async_trait::async_trait;
use price_config::{BaseAssets, RouterSettings};
use price_types::{
	decimal, Address, BlockNumber, ChainReader, Decimal, OracleKind, PriceError, Quote, U256,
};
use std::sync::Arc;
use tracing::{debug, trace};

sol! {
	interface IUniswapV2Router {
		function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] amounts);
		function factory() external view returns (address);
	}

	interface IUniswapV2Factory {
		function getPair(address tokenA, address tokenB) external view returns (address pair);
	}

	interface IUniswapV2Pair {
		function factory() external view returns (address);
		function token0() external view returns (address);
		function token1() external view returns (address);
		function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
	}
}

const BASIS_POINTS: u32 = 10_000;

/// Outcome of a simulated sale.
struct RouterPrice {
	router: Address,
	/// Fee-adjusted output in raw stablecoin units.
	amount_out: U256,
}

pub struct UniswapForksRouter {
	settings: RouterSettings,
	assets: BaseAssets,
	reader: Arc<dyn ChainReader>,
}

impl UniswapForksRouter {
	pub fn new(settings: RouterSettings, assets: BaseAssets, reader: Arc<dyn ChainReader>) -> Self {
		Self {
			settings,
			assets,
			reader,
		}
	}

	fn reader(&self) -> &dyn ChainReader {
		self.reader.as_ref()
	}

	async fn is_pair_token(&self, token: Address, block: Option<BlockNumber>) -> bool {
		if token == self.assets.wrapped_native {
			return false;
		}
		call_contract(self.reader(), token, IUniswapV2Pair::factoryCall {}, block)
			.await
			.map(|ret| ret._0 != Address::ZERO)
			.unwrap_or(false)
	}

	/// Sells one whole `token` for the stablecoin on the first router that
	/// can route it.
	async fn simulate(&self, token: Address, block: Option<BlockNumber>) -> Result<RouterPrice, PriceError> {
		let kind = OracleKind::UniswapForksRouter;
		let stable = self.assets.stablecoin;
		let wrapped = self.assets.wrapped_native;

		let (path, hops) = if token == wrapped || stable == wrapped {
			(vec![token, stable], 1)
		} else {
			(vec![token, wrapped, stable], 2)
		};

		let fees = self.settings.fee_bps.saturating_mul(hops);
		let denominator = BASIS_POINTS
			.checked_sub(fees)
			.filter(|d| *d > 0)
			.ok_or_else(|| PriceError::unavailable(kind, format!("fee of {} bps exceeds the trade", fees)))?;

		let decimals = decimals_of(self.reader(), token, block).await;
		let amount_in = U256::from(10u64).pow(U256::from(decimals));

		for router in self.settings.routers.iter().filter(|r| r.is_active_at(block)) {
			let call = IUniswapV2Router::getAmountsOutCall {
				amountIn: amount_in,
				path: path.clone(),
			};
			let amounts = match call_contract(self.reader(), router.address, call, block).await {
				Ok(ret) => ret.amounts,
				Err(e) => {
					trace!("Router {} cannot route {}: {}", router.address, token, e);
					continue;
				}
			};
			let Some(out) = amounts.last() else {
				continue;
			};

			let amount_out = out
				.checked_mul(U256::from(BASIS_POINTS))
				.map(|gross| gross / U256::from(denominator))
				.ok_or_else(|| PriceError::reverted(kind, format!("output {} overflows", out)))?;

			return Ok(RouterPrice {
				router: router.address,
				amount_out,
			});
		}

		Err(PriceError::reverted(kind, format!("no active router could route {}", token)))
	}

	/// USD price of one whole `token` according to the routers.
	async fn router_usd_price(&self, token: Address, block: Option<BlockNumber>) -> Result<Decimal, PriceError> {
		let kind = OracleKind::UniswapForksRouter;
		let simulated = self.simulate(token, block).await?;
		let amount = to_decimal(kind, simulated.amount_out)?;
		decimal::shift(amount, -i32::from(self.assets.stablecoin_decimals))
			.ok_or_else(|| PriceError::reverted(kind, "price out of range"))
	}

	/// USD depth of the wrapped native side of `token`'s pair on `router`.
	async fn pair_liquidity(&self, router: Address, token: Address, block: Option<BlockNumber>) -> Option<Decimal> {
		let wrapped = self.assets.wrapped_native;
		let reader = self.reader();

		let factory = call_contract(reader, router, IUniswapV2Router::factoryCall {}, block)
			.await
			.ok()?
			._0;
		if factory == Address::ZERO {
			return None;
		}

		let pair = call_contract(
			reader,
			factory,
			IUniswapV2Factory::getPairCall {
				tokenA: token,
				tokenB: wrapped,
			},
			block,
		)
		.await
		.ok()?
		.pair;
		if pair == Address::ZERO {
			return None;
		}

		let token0 = call_contract(reader, pair, IUniswapV2Pair::token0Call {}, block).await.ok()?._0;
		let token1 = call_contract(reader, pair, IUniswapV2Pair::token1Call {}, block).await.ok()?._0;
		let reserves = call_contract(reader, pair, IUniswapV2Pair::getReservesCall {}, block)
			.await
			.ok()?;

		let wrapped_reserve = if token0 == wrapped {
			U256::from(reserves.reserve0)
		} else if token1 == wrapped {
			U256::from(reserves.reserve1)
		} else {
			return None;
		};
		if wrapped_reserve.is_zero() {
			return None;
		}

		let wrapped_price = self.router_usd_price(wrapped, block).await.ok()?;
		decimal::normalize_amount(wrapped_reserve, self.assets.wrapped_native_decimals)?
			.checked_mul(wrapped_price)
	}

	/// Prices a pair token as its total reserve value over its supply.
	async fn pair_token_quote(&self, pair: Address, block: Option<BlockNumber>) -> Result<Quote, PriceError> {
		let kind = OracleKind::UniswapForksRouter;
		let reader = self.reader();
		let reverted = |e: price_types::CallError| PriceError::reverted(kind, e);

		let token0 = call_contract(reader, pair, IUniswapV2Pair::token0Call {}, block)
			.await
			.map_err(reverted)?
			._0;
		let token1 = call_contract(reader, pair, IUniswapV2Pair::token1Call {}, block)
			.await
			.map_err(reverted)?
			._0;
		if token0 == Address::ZERO || token1 == Address::ZERO {
			return Err(PriceError::reverted(kind, format!("pair {} has no tokens", pair)));
		}

		let reserves = call_contract(reader, pair, IUniswapV2Pair::getReservesCall {}, block)
			.await
			.map_err(reverted)?;

		let mut total = Decimal::ZERO;
		for (token, reserve) in [
			(token0, U256::from(reserves.reserve0)),
			(token1, U256::from(reserves.reserve1)),
		] {
			let price = self.router_usd_price(token, block).await?;
			let decimals = decimals_of(reader, token, block).await;
			total = decimal::normalize_amount(reserve, decimals)
				.and_then(|amount| amount.checked_mul(price))
				.and_then(|value| total.checked_add(value))
				.ok_or_else(|| PriceError::reverted(kind, "reserve value out of range"))?;
		}

		let supply = total_supply_of(reader, pair, block).await.map_err(reverted)?;
		if supply.is_zero() {
			return Err(PriceError::reverted(kind, format!("pair {} has no supply", pair)));
		}

		let price = total
			.checked_div(supply)
			.ok_or_else(|| PriceError::reverted(kind, "pair price out of range"))?;
		Ok(Quote::new(price, 0, kind))
	}
}

#[async_trait]
impl OracleInterface for UniswapForksRouter {
	fn kind(&self) -> OracleKind {
		OracleKind::UniswapForksRouter
	}

	async fn fetch_quote(&self, request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
		let kind = self.kind();
		if self.settings.blacklist.contains(&request.token) {
			return Err(PriceError::unavailable(kind, format!("{} is blacklisted", request.token)));
		}
		if !self.settings.routers.iter().any(|r| r.is_active_at(request.block)) {
			return Err(PriceError::unavailable(kind, "no router active at this block"));
		}

		let token = if request.token == self.assets.native {
			self.assets.wrapped_native
		} else {
			request.token
		};

		if self.is_pair_token(token, request.block).await {
			debug!("Pricing {} from its pair reserves", token);
			return self.pair_token_quote(token, request.block).await;
		}

		let simulated = self.simulate(token, request.block).await?;
		let quote = Quote::new(
			to_decimal(kind, simulated.amount_out)?,
			i32::from(self.assets.stablecoin_decimals),
			kind,
		);

		match self.pair_liquidity(simulated.router, token, request.block).await {
			Some(liquidity) if liquidity > Decimal::ZERO => Ok(quote.with_liquidity(liquidity)),
			_ => Ok(quote),
		}
	}
}
