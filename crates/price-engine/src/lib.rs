//! The price resolution engine.
//!
//! [`PriceEngine`] walks a network's price sources in priority order, keeps
//! the quotes that did not revert, stops once it has collected the configured
//! number of quotes, and combines them into a single [`Quote`]. It holds no
//! mutable state and can be shared across tasks behind an `Arc`.

use async_trait::async_trait;
use price_config::{NetworkConfig, OracleStrategy};
use price_oracles::contract::decimals_of;
use price_oracles::{OracleError, OracleInterface, OracleService, PriceLookup, QuoteRequest, RpcReader};
use price_types::{
	decimal, Address, BlockNumber, ChainReader, Decimal, OracleKind, PriceError, Quote, U256,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

pub mod aggregate;
pub mod bounder;
pub mod overrides;

pub use bounder::bound_usd_value;
pub use overrides::OracleOverride;

/// Deepest nesting of constituent lookups, such as the coins of a pool whose
/// coins are themselves pool tokens.
pub const MAX_LOOKUP_DEPTH: usize = 3;

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("No chain reader configured for network '{0}'")]
	MissingReader(String),

	#[error("Oracle error: {0}")]
	Oracle(#[from] OracleError),
}

/// Resolves USD prices for one network.
pub struct PriceEngine {
	config: Arc<NetworkConfig>,
	oracles: OracleService,
	reader: Arc<dyn ChainReader>,
	hook: Option<Box<dyn OracleOverride>>,
}

impl PriceEngine {
	/// Builds an engine reading chain state over JSON-RPC at `rpc_url`.
	pub fn from_rpc(config: Arc<NetworkConfig>, rpc_url: &str) -> Result<Self, EngineError> {
		let reader = RpcReader::new(rpc_url)?;
		PriceEngineBuilder::new(config)
			.with_reader(Arc::new(reader))
			.build()
	}

	pub fn config(&self) -> &NetworkConfig {
		&self.config
	}

	/// Kinds of the adapters this engine can consult.
	pub fn oracle_kinds(&self) -> Vec<OracleKind> {
		self.oracles.kinds()
	}

	/// Effective order and count for `token` at `block`.
	///
	/// The programmatic hook wins over configured rules, which win over the
	/// network default.
	pub fn strategy_for(&self, token: &Address, block: Option<BlockNumber>) -> OracleStrategy {
		self.hook
			.as_ref()
			.and_then(|hook| hook.strategy_for(token, block))
			.or_else(|| self.config.override_for(token, block))
			.unwrap_or_else(|| self.config.default_strategy())
	}

	/// USD price of one whole `token`, at `block` or the latest block.
	///
	/// Never fails: when nothing can price the token the result is a
	/// reverted quote.
	pub async fn resolve_usd_price(&self, token: Address, block: Option<BlockNumber>) -> Quote {
		self.resolve(token, block, 0).await
	}

	/// USD value of `amount` whole tokens, bounded by router liquidity.
	pub async fn resolve_usd_value(
		&self,
		token: Address,
		amount: Decimal,
		block: Option<BlockNumber>,
	) -> Decimal {
		let quote = self.resolve_usd_price(token, block).await;
		bound_usd_value(&token, &quote, amount)
	}

	/// USD value of a raw integer `amount`, scaled by the token's decimals.
	pub async fn resolve_usd_value_raw(
		&self,
		token: Address,
		amount: U256,
		block: Option<BlockNumber>,
	) -> Decimal {
		let decimals = decimals_of(self.reader.as_ref(), token, block).await;
		match decimal::normalize_amount(amount, decimals) {
			Some(amount) => self.resolve_usd_value(token, amount, block).await,
			None => {
				debug!("Amount {} of {} does not fit a decimal", amount, token);
				Decimal::ZERO
			}
		}
	}

	async fn resolve(&self, token: Address, block: Option<BlockNumber>, depth: usize) -> Quote {
		if token == Address::ZERO {
			trace!("Null address is never priced");
			return Quote::reverted(OracleKind::Averaged);
		}

		if self.config.is_hardcoded_stable(&token) {
			let decimals = self.config.assets.stablecoin_decimals;
			return match decimal::pow10(u32::from(decimals)) {
				Some(one) => Quote::new(one, i32::from(decimals), OracleKind::HardcodedStable),
				None => Quote::new(Decimal::ONE, 0, OracleKind::HardcodedStable),
			};
		}

		let strategy = self.strategy_for(&token, block);
		let request = QuoteRequest {
			token,
			block,
			depth,
			lookup: self,
		};

		let mut quotes = Vec::with_capacity(strategy.count.min(strategy.order.len()));
		for kind in &strategy.order {
			let quote = self.oracles.quote(*kind, &request).await;
			if quote.is_reverted() {
				continue;
			}
			debug!(
				"[{}] {} priced at {} (depth {})",
				kind,
				token,
				quote.normalized_price(),
				depth
			);
			quotes.push(quote);
			if quotes.len() >= strategy.count {
				break;
			}
		}

		if quotes.is_empty() {
			warn!("{}", PriceError::NoQuoteFound { token });
			return Quote::reverted(OracleKind::Averaged);
		}

		aggregate::combine(quotes)
	}
}

#[async_trait]
impl PriceLookup for PriceEngine {
	async fn usd_price(&self, token: Address, block: Option<BlockNumber>, depth: usize) -> Quote {
		if depth > MAX_LOOKUP_DEPTH {
			debug!("Lookup of {} exceeds depth {}", token, MAX_LOOKUP_DEPTH);
			return Quote::reverted(OracleKind::Averaged);
		}
		self.resolve(token, block, depth).await
	}
}

/// Builder for [`PriceEngine`].
pub struct PriceEngineBuilder {
	config: Arc<NetworkConfig>,
	reader: Option<Arc<dyn ChainReader>>,
	oracles: Vec<Box<dyn OracleInterface>>,
	hook: Option<Box<dyn OracleOverride>>,
}

impl PriceEngineBuilder {
	pub fn new(config: Arc<NetworkConfig>) -> Self {
		Self {
			config,
			reader: None,
			oracles: Vec::new(),
			hook: None,
		}
	}

	pub fn with_reader(mut self, reader: Arc<dyn ChainReader>) -> Self {
		self.reader = Some(reader);
		self
	}

	/// Adds an adapter, replacing the configured adapter of the same kind.
	pub fn with_oracle(mut self, oracle: Box<dyn OracleInterface>) -> Self {
		self.oracles.push(oracle);
		self
	}

	pub fn with_override(mut self, hook: impl OracleOverride + 'static) -> Self {
		self.hook = Some(Box::new(hook));
		self
	}

	pub fn build(self) -> Result<PriceEngine, EngineError> {
		let reader = self
			.reader
			.ok_or_else(|| EngineError::MissingReader(self.config.name.clone()))?;

		let oracles = self
			.oracles
			.into_iter()
			.fold(OracleService::from_config(&self.config, reader.clone()), |service, oracle| {
				service.with_oracle(oracle)
			});

		debug!(
			"Built price engine for {} with {:?}",
			self.config.name,
			oracles.kinds()
		);

		Ok(PriceEngine {
			config: self.config,
			oracles,
			reader,
			hook: self.hook,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use price_config::{BaseAssets, OverrideRule, NATIVE_PLACEHOLDER};
	use price_types::{address, Bytes, CallError};
	use rust_decimal_macros::dec;
	use std::sync::atomic::{AtomicUsize, Ordering};

	const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
	const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
	const TOKEN: Address = address!("1111111111111111111111111111111111111111");
	const LP: Address = address!("2222222222222222222222222222222222222222");

	/// Chain reader for tests that never reach the chain.
	struct NoChain;

	#[async_trait]
	impl ChainReader for NoChain {
		async fn call(
			&self,
			_to: Address,
			_calldata: Bytes,
			_block: Option<BlockNumber>,
		) -> Result<Bytes, CallError> {
			Err(CallError::Reverted("no chain".to_string()))
		}
	}

	/// Adapter returning a fixed normalized price and counting its calls.
	struct MockOracle {
		kind: OracleKind,
		price: Option<Decimal>,
		liquidity: Decimal,
		calls: Arc<AtomicUsize>,
	}

	impl MockOracle {
		fn new(kind: OracleKind, price: Option<Decimal>) -> (Box<dyn OracleInterface>, Arc<AtomicUsize>) {
			let calls = Arc::new(AtomicUsize::new(0));
			let oracle = MockOracle {
				kind,
				price,
				liquidity: Decimal::ZERO,
				calls: calls.clone(),
			};
			(Box::new(oracle), calls)
		}
	}

	#[async_trait]
	impl OracleInterface for MockOracle {
		fn kind(&self) -> OracleKind {
			self.kind
		}

		async fn fetch_quote(&self, _request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			match self.price {
				Some(price) => Ok(Quote::new(price, 0, self.kind).with_liquidity(self.liquidity)),
				None => Err(PriceError::reverted(self.kind, "execution reverted")),
			}
		}
	}

	/// Adapter pricing a token at twice the engine's price of `inner`.
	struct NestedOracle {
		inner: Address,
	}

	#[async_trait]
	impl OracleInterface for NestedOracle {
		fn kind(&self) -> OracleKind {
			OracleKind::CurveRouter
		}

		async fn fetch_quote(&self, request: &QuoteRequest<'_>) -> Result<Quote, PriceError> {
			let inner = request.nested_price(self.inner).await;
			Ok(Quote::new(inner.normalized_price() * dec!(2), 0, self.kind()))
		}
	}

	fn config(order: Vec<OracleKind>, count: usize) -> Arc<NetworkConfig> {
		Arc::new(NetworkConfig {
			name: "testnet".to_string(),
			chain_id: 31337,
			oracle_order: order,
			oracle_count: count,
			hardcoded_stables: vec![USDC],
			assets: BaseAssets {
				native: NATIVE_PLACEHOLDER,
				wrapped_native: WETH,
				wrapped_native_decimals: 18,
				stablecoin: USDC,
				stablecoin_decimals: 6,
			},
			oracles: vec![],
			overrides: vec![],
		})
	}

	fn engine(config: Arc<NetworkConfig>, oracles: Vec<Box<dyn OracleInterface>>) -> PriceEngine {
		oracles
			.into_iter()
			.fold(
				PriceEngineBuilder::new(config).with_reader(Arc::new(NoChain)),
				|builder, oracle| builder.with_oracle(oracle),
			)
			.build()
			.unwrap()
	}

	#[test]
	fn test_build_requires_reader() {
		let result = PriceEngineBuilder::new(config(vec![], 1)).build();
		assert!(matches!(result, Err(EngineError::MissingReader(_))));
	}

	#[tokio::test]
	async fn test_resolution_is_idempotent() {
		let (yearn, _) = MockOracle::new(OracleKind::YearnLens, Some(dec!(1.5)));
		let engine = engine(config(vec![OracleKind::YearnLens], 1), vec![yearn]);

		let first = engine.resolve_usd_price(TOKEN, Some(15_000_000)).await;
		let second = engine.resolve_usd_price(TOKEN, Some(15_000_000)).await;
		assert_eq!(first, second);
		assert_eq!(first.normalized_price(), dec!(1.5));
	}

	#[tokio::test]
	async fn test_first_success_short_circuits() {
		let (yearn, yearn_calls) = MockOracle::new(OracleKind::YearnLens, Some(dec!(1.5)));
		let (chainlink, chainlink_calls) = MockOracle::new(OracleKind::ChainlinkFeed, Some(dec!(1.6)));
		let order = vec![OracleKind::YearnLens, OracleKind::ChainlinkFeed];
		let engine = engine(config(order, 1), vec![yearn, chainlink]);

		let quote = engine.resolve_usd_price(TOKEN, None).await;
		assert_eq!(quote.source, OracleKind::YearnLens);
		assert_eq!(yearn_calls.load(Ordering::SeqCst), 1);
		assert_eq!(chainlink_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_reverted_sources_are_skipped() {
		let (yearn, yearn_calls) = MockOracle::new(OracleKind::YearnLens, None);
		let (chainlink, chainlink_calls) = MockOracle::new(OracleKind::ChainlinkFeed, Some(dec!(1.6)));
		let order = vec![
			OracleKind::AaveOracle,
			OracleKind::YearnLens,
			OracleKind::ChainlinkFeed,
		];
		let engine = engine(config(order, 1), vec![yearn, chainlink]);

		let quote = engine.resolve_usd_price(TOKEN, None).await;
		assert_eq!(quote.source, OracleKind::ChainlinkFeed);
		assert_eq!(yearn_calls.load(Ordering::SeqCst), 1);
		assert_eq!(chainlink_calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_hardcoded_stable_consults_nothing() {
		let (yearn, yearn_calls) = MockOracle::new(OracleKind::YearnLens, Some(dec!(0.5)));
		let engine = engine(config(vec![OracleKind::YearnLens], 1), vec![yearn]);

		let quote = engine.resolve_usd_price(USDC, None).await;
		assert_eq!(quote.source, OracleKind::HardcodedStable);
		assert_eq!(quote.implied_decimals, 6);
		assert_eq!(quote.normalized_price(), dec!(1.00));
		assert_eq!(yearn_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_null_address_never_priced() {
		let (yearn, yearn_calls) = MockOracle::new(OracleKind::YearnLens, Some(dec!(1)));
		let engine = engine(config(vec![OracleKind::YearnLens], 1), vec![yearn]);

		assert!(engine.resolve_usd_price(Address::ZERO, None).await.is_reverted());
		assert_eq!(yearn_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_outlier_rejected_across_five_sources() {
		let prices = [
			(OracleKind::YearnLens, dec!(1.00)),
			(OracleKind::ChainlinkFeed, dec!(1.01)),
			(OracleKind::CurveCalculations, dec!(0.99)),
			(OracleKind::SushiCalculations, dec!(1.02)),
			(OracleKind::UniswapForksRouter, dec!(50.00)),
		];
		let oracles = prices
			.iter()
			.map(|(kind, price)| MockOracle::new(*kind, Some(*price)).0)
			.collect();
		let order = prices.iter().map(|(kind, _)| *kind).collect();
		let engine = engine(config(order, 5), oracles);

		let quote = engine.resolve_usd_price(TOKEN, None).await;
		assert_eq!(quote.source, OracleKind::Averaged);
		assert_eq!(quote.normalized_price(), dec!(1.005));
	}

	#[tokio::test]
	async fn test_two_sources_averaged() {
		let (yearn, _) = MockOracle::new(OracleKind::YearnLens, Some(dec!(2.00)));
		let (chainlink, _) = MockOracle::new(OracleKind::ChainlinkFeed, Some(dec!(3.00)));
		let order = vec![OracleKind::YearnLens, OracleKind::ChainlinkFeed];
		let engine = engine(config(order, 3), vec![yearn, chainlink]);

		let quote = engine.resolve_usd_price(TOKEN, None).await;
		assert_eq!(quote.normalized_price(), dec!(2.50));
	}

	#[tokio::test]
	async fn test_all_reverted_returns_reverted() {
		let kinds = [
			OracleKind::YearnLens,
			OracleKind::ChainlinkFeed,
			OracleKind::CurveCalculations,
		];
		let oracles = kinds.iter().map(|kind| MockOracle::new(*kind, None).0).collect();
		let engine = engine(config(kinds.to_vec(), 3), oracles);

		assert!(engine.resolve_usd_price(TOKEN, None).await.is_reverted());
		assert_eq!(engine.resolve_usd_value(TOKEN, dec!(10), None).await, Decimal::ZERO);
	}

	#[tokio::test]
	async fn test_router_value_bounded_by_liquidity() {
		let calls = Arc::new(AtomicUsize::new(0));
		let router = Box::new(MockOracle {
			kind: OracleKind::UniswapForksRouter,
			price: Some(dec!(10.00)),
			liquidity: dec!(500),
			calls,
		});
		let engine = engine(config(vec![OracleKind::UniswapForksRouter], 1), vec![router]);

		assert_eq!(engine.resolve_usd_value(TOKEN, dec!(100), None).await, dec!(500));
	}

	#[tokio::test]
	async fn test_direct_feed_value_not_bounded() {
		let (chainlink, _) = MockOracle::new(OracleKind::ChainlinkFeed, Some(dec!(10.00)));
		let engine = engine(config(vec![OracleKind::ChainlinkFeed], 1), vec![chainlink]);

		assert_eq!(engine.resolve_usd_value(TOKEN, dec!(100), None).await, dec!(1000));
	}

	#[tokio::test]
	async fn test_raw_value_uses_default_decimals() {
		let (chainlink, _) = MockOracle::new(OracleKind::ChainlinkFeed, Some(dec!(2)));
		let engine = engine(config(vec![OracleKind::ChainlinkFeed], 1), vec![chainlink]);

		let raw = U256::from(3u64) * U256::from(10u64).pow(U256::from(18u64));
		assert_eq!(engine.resolve_usd_value_raw(TOKEN, raw, None).await, dec!(6));
	}

	#[tokio::test]
	async fn test_raw_value_beyond_decimal_mantissa() {
		let (chainlink, _) = MockOracle::new(OracleKind::ChainlinkFeed, Some(dec!(0.00001)));
		let engine = engine(config(vec![OracleKind::ChainlinkFeed], 1), vec![chainlink]);

		let raw = U256::from(10u64).pow(U256::from(29u64));
		assert_eq!(engine.resolve_usd_value_raw(TOKEN, raw, None).await, dec!(1000000));
	}

	#[tokio::test]
	async fn test_unbounded_hook_count_uses_every_source() {
		let (yearn, _) = MockOracle::new(OracleKind::YearnLens, Some(dec!(1)));
		let (chainlink, _) = MockOracle::new(OracleKind::ChainlinkFeed, Some(dec!(3)));
		let engine = PriceEngineBuilder::new(config(vec![OracleKind::YearnLens], 1))
			.with_reader(Arc::new(NoChain))
			.with_oracle(yearn)
			.with_oracle(chainlink)
			.with_override(|_token: &Address, _block: Option<BlockNumber>| {
				Some(OracleStrategy {
					order: vec![OracleKind::YearnLens, OracleKind::ChainlinkFeed],
					count: usize::MAX,
				})
			})
			.build()
			.unwrap();

		assert_eq!(engine.resolve_usd_price(TOKEN, None).await.normalized_price(), dec!(2));
	}

	#[tokio::test]
	async fn test_configured_override_reorders_sources() {
		let (yearn, yearn_calls) = MockOracle::new(OracleKind::YearnLens, Some(dec!(1)));
		let (chainlink, _) = MockOracle::new(OracleKind::ChainlinkFeed, Some(dec!(2)));
		let mut network = (*config(vec![OracleKind::YearnLens, OracleKind::ChainlinkFeed], 1)).clone();
		network.overrides.push(OverrideRule {
			tokens: vec![TOKEN],
			oracle_order: vec![OracleKind::ChainlinkFeed, OracleKind::YearnLens],
			oracle_count: 1,
			after_block: Some(100),
			before_block: Some(200),
		});
		let engine = engine(Arc::new(network), vec![yearn, chainlink]);

		let inside = engine.resolve_usd_price(TOKEN, Some(150)).await;
		assert_eq!(inside.source, OracleKind::ChainlinkFeed);
		assert_eq!(yearn_calls.load(Ordering::SeqCst), 0);

		let outside = engine.resolve_usd_price(TOKEN, Some(250)).await;
		assert_eq!(outside.source, OracleKind::YearnLens);
	}

	#[tokio::test]
	async fn test_hook_wins_over_configuration() {
		let (yearn, _) = MockOracle::new(OracleKind::YearnLens, Some(dec!(1)));
		let (chainlink, _) = MockOracle::new(OracleKind::ChainlinkFeed, Some(dec!(3)));
		let order = vec![OracleKind::YearnLens, OracleKind::ChainlinkFeed];
		let engine = PriceEngineBuilder::new(config(order, 1))
			.with_reader(Arc::new(NoChain))
			.with_oracle(yearn)
			.with_oracle(chainlink)
			.with_override(|token: &Address, _block: Option<BlockNumber>| {
				(*token == TOKEN).then(|| OracleStrategy {
					order: vec![OracleKind::YearnLens, OracleKind::ChainlinkFeed],
					count: 2,
				})
			})
			.build()
			.unwrap();

		assert_eq!(engine.resolve_usd_price(TOKEN, None).await.normalized_price(), dec!(2));
		assert_eq!(engine.resolve_usd_price(LP, None).await.normalized_price(), dec!(1));
	}

	#[tokio::test]
	async fn test_nested_lookup_through_engine() {
		let (yearn, _) = MockOracle::new(OracleKind::YearnLens, Some(dec!(4)));
		let mut network = (*config(vec![OracleKind::YearnLens], 1)).clone();
		network.overrides.push(OverrideRule {
			tokens: vec![LP],
			oracle_order: vec![OracleKind::CurveRouter],
			oracle_count: 1,
			after_block: None,
			before_block: None,
		});
		let engine = engine(Arc::new(network), vec![yearn, Box::new(NestedOracle { inner: TOKEN })]);

		let quote = engine.resolve_usd_price(LP, None).await;
		assert_eq!(quote.source, OracleKind::CurveRouter);
		assert_eq!(quote.normalized_price(), dec!(8));
	}

	#[tokio::test]
	async fn test_self_referencing_lookup_terminates() {
		let engine = engine(
			config(vec![OracleKind::CurveRouter], 1),
			vec![Box::new(NestedOracle { inner: LP })],
		);

		assert!(engine.resolve_usd_price(LP, None).await.is_reverted());
	}
}
