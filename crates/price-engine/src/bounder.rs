//! Liquidity bounding for router-derived values.

use price_types::{Address, Decimal, Quote};
use tracing::debug;

/// USD value of `amount` whole tokens at `quote`.
///
/// Router quotes that report liquidity cannot realize more than that
/// liquidity: when `price × amount` exceeds it, the value is capped at the
/// liquidity (an effective per-unit price of `liquidity / amount`). Quotes
/// from other sources, and router quotes without liquidity, are plain
/// multiplications. Returns zero for reverted quotes or on overflow.
pub fn bound_usd_value(token: &Address, quote: &Quote, amount: Decimal) -> Decimal {
	if quote.is_reverted() {
		return Decimal::ZERO;
	}
	let Some(naive) = quote.normalized_price().checked_mul(amount) else {
		debug!("USD value of {} {} overflows", amount, token);
		return Decimal::ZERO;
	};

	let liquidity = quote.liquidity_usd;
	if quote.is_liquidity_backed() && liquidity > Decimal::ZERO && naive > liquidity {
		debug!(
			"Capping {} value {} at {} of {} liquidity",
			token, naive, liquidity, quote.source
		);
		return liquidity;
	}

	naive
}
