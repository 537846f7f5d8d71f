//! Combining several quotes into one.

use price_types::{Decimal, OracleKind, Quote};

/// Combines the collected quotes for one token.
///
/// One quote is returned unchanged. Two are averaged. Three or more are
/// reduced to their tightest cluster first (see [`closest_window`]) and the
/// cluster is averaged. Averaged quotes are already normalized, carry no
/// liquidity and are tagged [`OracleKind::Averaged`]. No quotes, or an
/// average that cannot be represented, yields a reverted quote.
pub fn combine(mut quotes: Vec<Quote>) -> Quote {
	match quotes.len() {
		0 => Quote::reverted(OracleKind::Averaged),
		1 => quotes.remove(0),
		2 => averaged(&quotes.iter().map(Quote::normalized_price).collect::<Vec<_>>()),
		_ => {
			let mut prices: Vec<Decimal> = quotes.iter().map(Quote::normalized_price).collect();
			prices.sort();
			averaged(closest_window(&prices))
		}
	}
}

/// Tightest contiguous window of ascending `prices`.
///
/// With `n` prices the window spans `ceil(n / 2)` adjacent gaps, so it holds
/// one more price than that (never more than `n`). Among equally tight
/// windows the lowest one wins.
pub fn closest_window(prices: &[Decimal]) -> &[Decimal] {
	let n = prices.len();
	if n == 0 {
		return prices;
	}
	let size = (n.div_ceil(2) + 1).min(n);

	let mut best = 0;
	let mut best_spread: Option<Decimal> = None;
	for (start, window) in prices.windows(size).enumerate() {
		let spread = window[size - 1] - window[0];
		if best_spread.map_or(true, |current| spread < current) {
			best = start;
			best_spread = Some(spread);
		}
	}

	&prices[best..best + size]
}

/// Exact arithmetic mean; `None` on an empty slice or overflow.
pub fn mean(prices: &[Decimal]) -> Option<Decimal> {
	if prices.is_empty() {
		return None;
	}
	let sum = prices
		.iter()
		.try_fold(Decimal::ZERO, |acc, price| acc.checked_add(*price))?;
	sum.checked_div(Decimal::from(prices.len()))
}

fn averaged(prices: &[Decimal]) -> Quote {
	match mean(prices) {
		Some(price) => Quote::new(price, 0, OracleKind::Averaged),
		None => Quote::reverted(OracleKind::Averaged),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn quote(price: Decimal, kind: OracleKind) -> Quote {
		Quote::new(price, 0, kind)
	}

	#[test]
	fn test_single_quote_unchanged() {
		let original = Quote::new(dec!(1500000), 6, OracleKind::YearnLens);
		assert_eq!(combine(vec![original.clone()]), original);
	}

	#[test]
	fn test_two_quotes_exact_mean() {
		let combined = combine(vec![
			quote(dec!(2.00), OracleKind::YearnLens),
			Quote::new(dec!(300000000), 8, OracleKind::ChainlinkFeed),
		]);
		assert_eq!(combined.source, OracleKind::Averaged);
		assert_eq!(combined.normalized_price(), dec!(2.50));
	}

	#[test]
	fn test_outlier_rejected() {
		let combined = combine(vec![
			quote(dec!(1.00), OracleKind::YearnLens),
			quote(dec!(1.01), OracleKind::ChainlinkFeed),
			quote(dec!(0.99), OracleKind::CurveCalculations),
			quote(dec!(1.02), OracleKind::SushiCalculations),
			quote(dec!(50.00), OracleKind::UniswapForksRouter),
		]);
		assert_eq!(combined.source, OracleKind::Averaged);
		assert_eq!(combined.normalized_price(), dec!(1.005));
		assert!(combined.liquidity_usd.is_zero());
	}

	#[test]
	fn test_window_sizes() {
		let three = [dec!(1), dec!(2), dec!(3)];
		assert_eq!(closest_window(&three).len(), 3);

		let four = [dec!(1), dec!(2), dec!(3), dec!(100)];
		assert_eq!(closest_window(&four), &[dec!(1), dec!(2), dec!(3)]);

		let six = [dec!(1), dec!(40), dec!(41), dec!(42), dec!(43), dec!(44)];
		assert_eq!(closest_window(&six), &[dec!(40), dec!(41), dec!(42), dec!(43)]);
	}

	#[test]
	fn test_ties_prefer_lowest_window() {
		let prices = [dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)];
		assert_eq!(closest_window(&prices), &[dec!(1), dec!(2), dec!(3), dec!(4)]);
	}

	#[test]
	fn test_empty_and_overflow() {
		assert!(combine(vec![]).is_reverted());
		assert_eq!(mean(&[]), None);
		assert_eq!(mean(&[Decimal::MAX, Decimal::MAX]), None);
	}
}
