//! Fixed-point helpers for token accounting.
//!
//! Every price and amount in the engine is a [`Decimal`]. On-chain integers
//! arrive as 256-bit words. Token amounts are scaled down while still in
//! 256-bit form, so only the whole-unit value has to fit the 96-bit mantissa.
//! Values that still do not fit are reported as `None` and callers treat them
//! as unusable data.

use alloy_primitives::{I256, U256};
pub use rust_decimal::Decimal;

/// Largest power of ten a single `Decimal` step can carry.
pub const MAX_SCALE: u32 = 28;

/// Returns `10^exp`, or `None` when `exp` exceeds [`MAX_SCALE`].
pub fn pow10(exp: u32) -> Option<Decimal> {
	if exp > MAX_SCALE {
		return None;
	}
	Some(Decimal::from_i128_with_scale(10i128.pow(exp), 0))
}

/// Narrows an unsigned 256-bit integer into a `Decimal`.
pub fn from_u256(value: U256) -> Option<Decimal> {
	let raw = u128::try_from(value).ok()?;
	let raw = i128::try_from(raw).ok()?;
	Decimal::try_from_i128_with_scale(raw, 0).ok()
}

/// Narrows a signed 256-bit integer into a `Decimal`.
pub fn from_i256(value: I256) -> Option<Decimal> {
	let raw = i128::try_from(value).ok()?;
	Decimal::try_from_i128_with_scale(raw, 0).ok()
}

/// Multiplies `value` by `10^exp`. Negative exponents divide.
///
/// Large exponents are applied in steps of [`MAX_SCALE`] so that, for
/// example, an 18-decimal amount divided by `10^36` still yields a result
/// instead of failing on the intermediate power.
pub fn shift(value: Decimal, exp: i32) -> Option<Decimal> {
	let mut result = value;
	let mut remaining = exp.unsigned_abs();

	while remaining > 0 {
		let step = remaining.min(MAX_SCALE);
		let factor = pow10(step)?;
		result = if exp > 0 {
			result.checked_mul(factor)?
		} else {
			result.checked_div(factor)?
		};
		remaining -= step;
	}

	Some(result)
}

/// Converts a raw integer token amount into whole units.
///
/// Digits below the mantissa's precision are truncated in 256-bit space
/// before narrowing.
pub fn normalize_amount(raw: U256, decimals: u8) -> Option<Decimal> {
	let max_mantissa = U256::from(Decimal::MAX.mantissa().unsigned_abs());
	let ten = U256::from(10u8);

	let mut value = raw;
	let mut exp = -i32::from(decimals);
	while value > max_mantissa {
		value /= ten;
		exp += 1;
	}

	shift(from_u256(value)?, exp)
}
