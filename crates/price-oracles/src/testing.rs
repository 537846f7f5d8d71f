//! Test doubles for adapter tests.

use crate::PriceLookup;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use price_types::{Address, BlockNumber, Bytes, CallError, ChainReader, OracleKind, Quote};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Chain reader answering exact `(address, calldata)` pairs.
///
/// Any call without a registered answer reverts.
#[derive(Default)]
pub struct MockReader {
	responses: HashMap<(Address, Vec<u8>), Vec<u8>>,
	calls: AtomicUsize,
}

impl MockReader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on<C: SolCall>(mut self, to: Address, call: C, returns: Vec<u8>) -> Self {
		self.responses.insert((to, call.abi_encode()), returns);
		self
	}

	pub fn call_count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ChainReader for MockReader {
	async fn call(
		&self,
		to: Address,
		calldata: Bytes,
		_block: Option<BlockNumber>,
	) -> Result<Bytes, CallError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.responses
			.get(&(to, calldata.to_vec()))
			.map(|data| Bytes::from(data.clone()))
			.ok_or_else(|| CallError::Reverted("execution reverted".to_string()))
	}
}

/// Price lookup backed by a fixed table of quotes.
#[derive(Default)]
pub struct FixedLookup {
	quotes: HashMap<Address, Quote>,
}

impl FixedLookup {
	pub fn with(mut self, token: Address, quote: Quote) -> Self {
		self.quotes.insert(token, quote);
		self
	}
}

#[async_trait]
impl PriceLookup for FixedLookup {
	async fn usd_price(&self, token: Address, _block: Option<BlockNumber>, _depth: usize) -> Quote {
		self.quotes
			.get(&token)
			.cloned()
			.unwrap_or_else(|| Quote::reverted(OracleKind::Averaged))
	}
}
