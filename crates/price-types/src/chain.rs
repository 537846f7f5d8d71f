//! Read-only access to on-chain state.
//!
//! Every adapter talks to the chain through [`ChainReader`]. The engine never
//! retries: a failed call is final for the quote being computed.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use thiserror::Error;

/// Block height used to pin historical reads. `None` means latest.
pub type BlockNumber = u64;

/// Errors that can occur while reading contract state.
#[derive(Debug, Error)]
pub enum CallError {
	/// The call executed and reverted.
	#[error("Call reverted: {0}")]
	Reverted(String),
	/// The node could not be reached or returned an RPC error.
	#[error("Transport error: {0}")]
	Transport(String),
	/// The call returned data that does not match the expected ABI.
	#[error("Decode error: {0}")]
	Decode(String),
}

/// Capability for issuing read-only contract calls.
#[async_trait]
pub trait ChainReader: Send + Sync {
	/// Executes `calldata` against `to` at `block`, returning the raw return data.
	async fn call(
		&self,
		to: Address,
		calldata: Bytes,
		block: Option<BlockNumber>,
	) -> Result<Bytes, CallError>;
}
