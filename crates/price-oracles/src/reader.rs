//! JSON-RPC backed [`ChainReader`].

use crate::OracleError;
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{BlockId, TransactionRequest};
use alloy_transport_http::Http;
use async_trait::async_trait;
use price_types::{Address, BlockNumber, Bytes, CallError, ChainReader};
use tracing::trace;

/// Issues `eth_call`s over HTTP.
pub struct RpcReader {
	provider: RootProvider<Http<reqwest::Client>>,
}

impl RpcReader {
	pub fn new(rpc_url: &str) -> Result<Self, OracleError> {
		let url = rpc_url
			.parse()
			.map_err(|e| OracleError::InvalidUrl(format!("{}: {}", rpc_url, e)))?;

		Ok(Self {
			provider: RootProvider::new_http(url),
		})
	}
}

#[async_trait]
impl ChainReader for RpcReader {
	async fn call(
		&self,
		to: Address,
		calldata: Bytes,
		block: Option<BlockNumber>,
	) -> Result<Bytes, CallError> {
		let tx = TransactionRequest::default().to(to).input(calldata.into());
		let block_id = block.map(BlockId::number).unwrap_or_else(BlockId::latest);
		trace!("eth_call to {} at {:?}", to, block_id);

		self.provider
			.call(&tx)
			.block(block_id)
			.await
			.map_err(|e| match e.as_error_resp() {
				// The node executed the call and it reverted.
				Some(payload) => CallError::Reverted(payload.message.to_string()),
				None => CallError::Transport(e.to_string()),
			})
	}
}
