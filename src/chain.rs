// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
//! # Chain Client Adapter
//!
//! A thin, typed wrapper over the Ethereum JSON-RPC provider. Besides
//! passing calls through, it corrects two systematic node behaviours:
//!
//! * `eth_estimateGas` runs the call against a view of state that differs
//!   from execution state (`msg.sender.balance`, for example), so every
//!   estimate is padded by a fixed constant, and
//! * some nodes report a suggested gas price of zero on quiet dev chains,
//!   so zero is substituted with the configured floor.

use async_trait::async_trait;
use ethers::providers::{JsonRpcClient, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Block, BlockId, BlockNumber, Bytes, Transaction,
    TransactionReceipt, H256, U256,
};

use crate::error::Result;

/// Padding added to every node gas estimate.
pub const GAS_ESTIMATE_PAD: u64 = 20_000;

/// The capability set the relay needs from a chain node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The node-suggested gas price, floored at the configured default.
    async fn suggest_gas_price(&self) -> Result<U256>;
    /// Gas estimate for a call, padded against view-vs-execution divergence.
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256>;
    /// The account's nonce including pending transactions.
    async fn pending_nonce_at(&self, account: Address) -> Result<u64>;
    /// The account's nonce at a specific block, or at the latest block when
    /// `block` is `None`.
    async fn nonce_at(&self, account: Address, block: Option<u64>)
        -> Result<u64>;
    /// The account's balance at the latest block.
    async fn balance_at(&self, account: Address) -> Result<U256>;
    /// A block header, latest when `number` is `None`.
    async fn header_by_number(&self, number: Option<u64>)
        -> Result<Block<H256>>;
    /// A full block with transactions, latest when `number` is `None`.
    async fn block_by_number(
        &self,
        number: Option<u64>,
    ) -> Result<Block<Transaction>>;
    /// Looks a transaction up by hash.
    async fn transaction_by_hash(
        &self,
        hash: H256,
    ) -> Result<Option<Transaction>>;
    /// Looks a transaction receipt up by hash.
    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>>;
    /// Broadcasts a signed raw transaction, returning its hash.
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256>;
    /// The chain ID used for replay-protected signing.
    async fn network_id(&self) -> Result<U256>;
}

/// The production [`ChainClient`], backed by an ethers provider.
#[derive(Debug, Clone)]
pub struct EthClient<P> {
    provider: Provider<P>,
    default_gas_price: U256,
}

impl<P: JsonRpcClient> EthClient<P> {
    /// Wraps a provider with the given gas price floor.
    pub fn new(provider: Provider<P>, default_gas_price: U256) -> Self {
        Self {
            provider,
            default_gas_price,
        }
    }
}

fn block_id(number: Option<u64>) -> BlockId {
    match number {
        Some(n) => BlockId::Number(BlockNumber::Number(n.into())),
        None => BlockId::Number(BlockNumber::Latest),
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> ChainClient for EthClient<P> {
    async fn suggest_gas_price(&self) -> Result<U256> {
        let gas_price = self.provider.get_gas_price().await?;
        if gas_price.is_zero() {
            tracing::debug!(
                gas_price = %self.default_gas_price,
                "node suggested a zero gas price, using the configured floor"
            );
            return Ok(self.default_gas_price);
        }
        Ok(gas_price)
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256> {
        let gas = self.provider.estimate_gas(tx, None).await?;
        Ok(gas + U256::from(GAS_ESTIMATE_PAD))
    }

    async fn pending_nonce_at(&self, account: Address) -> Result<u64> {
        let nonce = self
            .provider
            .get_transaction_count(
                account,
                Some(BlockId::Number(BlockNumber::Pending)),
            )
            .await?;
        Ok(nonce.as_u64())
    }

    async fn nonce_at(
        &self,
        account: Address,
        block: Option<u64>,
    ) -> Result<u64> {
        let nonce = self
            .provider
            .get_transaction_count(account, Some(block_id(block)))
            .await?;
        Ok(nonce.as_u64())
    }

    async fn balance_at(&self, account: Address) -> Result<U256> {
        Ok(self.provider.get_balance(account, None).await?)
    }

    async fn header_by_number(
        &self,
        number: Option<u64>,
    ) -> Result<Block<H256>> {
        let block = self
            .provider
            .get_block(block_id(number))
            .await?
            .ok_or(crate::Error::Generic("block not found"))?;
        Ok(block)
    }

    async fn block_by_number(
        &self,
        number: Option<u64>,
    ) -> Result<Block<Transaction>> {
        let block = self
            .provider
            .get_block_with_txs(block_id(number))
            .await?
            .ok_or(crate::Error::Generic("block not found"))?;
        Ok(block)
    }

    async fn transaction_by_hash(
        &self,
        hash: H256,
    ) -> Result<Option<Transaction>> {
        Ok(self.provider.get_transaction(hash).await?)
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>> {
        Ok(self.provider.get_transaction_receipt(hash).await?)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        let pending = self.provider.send_raw_transaction(raw).await?;
        Ok(pending.tx_hash())
    }

    async fn network_id(&self) -> Result<U256> {
        Ok(self.provider.get_chainid().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::MockProvider;
    use ethers::types::TransactionRequest;

    fn mocked_client() -> (EthClient<MockProvider>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (EthClient::new(provider, U256::from(1_000_000_000u64)), mock)
    }

    #[tokio::test]
    async fn pads_node_gas_estimates() {
        let (client, mock) = mocked_client();
        mock.push(U256::from(50_000u64)).unwrap();
        let tx: TypedTransaction = TransactionRequest::new().into();
        let gas = client.estimate_gas(&tx).await.unwrap();
        assert_eq!(gas, U256::from(50_000 + GAS_ESTIMATE_PAD));
    }

    #[tokio::test]
    async fn substitutes_the_floor_for_zero_gas_prices() {
        let (client, mock) = mocked_client();
        mock.push(U256::zero()).unwrap();
        let price = client.suggest_gas_price().await.unwrap();
        assert_eq!(price, U256::from(1_000_000_000u64));
    }

    #[tokio::test]
    async fn passes_non_zero_gas_prices_through() {
        let (client, mock) = mocked_client();
        mock.push(U256::from(7u64)).unwrap();
        let price = client.suggest_gas_price().await.unwrap();
        assert_eq!(price, U256::from(7u64));
    }

    #[tokio::test]
    async fn reads_nonces_as_u64() {
        let (client, mock) = mocked_client();
        mock.push(U256::from(42u64)).unwrap();
        let nonce =
            client.pending_nonce_at(Address::random()).await.unwrap();
        assert_eq!(nonce, 42);
    }
}
