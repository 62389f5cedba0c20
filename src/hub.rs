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
//! # Hub Binding
//!
//! A typed facade over the coordinator hub contract. The pipeline and the
//! lifecycle tasks depend on exactly the operations exposed here: the
//! admission view (`canRelay`), the gas budgeting views (`requiredGas`,
//! `maxPossibleCharge`, `balanceOf`), the stake lookup (`getRelay`),
//! calldata for the state-changing calls (signed and broadcast by the
//! relay itself under its nonce lock), and scans over the hub's lifecycle
//! events.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, H256, U256};

use crate::error::Result;

abigen!(
    RelayHub,
    r#"[
        function canRelay(address relay, address from, address to, bytes encodedFunction, uint256 transactionFee, uint256 gasPrice, uint256 gasLimit, uint256 nonce, bytes signature, bytes approvalData) view returns (uint256 status, bytes recipientContext)
        function relayCall(address from, address to, bytes encodedFunction, uint256 transactionFee, uint256 gasPrice, uint256 gasLimit, uint256 nonce, bytes signature, bytes approvalData)
        function requiredGas(uint256 relayedCallStipend) view returns (uint256)
        function maxPossibleCharge(uint256 relayedCallStipend, uint256 gasPrice, uint256 transactionFee) view returns (uint256)
        function balanceOf(address target) view returns (uint256)
        function getRelay(address relay) view returns (uint256 totalStake, uint256 unstakeDelay, uint256 unstakeTime, address owner, uint8 state)
        function registerRelay(uint256 transactionFee, string url)
        function removeRelayByOwner(address relay)
        event RelayAdded(address indexed relay, address indexed owner, uint256 transactionFee, uint256 stake, uint256 unstakeDelay, string url)
        event RelayRemoved(address indexed relay, uint256 unstakeTime)
        event Staked(address indexed relay, uint256 stake, uint256 unstakeDelay)
        event Unstaked(address indexed relay, uint256 stake)
        event TransactionRelayed(address indexed relay, address indexed from, address indexed to, bytes4 selector, uint256 status, uint256 charge)
    ]"#
);

/// The hub's view of a relay, as returned by `getRelay`.
#[derive(Debug, Clone, Default)]
pub struct RelayEntry {
    /// Total collateral staked for this relay.
    pub total_stake: U256,
    /// The delay between unstake request and withdrawal.
    pub unstake_delay: U256,
    /// The time at which the stake becomes withdrawable, zero while staked.
    pub unstake_time: U256,
    /// The owner who staked for this relay.
    pub owner: Address,
    /// The hub's internal relay state discriminant.
    pub state: u8,
}

/// A `RelayAdded` event observed on the hub, with its block number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRegistration {
    /// The fee the relay registered with.
    pub fee: U256,
    /// The url the relay registered with.
    pub url: String,
    /// The stake recorded at registration time.
    pub stake: U256,
    /// The block the event was emitted in.
    pub block_number: u64,
}

/// The hub operations the relay depends on.
#[async_trait]
pub trait HubClient: Send + Sync {
    /// The hub contract's address.
    fn address(&self) -> Address;

    /// The hub's own admission view. Returns the status code (zero means
    /// accepted) and the opaque recipient context.
    #[allow(clippy::too_many_arguments)]
    async fn can_relay(
        &self,
        relay: Address,
        from: Address,
        to: Address,
        encoded_function: Bytes,
        relay_fee: U256,
        gas_price: U256,
        gas_limit: U256,
        sender_nonce: U256,
        signature: Bytes,
        approval_data: Bytes,
    ) -> Result<(U256, Bytes)>;

    /// The target's deposit held by the hub.
    async fn balance_of(&self, target: Address) -> Result<U256>;

    /// Total gas a `relayCall` with the given inner stipend needs.
    async fn required_gas(&self, relayed_call_stipend: U256) -> Result<U256>;

    /// The worst-case charge the hub may collect for a relayed call.
    async fn max_possible_charge(
        &self,
        relayed_call_stipend: U256,
        gas_price: U256,
        relay_fee: U256,
    ) -> Result<U256>;

    /// The hub's stake record for a relay.
    async fn get_relay(&self, relay: Address) -> Result<RelayEntry>;

    /// ABI-encoded calldata for `relayCall`.
    #[allow(clippy::too_many_arguments)]
    fn relay_call_data(
        &self,
        from: Address,
        to: Address,
        encoded_function: Bytes,
        relay_fee: U256,
        gas_price: U256,
        gas_limit: U256,
        sender_nonce: U256,
        signature: Bytes,
        approval_data: Bytes,
    ) -> Result<Bytes>;

    /// ABI-encoded calldata for `registerRelay`.
    fn register_relay_data(&self, fee: U256, url: &str) -> Result<Bytes>;

    /// ABI-encoded calldata for `removeRelayByOwner`.
    fn remove_relay_by_owner_data(&self, relay: Address) -> Result<Bytes>;

    /// All `RelayAdded` events for the relay within the last `window`
    /// blocks, oldest first.
    async fn registrations(
        &self,
        relay: Address,
        window: u64,
    ) -> Result<Vec<RelayRegistration>>;

    /// Whether the hub has ever emitted `RelayRemoved` for the relay.
    async fn is_removed(&self, relay: Address) -> Result<bool>;

    /// Whether the hub has ever emitted `Unstaked` for the relay.
    async fn is_unstaked(&self, relay: Address) -> Result<bool>;
}

/// The production [`HubClient`], generated from the hub ABI.
#[derive(Debug, Clone)]
pub struct RelayHubClient {
    contract: RelayHub<Provider<Http>>,
    provider: Arc<Provider<Http>>,
}

impl RelayHubClient {
    /// Binds the hub contract at `address` through the given provider.
    pub fn new(address: Address, provider: Arc<Provider<Http>>) -> Self {
        let contract = RelayHub::new(address, provider.clone());
        Self { contract, provider }
    }
}

/// Addresses are left-padded to 32 bytes when used as log topics.
fn address_topic(address: Address) -> H256 {
    let mut topic = [0u8; 32];
    topic[12..].copy_from_slice(address.as_bytes());
    H256::from(topic)
}

#[async_trait]
impl HubClient for RelayHubClient {
    fn address(&self) -> Address {
        self.contract.address()
    }

    async fn can_relay(
        &self,
        relay: Address,
        from: Address,
        to: Address,
        encoded_function: Bytes,
        relay_fee: U256,
        gas_price: U256,
        gas_limit: U256,
        sender_nonce: U256,
        signature: Bytes,
        approval_data: Bytes,
    ) -> Result<(U256, Bytes)> {
        let outcome = self
            .contract
            .can_relay(
                relay,
                from,
                to,
                encoded_function,
                relay_fee,
                gas_price,
                gas_limit,
                sender_nonce,
                signature,
                approval_data,
            )
            .from(relay)
            .call()
            .await?;
        Ok(outcome)
    }

    async fn balance_of(&self, target: Address) -> Result<U256> {
        Ok(self.contract.balance_of(target).call().await?)
    }

    async fn required_gas(&self, relayed_call_stipend: U256) -> Result<U256> {
        Ok(self.contract.required_gas(relayed_call_stipend).call().await?)
    }

    async fn max_possible_charge(
        &self,
        relayed_call_stipend: U256,
        gas_price: U256,
        relay_fee: U256,
    ) -> Result<U256> {
        Ok(self
            .contract
            .max_possible_charge(relayed_call_stipend, gas_price, relay_fee)
            .call()
            .await?)
    }

    async fn get_relay(&self, relay: Address) -> Result<RelayEntry> {
        let (total_stake, unstake_delay, unstake_time, owner, state) =
            self.contract.get_relay(relay).call().await?;
        Ok(RelayEntry {
            total_stake,
            unstake_delay,
            unstake_time,
            owner,
            state,
        })
    }

    fn relay_call_data(
        &self,
        from: Address,
        to: Address,
        encoded_function: Bytes,
        relay_fee: U256,
        gas_price: U256,
        gas_limit: U256,
        sender_nonce: U256,
        signature: Bytes,
        approval_data: Bytes,
    ) -> Result<Bytes> {
        self.contract
            .relay_call(
                from,
                to,
                encoded_function,
                relay_fee,
                gas_price,
                gas_limit,
                sender_nonce,
                signature,
                approval_data,
            )
            .calldata()
            .ok_or(crate::Error::Generic("relayCall encodes no calldata"))
    }

    fn register_relay_data(&self, fee: U256, url: &str) -> Result<Bytes> {
        self.contract
            .register_relay(fee, url.to_string())
            .calldata()
            .ok_or(crate::Error::Generic("registerRelay encodes no calldata"))
    }

    fn remove_relay_by_owner_data(&self, relay: Address) -> Result<Bytes> {
        self.contract
            .remove_relay_by_owner(relay)
            .calldata()
            .ok_or(crate::Error::Generic(
                "removeRelayByOwner encodes no calldata",
            ))
    }

    async fn registrations(
        &self,
        relay: Address,
        window: u64,
    ) -> Result<Vec<RelayRegistration>> {
        let latest = self.provider.get_block_number().await?.as_u64();
        let start = latest.saturating_sub(window);
        let events = self
            .contract
            .relay_added_filter()
            .from_block(start)
            .to_block(latest)
            .topic1(address_topic(relay))
            .query_with_meta()
            .await?;
        Ok(events
            .into_iter()
            .map(|(event, meta)| RelayRegistration {
                fee: event.transaction_fee,
                url: event.url,
                stake: event.stake,
                block_number: meta.block_number.as_u64(),
            })
            .collect())
    }

    async fn is_removed(&self, relay: Address) -> Result<bool> {
        let events = self
            .contract
            .relay_removed_filter()
            .from_block(0u64)
            .topic1(address_topic(relay))
            .query()
            .await?;
        Ok(!events.is_empty())
    }

    async fn is_unstaked(&self, relay: Address) -> Result<bool> {
        let events = self
            .contract
            .unstaked_filter()
            .from_block(0u64)
            .topic1(address_topic(relay))
            .query()
            .await?;
        Ok(!events.is_empty())
    }
}
