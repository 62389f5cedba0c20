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
//! # Relay Server Module
//!
//! The engine of the daemon. [`RelayServer`] owns the signing key, the
//! chain client, the hub binding and the transaction store, and exposes:
//!
//! * the submission pipeline ([`RelayServer::create_relay_transaction`]):
//!   admission checks, gas budgeting, nonce allocation, signing, broadcast
//!   and durable record of exactly one transaction per accepted request,
//! * the reconciler ([`RelayServer::update_unconfirmed_transactions`]):
//!   prunes deeply confirmed records and rebroadcasts stuck ones with an
//!   escalated gas price on the same nonce, and
//! * the lifecycle operations the background tasks are built from:
//!   registration, stake and removal queries, gas price refresh, and the
//!   final balance drain to the owner.
//!
//! A single nonce lock guards the composite poll → allocate → build → sign
//! → send → persist sequence, and is held across the RPC and disk I/O on
//! purpose: nonce assignment and the durable record must be atomic with
//! respect to concurrent requests, or the reconciler could double-spend a
//! nonce after a restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Bytes, Transaction, TransactionRequest, H256, U256, U64,
};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::chain::ChainClient;
use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::hub::{HubClient, RelayRegistration};
use crate::probe;
use crate::store::{system_clock, Clock, TxStore};
use crate::utils::data_gas_cost;

/// How long to poll for a receipt before giving up and returning anyway.
pub const TX_RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);
/// Minimum age of a stored transaction before the reconciler bumps it.
pub const PENDING_TX_TIMEOUT_SECS: u64 = 300;
/// Block depth at which a stored transaction counts as permanently
/// confirmed and is pruned.
pub const CONFIRMATIONS_NEEDED: u64 = 12;
/// Percent added to the gas price on every resend.
pub const RETRY_BUMP_PERCENT: u64 = 20;
/// Gas of a basic value transfer, used by the owner drain.
const BASIC_TX_GAS: u64 = 21_000;

/// The resend gas price is never escalated past this (100 gwei).
pub fn max_gas_price() -> U256 {
    U256::from(100_000_000_000u64)
}

/// The relay refuses to serve until its balance exceeds this (0.1 ETH).
pub fn minimum_relay_balance() -> U256 {
    U256::exp10(17)
}

/// An external relay request, decoded from the `/relay` endpoint body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelayTransactionRequest {
    /// The ABI-encoded inner call the user wants executed.
    pub encoded_function: Bytes,
    /// Opaque approval data forwarded to the recipient's acceptance check.
    #[serde(default)]
    pub approval_data: Bytes,
    /// The user's signature over the relay request.
    pub signature: Bytes,
    /// The user on whose behalf the call is relayed.
    pub from: Address,
    /// The recipient contract.
    pub to: Address,
    /// The gas price the user is willing to pay.
    #[serde(with = "crate::utils::dec_u256")]
    pub gas_price: U256,
    /// The user's declared gas cap for the inner call.
    #[serde(with = "crate::utils::dec_u256")]
    pub gas_limit: U256,
    /// The hub-maintained per-user replay counter.
    #[serde(with = "crate::utils::dec_u256")]
    pub sender_nonce: U256,
    /// The client's cap on the relay's own transaction nonce.
    #[serde(with = "crate::utils::dec_u256")]
    pub relay_max_nonce: U256,
    /// The fee the user offers the relay, in percent over raw gas cost.
    #[serde(with = "crate::utils::dec_u256")]
    pub relay_fee: U256,
    /// The hub the request wants to be relayed through.
    pub relay_hub_address: Address,
}

/// The success payload of the `/relay` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelayTransactionResponse {
    /// The signed relay transaction.
    pub signed_tx: Transaction,
    /// Its canonical wire-format bytes, ready for rebroadcast.
    pub raw_tx_bytes: Bytes,
}

/// The relay daemon's engine. See the module docs.
pub struct RelayServer {
    config: RelayConfig,
    wallet: LocalWallet,
    address: Address,
    chain: Arc<dyn ChainClient>,
    hub: Arc<dyn HubClient>,
    store: Arc<dyn TxStore>,
    chain_id: u64,
    clock: Clock,
    /// Last computed effective gas price; absent until the first refresh.
    gas_price: parking_lot::RwLock<Option<U256>>,
    /// The owner address; may stay unset until the first stake lookup.
    owner: parking_lot::RwLock<Option<Address>>,
    /// Highest nonce this relay has allocated. The mutex also serializes
    /// the whole allocate/sign/send/persist critical section.
    last_nonce: Mutex<u64>,
    ready: AtomicBool,
    removed: AtomicBool,
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("ready", &self.ready.load(Ordering::Relaxed))
            .field("removed", &self.removed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RelayServer {
    /// Creates the relay engine. Fails in dev mode when pointed at a chain
    /// with an ID below 1000, as a guard against accidentally replaying dev
    /// traffic on a public network.
    pub fn new(
        config: RelayConfig,
        wallet: LocalWallet,
        chain: Arc<dyn ChainClient>,
        hub: Arc<dyn HubClient>,
        store: Arc<dyn TxStore>,
        chain_id: u64,
        clock: Option<Clock>,
    ) -> Result<Self> {
        if config.dev_mode && chain_id < 1000 {
            return Err(Error::Generic(
                "refusing to run in dev mode against a chain with ID below 1000",
            ));
        }
        let wallet = wallet.with_chain_id(chain_id);
        let address = wallet.address();
        let owner = config.configured_owner();
        Ok(Self {
            config,
            wallet,
            address,
            chain,
            hub,
            store,
            chain_id,
            clock: clock.unwrap_or_else(system_clock),
            gas_price: parking_lot::RwLock::new(None),
            owner: parking_lot::RwLock::new(owner),
            last_nonce: Mutex::new(0),
            ready: AtomicBool::new(false),
            removed: AtomicBool::new(false),
        })
    }

    /// The relay's on-chain identity.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The hub this relay serves.
    pub fn hub_address(&self) -> Address {
        self.config.hub_address
    }

    /// The relay's configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Whether the relay runs in dev mode.
    pub fn dev_mode(&self) -> bool {
        self.config.dev_mode
    }

    /// Current unix time on the relay's clock.
    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    /// The owner address, if configured or already discovered.
    pub fn owner(&self) -> Option<Address> {
        *self.owner.read()
    }

    /// The last computed effective gas price.
    pub fn gas_price(&self) -> Option<U256> {
        *self.gas_price.read()
    }

    /// Marks the relay ready (or not) to serve requests.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    /// Marks the relay as removed by the hub.
    pub fn set_removed(&self, removed: bool) {
        self.removed.store(removed, Ordering::Relaxed);
    }

    /// Whether the hub's removal of this relay has been observed.
    pub fn removed_flag(&self) -> bool {
        self.removed.load(Ordering::Relaxed)
    }

    /// The readiness gate: only requests passing this may enter the
    /// pipeline.
    pub fn should_handle_requests(&self) -> bool {
        self.ready.load(Ordering::Relaxed) && !self.removed_flag()
    }

    /// The relay account's balance at the latest block.
    pub async fn balance(&self) -> Result<U256> {
        self.chain.balance_at(self.address).await
    }

    /// Flushes and releases the transaction store.
    pub fn close_store(&self) -> Result<()> {
        self.store.close()
    }

    /// Recomputes the effective gas price:
    /// `suggestion (floored) * (100 + gas_price_percent) / 100`.
    pub async fn refresh_gas_price(&self) -> Result<()> {
        let suggested = self.chain.suggest_gas_price().await?;
        let effective = suggested
            * (U256::from(100u64) + U256::from(self.config.gas_price_percent))
            / U256::from(100u64);
        tracing::debug!(%suggested, %effective, "refreshed gas price");
        *self.gas_price.write() = Some(effective);
        Ok(())
    }

    /// Whether the hub records a non-zero stake for this relay. The first
    /// observed stake fills in the owner when none was configured.
    pub async fn is_staked(&self) -> Result<bool> {
        let entry = self.hub.get_relay(self.address).await?;
        let staked = !entry.total_stake.is_zero();
        if staked && self.owner.read().is_none() {
            tracing::info!(
                owner = %entry.owner,
                stake = %entry.total_stake,
                "got staked for the first time, adopting on-chain owner"
            );
            *self.owner.write() = Some(entry.owner);
        }
        Ok(staked)
    }

    /// The most recent `RelayAdded` event inside the registration window
    /// whose fee and url match our configuration.
    async fn matching_registration(&self) -> Result<Option<RelayRegistration>> {
        let events = self
            .hub
            .registrations(self.address, self.config.registration_block_rate)
            .await?;
        Ok(events.into_iter().rev().find(|event| {
            event.fee == self.config.fee && event.url == self.config.url
        }))
    }

    /// The block timestamp of our last matching registration, or
    /// [`Error::NotRegistered`] when none falls inside the window.
    pub async fn registration_date(&self) -> Result<u64> {
        let registration =
            self.matching_registration().await?.ok_or(Error::NotRegistered)?;
        let header = self
            .chain
            .header_by_number(Some(registration.block_number))
            .await?;
        Ok(header.timestamp.as_u64())
    }

    /// How many blocks ago the last matching registration happened.
    pub async fn blocks_since_registration(&self) -> Result<u64> {
        let registration =
            self.matching_registration().await?.ok_or(Error::NotRegistered)?;
        let latest = self.latest_block_number().await?;
        Ok(latest.saturating_sub(registration.block_number))
    }

    /// Whether the hub has removed this relay.
    pub async fn is_removed(&self) -> Result<bool> {
        self.hub.is_removed(self.address).await
    }

    /// Whether the hub has released this relay's stake.
    pub async fn is_unstaked(&self) -> Result<bool> {
        self.hub.is_unstaked(self.address).await
    }

    async fn latest_block_number(&self) -> Result<u64> {
        let header = self.chain.header_by_number(None).await?;
        Ok(header
            .number
            .unwrap_or_else(U64::zero)
            .as_u64())
    }

    /// The submission pipeline. Turns an accepted request into exactly one
    /// signed, broadcast and durably recorded transaction; see the module
    /// docs for the locking rationale.
    pub async fn create_relay_transaction(
        &self,
        request: RelayTransactionRequest,
    ) -> Result<RelayTransactionResponse> {
        // the hub must be the one we serve
        if request.relay_hub_address != self.config.hub_address {
            return Err(Error::WrongHub {
                ours: self.config.hub_address,
                theirs: request.relay_hub_address,
            });
        }

        if request.relay_fee < self.config.fee {
            return Err(Error::UnacceptableFee {
                offered: request.relay_fee,
                minimum: self.config.fee,
            });
        }

        match self.gas_price() {
            Some(effective) if effective <= request.gas_price => {}
            _ => return Err(Error::UnacceptableGasPrice),
        }

        let last_nonce = *self.last_nonce.lock().await;
        if request.relay_max_nonce < U256::from(last_nonce) {
            return Err(Error::UnacceptableMaxNonce {
                max_nonce: request.relay_max_nonce,
                last_nonce,
            });
        }

        // the hub's own admission view; it checks the user's signature,
        // sender nonce and the recipient's acceptance policy
        let (status, context) = self
            .hub
            .can_relay(
                self.address,
                request.from,
                request.to,
                request.encoded_function.clone(),
                request.relay_fee,
                request.gas_price,
                request.gas_limit,
                request.sender_nonce,
                request.signature.clone(),
                request.approval_data.clone(),
            )
            .await?;
        if !status.is_zero() {
            tracing::warn!(
                status = %status,
                context = %hex::encode(&context),
                from = %request.from,
                to = %request.to,
                "hub refused the relay request"
            );
            return Err(Error::HubRejected {
                code: status.low_u64(),
            });
        }

        // budget: the hub's overhead for a relayCall with this stipend,
        // plus the intrinsic calldata cost of what we put on the wire
        let required_gas = self.hub.required_gas(request.gas_limit).await?
            + data_gas_cost(&request.encoded_function)
            + data_gas_cost(&request.approval_data);
        let max_charge = self
            .hub
            .max_possible_charge(
                request.gas_limit,
                request.gas_price,
                request.relay_fee,
            )
            .await?;
        let deposit = self.hub.balance_of(request.to).await?;
        if deposit < max_charge {
            return Err(Error::RecipientUnderfunded {
                have: deposit,
                need: max_charge,
            });
        }

        // a removal may have raced the admission checks; do not hand out a
        // nonce once the flag is up
        if self.removed_flag() {
            return Err(Error::Removed);
        }

        let calldata = self.hub.relay_call_data(
            request.from,
            request.to,
            request.encoded_function.clone(),
            request.relay_fee,
            request.gas_price,
            request.gas_limit,
            request.sender_nonce,
            request.signature.clone(),
            request.approval_data.clone(),
        )?;

        let mut last = self.last_nonce.lock().await;
        let nonce = self.poll_nonce(&mut last).await?;
        let tx_request = TransactionRequest::new()
            .from(self.address)
            .to(self.config.hub_address)
            .value(0u64)
            .gas(required_gas)
            .gas_price(request.gas_price)
            .data(calldata)
            .nonce(nonce)
            .chain_id(self.chain_id);
        let (signed, raw) = self.sign_transaction(tx_request).await?;
        self.chain
            .send_raw_transaction(raw.clone())
            .await
            .map_err(|e| Error::BroadcastFailed(e.to_string()))?;
        *last = nonce + 1;
        self.store
            .save(&signed)
            .map_err(|e| Error::StoreFailed(e.to_string()))?;
        drop(last);

        tracing::info!(hash = %signed.hash, nonce, "relay transaction sent");
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::RelayTx,
            tx_hash = %signed.hash,
            nonce = nonce,
            gas_limit = %required_gas,
        );
        Ok(RelayTransactionResponse {
            signed_tx: signed,
            raw_tx_bytes: raw,
        })
    }

    /// One reconciler pass: prune records below the deeply-confirmed nonce,
    /// then resend the oldest outstanding transaction with a bumped gas
    /// price once it has been stuck long enough. Returns the resent hash,
    /// if any.
    pub async fn update_unconfirmed_transactions(
        &self,
    ) -> Result<Option<H256>> {
        if self.store.get_first()?.is_none() {
            return Ok(None);
        }
        let latest = self.latest_block_number().await?;
        let confirmed_nonce = self
            .chain
            .nonce_at(
                self.address,
                Some(latest.saturating_sub(CONFIRMATIONS_NEEDED)),
            )
            .await?;
        // everything below this nonce survived a reorg-depth of blocks
        self.store.remove_less_than(confirmed_nonce)?;

        let Some(stored) = self.store.get_first()? else {
            return Ok(None);
        };
        let mined_nonce =
            self.chain.nonce_at(self.address, Some(latest)).await?;
        if stored.tx.nonce.as_u64() < mined_nonce {
            // mined but not yet deeply confirmed; wait for more blocks
            tracing::trace!(
                nonce = stored.tx.nonce.as_u64(),
                mined_nonce,
                "oldest stored transaction already mined, awaiting confirmations"
            );
            return Ok(None);
        }
        let age = self.now().saturating_sub(stored.timestamp);
        if age < PENDING_TX_TIMEOUT_SECS {
            tracing::trace!(
                age,
                "oldest stored transaction is not stale yet"
            );
            return Ok(None);
        }

        let old_price = stored.tx.gas_price.unwrap_or_default();
        let bumped = old_price
            * (U256::from(100u64) + U256::from(RETRY_BUMP_PERCENT))
            / U256::from(100u64);
        let new_price = std::cmp::min(bumped, max_gas_price());
        let to = stored
            .tx
            .to
            .ok_or(Error::Generic("stored transaction has no recipient"))?;
        let tx_request = TransactionRequest::new()
            .from(self.address)
            .to(to)
            .value(stored.tx.value)
            .gas(stored.tx.gas)
            .gas_price(new_price)
            .data(stored.tx.input.clone())
            .nonce(stored.tx.nonce)
            .chain_id(self.chain_id);
        let (signed, raw) = self.sign_transaction(tx_request).await?;
        self.chain
            .send_raw_transaction(raw)
            .await
            .map_err(|e| Error::BroadcastFailed(e.to_string()))?;
        self.store.update_by_nonce(&signed)?;
        tracing::info!(
            old_hash = %stored.tx.hash,
            new_hash = %signed.hash,
            nonce = signed.nonce.as_u64(),
            old_gas_price = %old_price,
            new_gas_price = %new_price,
            "resent stuck transaction with an escalated gas price"
        );
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Resend,
            tx_hash = %signed.hash,
            nonce = signed.nonce.as_u64(),
            gas_price = %new_price,
        );
        Ok(Some(signed.hash))
    }

    /// Registers this relay on the hub and waits for the transaction to be
    /// mined.
    pub async fn register_relay(&self) -> Result<()> {
        let tx = self.send_register_transaction().await?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Registration,
            tx_hash = %tx.hash,
        );
        self.await_transaction_mined(tx.hash).await
    }

    /// Sends the registration transaction without waiting for it to be
    /// mined. The record is persisted like any other submission, so a stuck
    /// registration is bumped by the reconciler.
    pub async fn send_register_transaction(&self) -> Result<Transaction> {
        tracing::info!(
            hub = %self.config.hub_address,
            url = %self.config.url,
            "registering relay on hub"
        );
        let calldata = self
            .hub
            .register_relay_data(self.config.fee, &self.config.url)?;
        let gas_price = match self.gas_price() {
            Some(price) => price,
            None => self.chain.suggest_gas_price().await?,
        };
        let probe_request = TransactionRequest::new()
            .from(self.address)
            .to(self.config.hub_address)
            .data(calldata.clone());
        let typed: TypedTransaction = probe_request.into();
        let gas = self.chain.estimate_gas(&typed).await?;

        let mut last = self.last_nonce.lock().await;
        let nonce = self.poll_nonce(&mut last).await?;
        let tx_request = TransactionRequest::new()
            .from(self.address)
            .to(self.config.hub_address)
            .value(0u64)
            .gas(gas)
            .gas_price(gas_price)
            .data(calldata)
            .nonce(nonce)
            .chain_id(self.chain_id);
        let (signed, raw) = self.sign_transaction(tx_request).await?;
        self.chain
            .send_raw_transaction(raw)
            .await
            .map_err(|e| Error::BroadcastFailed(e.to_string()))?;
        *last = nonce + 1;
        self.store
            .save(&signed)
            .map_err(|e| Error::StoreFailed(e.to_string()))?;
        drop(last);
        tracing::info!(hash = %signed.hash, "registration transaction sent");
        Ok(signed)
    }

    /// Sends the relay's whole balance, minus the cost of the transfer
    /// itself, to the owner. Used on the drain path after the hub unstakes
    /// the relay.
    pub async fn send_balance_to_owner(&self) -> Result<()> {
        let owner = self
            .owner()
            .ok_or(Error::Generic("owner address is not known yet"))?;
        let balance = self.balance().await?;
        if balance.is_zero() {
            tracing::info!("balance is 0, nothing to send to owner");
            return Ok(());
        }
        let gas_price = self.chain.suggest_gas_price().await?;
        let gas = U256::from(BASIC_TX_GAS);
        let cost = gas_price * gas;
        if balance <= cost {
            tracing::warn!(
                %balance,
                %cost,
                "balance does not cover the transfer cost, leaving it"
            );
            return Ok(());
        }
        let value = balance - cost;
        tracing::info!(%value, %owner, "sending balance to owner");

        let mut last = self.last_nonce.lock().await;
        let nonce = self.poll_nonce(&mut last).await?;
        let tx_request = TransactionRequest::new()
            .from(self.address)
            .to(owner)
            .value(value)
            .gas(gas)
            .gas_price(gas_price)
            .nonce(nonce)
            .chain_id(self.chain_id);
        let (signed, raw) = self.sign_transaction(tx_request).await?;
        self.chain
            .send_raw_transaction(raw)
            .await
            .map_err(|e| Error::BroadcastFailed(e.to_string()))?;
        *last = nonce + 1;
        drop(last);
        tracing::info!(hash = %signed.hash, "drain transaction sent");
        self.await_transaction_mined(signed.hash).await
    }

    /// Polls for the receipt of `hash` every 500 ms, bounded by
    /// [`TX_RECEIPT_TIMEOUT`]; returns without a receipt rather than
    /// blocking indefinitely.
    pub async fn await_transaction_mined(&self, hash: H256) -> Result<()> {
        let started = tokio::time::Instant::now();
        loop {
            match self.chain.transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    if receipt.status != Some(U64::one()) {
                        tracing::warn!(
                            %hash,
                            status = ?receipt.status,
                            "transaction failed on-chain"
                        );
                    }
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("could not fetch receipt yet: {}", e);
                }
            }
            if started.elapsed() >= TX_RECEIPT_TIMEOUT {
                tracing::warn!(%hash, "timed out waiting for receipt");
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// Syncs the cached nonce with the node. Outside dev mode the cache
    /// only moves forward: the node may not have seen our freshest
    /// transactions yet, so a lower pending nonce is ignored. In dev mode
    /// the node's answer always wins, which lets tests rewind the chain.
    async fn poll_nonce(&self, last: &mut u64) -> Result<u64> {
        let pending = self
            .chain
            .pending_nonce_at(self.address)
            .await
            .map_err(|e| Error::NonceFetchFailed(e.to_string()))?;
        if self.config.dev_mode || *last <= pending {
            *last = pending;
        }
        Ok(*last)
    }

    /// Signs a fully specified transaction request with the relay key
    /// (EIP-155 for the connected chain) and returns the canonical record
    /// plus its wire bytes.
    async fn sign_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<(Transaction, Bytes)> {
        let typed: TypedTransaction = request.clone().into();
        let signature = self
            .wallet
            .sign_transaction(&typed)
            .await
            .map_err(|e| Error::SignFailed(e.to_string()))?;
        let raw = typed.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));
        let tx = Transaction {
            hash,
            nonce: request.nonce.unwrap_or_default(),
            from: self.address,
            to: request.to.as_ref().and_then(|to| to.as_address()).copied(),
            value: request.value.unwrap_or_default(),
            gas_price: request.gas_price,
            gas: request.gas.unwrap_or_default(),
            input: request.data.clone().unwrap_or_default(),
            v: signature.v.into(),
            r: signature.r,
            s: signature.s,
            chain_id: Some(self.chain_id.into()),
            ..Default::default()
        };
        Ok((tx, raw))
    }
}
