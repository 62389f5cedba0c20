//! Mocked chain and hub backends plus a fake clock, wired into a ready-made
//! test rig for the relay engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ethers::signers::LocalWallet;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Block, Bytes, Transaction, TransactionReceipt, H256, U256,
};
use ethers::utils::keccak256;
use parking_lot::Mutex;
use rand::Rng;

use crate::chain::ChainClient;
use crate::config;
use crate::error::Result;
use crate::hub::{HubClient, RelayEntry, RelayRegistration};
use crate::relay::RelayServer;
use crate::store::mem::MemoryTxStore;
use crate::store::Clock;

/// A controllable clock shared between the store and the relay.
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn clock(&self) -> Clock {
        let now = self.now.clone();
        Arc::new(move || now.load(Ordering::SeqCst))
    }
}

/// A signed-looking transaction with a random gas limit, for store tests.
pub fn new_tx(nonce: u64) -> Transaction {
    let mut tx = Transaction {
        nonce: nonce.into(),
        from: Address::random(),
        to: Some(
            "0xffcf8fdee72ac11b5c542428b35eef5769c409f0"
                .parse()
                .expect("static address"),
        ),
        value: U256::from(10u64),
        gas: U256::from(rand::thread_rng().gen_range(21_000..1_000_000u64)),
        gas_price: Some(U256::from(2000u64)),
        input: Bytes::new(),
        v: 27u64.into(),
        r: U256::one(),
        s: U256::one(),
        ..Default::default()
    };
    let raw = tx.rlp();
    tx.hash = H256::from(keccak256(&raw));
    tx
}

/// An in-memory chain node. Every broadcast immediately gets a successful
/// receipt so receipt polls return at once.
pub struct MockChain {
    pub network: u64,
    gas_price: Mutex<U256>,
    estimate: Mutex<U256>,
    balances: Mutex<HashMap<Address, U256>>,
    pending_nonce: Mutex<u64>,
    nonce_by_block: Mutex<HashMap<u64, u64>>,
    latest_block: Mutex<u64>,
    block_timestamps: Mutex<HashMap<u64, u64>>,
    sent: Mutex<Vec<Bytes>>,
    receipts: Mutex<HashMap<H256, TransactionReceipt>>,
}

impl MockChain {
    pub fn new(network: u64) -> Self {
        Self {
            network,
            gas_price: Mutex::new(U256::from(1_000_000_000u64)),
            estimate: Mutex::new(U256::from(100_000u64)),
            balances: Mutex::new(HashMap::new()),
            pending_nonce: Mutex::new(0),
            nonce_by_block: Mutex::new(HashMap::new()),
            latest_block: Mutex::new(100),
            block_timestamps: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            receipts: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_gas_price(&self, price: U256) {
        *self.gas_price.lock() = price;
    }

    pub fn set_balance(&self, account: Address, balance: U256) {
        self.balances.lock().insert(account, balance);
    }

    pub fn set_pending_nonce(&self, nonce: u64) {
        *self.pending_nonce.lock() = nonce;
    }

    pub fn set_nonce_at_block(&self, block: u64, nonce: u64) {
        self.nonce_by_block.lock().insert(block, nonce);
    }

    pub fn set_block_timestamp(&self, block: u64, timestamp: u64) {
        self.block_timestamps.lock().insert(block, timestamp);
    }

    pub fn insert_receipt(&self, hash: H256, receipt: TransactionReceipt) {
        self.receipts.lock().insert(hash, receipt);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Decodes the most recently broadcast raw transaction.
    pub fn last_sent_decoded(&self) -> Transaction {
        let sent = self.sent.lock();
        let raw = sent.last().expect("no transaction was sent");
        rlp::decode(raw).expect("sent bytes decode as a transaction")
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn suggest_gas_price(&self) -> Result<U256> {
        Ok(*self.gas_price.lock())
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<U256> {
        Ok(*self.estimate.lock())
    }

    async fn pending_nonce_at(&self, _account: Address) -> Result<u64> {
        Ok(*self.pending_nonce.lock())
    }

    async fn nonce_at(
        &self,
        _account: Address,
        block: Option<u64>,
    ) -> Result<u64> {
        let block = block.unwrap_or(*self.latest_block.lock());
        Ok(self.nonce_by_block.lock().get(&block).copied().unwrap_or(0))
    }

    async fn balance_at(&self, account: Address) -> Result<U256> {
        Ok(self.balances.lock().get(&account).copied().unwrap_or_default())
    }

    async fn header_by_number(
        &self,
        number: Option<u64>,
    ) -> Result<Block<H256>> {
        let number = number.unwrap_or(*self.latest_block.lock());
        let timestamp = self
            .block_timestamps
            .lock()
            .get(&number)
            .copied()
            .unwrap_or_default();
        Ok(Block {
            number: Some(number.into()),
            timestamp: timestamp.into(),
            ..Default::default()
        })
    }

    async fn block_by_number(
        &self,
        number: Option<u64>,
    ) -> Result<Block<Transaction>> {
        let number = number.unwrap_or(*self.latest_block.lock());
        Ok(Block {
            number: Some(number.into()),
            ..Default::default()
        })
    }

    async fn transaction_by_hash(
        &self,
        _hash: H256,
    ) -> Result<Option<Transaction>> {
        Ok(None)
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>> {
        Ok(self.receipts.lock().get(&hash).cloned())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        let hash = H256::from(keccak256(&raw));
        self.sent.lock().push(raw);
        self.receipts.lock().insert(
            hash,
            TransactionReceipt {
                transaction_hash: hash,
                status: Some(1u64.into()),
                ..Default::default()
            },
        );
        Ok(hash)
    }

    async fn network_id(&self) -> Result<U256> {
        Ok(U256::from(self.network))
    }
}

/// An in-memory hub contract.
pub struct MockHub {
    hub_address: Address,
    can_relay_status: Mutex<U256>,
    deposits: Mutex<HashMap<Address, U256>>,
    required_gas: Mutex<U256>,
    max_charge: Mutex<U256>,
    relays: Mutex<HashMap<Address, RelayEntry>>,
    registrations: Mutex<Vec<RelayRegistration>>,
    removed: Mutex<bool>,
    unstaked: Mutex<bool>,
}

impl MockHub {
    pub fn new(hub_address: Address) -> Self {
        Self {
            hub_address,
            can_relay_status: Mutex::new(U256::zero()),
            deposits: Mutex::new(HashMap::new()),
            required_gas: Mutex::new(U256::from(600_000u64)),
            max_charge: Mutex::new(U256::exp10(15)),
            relays: Mutex::new(HashMap::new()),
            registrations: Mutex::new(Vec::new()),
            removed: Mutex::new(false),
            unstaked: Mutex::new(false),
        }
    }

    pub fn set_can_relay_status(&self, status: u64) {
        *self.can_relay_status.lock() = U256::from(status);
    }

    pub fn set_deposit(&self, target: Address, amount: U256) {
        self.deposits.lock().insert(target, amount);
    }

    pub fn required_gas_value(&self) -> U256 {
        *self.required_gas.lock()
    }

    pub fn set_relay_entry(&self, relay: Address, entry: RelayEntry) {
        self.relays.lock().insert(relay, entry);
    }

    pub fn push_registration(&self, fee: U256, url: &str, block: u64) {
        self.registrations.lock().push(RelayRegistration {
            fee,
            url: url.to_string(),
            stake: U256::exp10(18),
            block_number: block,
        });
    }

    pub fn set_removed(&self, removed: bool) {
        *self.removed.lock() = removed;
    }

    pub fn set_unstaked(&self, unstaked: bool) {
        *self.unstaked.lock() = unstaked;
    }
}

#[async_trait]
impl HubClient for MockHub {
    fn address(&self) -> Address {
        self.hub_address
    }

    async fn can_relay(
        &self,
        _relay: Address,
        _from: Address,
        _to: Address,
        _encoded_function: Bytes,
        _relay_fee: U256,
        _gas_price: U256,
        _gas_limit: U256,
        _sender_nonce: U256,
        _signature: Bytes,
        _approval_data: Bytes,
    ) -> Result<(U256, Bytes)> {
        Ok((*self.can_relay_status.lock(), Bytes::new()))
    }

    async fn balance_of(&self, target: Address) -> Result<U256> {
        Ok(self.deposits.lock().get(&target).copied().unwrap_or_default())
    }

    async fn required_gas(&self, _relayed_call_stipend: U256) -> Result<U256> {
        Ok(*self.required_gas.lock())
    }

    async fn max_possible_charge(
        &self,
        _relayed_call_stipend: U256,
        _gas_price: U256,
        _relay_fee: U256,
    ) -> Result<U256> {
        Ok(*self.max_charge.lock())
    }

    async fn get_relay(&self, relay: Address) -> Result<RelayEntry> {
        Ok(self.relays.lock().get(&relay).cloned().unwrap_or_default())
    }

    fn relay_call_data(
        &self,
        from: Address,
        to: Address,
        encoded_function: Bytes,
        _relay_fee: U256,
        _gas_price: U256,
        _gas_limit: U256,
        _sender_nonce: U256,
        signature: Bytes,
        approval_data: Bytes,
    ) -> Result<Bytes> {
        let mut data = vec![0xaa, 0xbb, 0xcc, 0xdd];
        data.extend_from_slice(from.as_bytes());
        data.extend_from_slice(to.as_bytes());
        data.extend_from_slice(&encoded_function);
        data.extend_from_slice(&signature);
        data.extend_from_slice(&approval_data);
        Ok(Bytes::from(data))
    }

    fn register_relay_data(&self, _fee: U256, url: &str) -> Result<Bytes> {
        let mut data = vec![0x11, 0x22, 0x33, 0x44];
        data.extend_from_slice(url.as_bytes());
        Ok(Bytes::from(data))
    }

    fn remove_relay_by_owner_data(&self, relay: Address) -> Result<Bytes> {
        let mut data = vec![0x55, 0x66, 0x77, 0x88];
        data.extend_from_slice(relay.as_bytes());
        Ok(Bytes::from(data))
    }

    async fn registrations(
        &self,
        _relay: Address,
        _window: u64,
    ) -> Result<Vec<RelayRegistration>> {
        Ok(self.registrations.lock().clone())
    }

    async fn is_removed(&self, _relay: Address) -> Result<bool> {
        Ok(*self.removed.lock())
    }

    async fn is_unstaked(&self, _relay: Address) -> Result<bool> {
        Ok(*self.unstaked.lock())
    }
}

/// Everything a relay test needs, pre-wired: a staked hub entry, a funded
/// relay account, a funded recipient deposit, and a refreshed gas price.
pub struct TestRig {
    pub relay: Arc<RelayServer>,
    pub chain: Arc<MockChain>,
    pub hub: Arc<MockHub>,
    pub store: Arc<MemoryTxStore>,
    pub clock: FakeClock,
    pub recipient: Address,
    pub owner: Address,
}

pub async fn test_rig(dev_mode: bool) -> TestRig {
    try_test_rig(dev_mode, 1337).await.expect("test rig builds")
}

pub async fn build_relay_with_chain_id(
    dev_mode: bool,
    chain_id: u64,
) -> crate::Result<Arc<RelayServer>> {
    let rig = try_test_rig(dev_mode, chain_id).await?;
    Ok(rig.relay)
}

async fn try_test_rig(
    dev_mode: bool,
    chain_id: u64,
) -> crate::Result<TestRig> {
    let hub_address = Address::random();
    let recipient = Address::random();
    let owner = Address::random();
    let clock = FakeClock::new(1_000_000);

    let tmp = std::env::temp_dir();
    let mut cfg = config::test_config(hub_address, &tmp);
    cfg.dev_mode = dev_mode;

    let chain = Arc::new(MockChain::new(chain_id));
    let hub = Arc::new(MockHub::new(hub_address));
    let store = Arc::new(MemoryTxStore::with_clock(clock.clock()));

    hub.set_deposit(recipient, U256::exp10(15) * U256::from(2u64));

    let wallet = LocalWallet::new(&mut rand::thread_rng());
    let relay = RelayServer::new(
        cfg,
        wallet,
        chain.clone(),
        hub.clone(),
        store.clone(),
        chain_id,
        Some(clock.clock()),
    )?;
    let relay = Arc::new(relay);

    chain.set_balance(relay.address(), U256::exp10(18));
    hub.set_relay_entry(
        relay.address(),
        RelayEntry {
            total_stake: U256::exp10(18),
            owner,
            ..Default::default()
        },
    );
    relay.refresh_gas_price().await?;

    Ok(TestRig {
        relay,
        chain,
        hub,
        store,
        clock,
        recipient,
        owner,
    })
}
