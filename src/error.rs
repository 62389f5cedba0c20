use ethers::providers::{Http, Provider};
use ethers::types::{Address, U256};

/// An enum of all possible errors that could be encountered during the
/// execution of the relay daemon.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Error while parsing a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// Error in the underlying Http server.
    #[error(transparent)]
    Warp(#[from] warp::Error),
    /// Error in the Http Provider (ethers client).
    #[error(transparent)]
    EthersProvider(#[from] ethers::providers::ProviderError),
    /// Error in the local signing wallet.
    #[error(transparent)]
    EthersWallet(#[from] ethers::signers::WalletError),
    /// Smart contract error.
    #[error(transparent)]
    EthersContract(#[from] ethers::contract::ContractError<Provider<Http>>),
    /// Contract ABI error.
    #[error(transparent)]
    EthersAbi(#[from] ethers::abi::Error),
    /// Sled database error.
    #[error(transparent)]
    Sled(#[from] sled::Error),
    /// RLP decoding error while reading a stored transaction.
    #[error(transparent)]
    Rlp(#[from] rlp::DecoderError),
    /// Hex decoding error.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),

    /// The request named a hub this relay does not serve.
    #[error(
        "Wrong hub address. Relay server's hub address: {ours}, request's hub address: {theirs}"
    )]
    WrongHub {
        /// The hub this relay is configured for.
        ours: Address,
        /// The hub the request asked for.
        theirs: Address,
    },
    /// The offered relay fee is below the fee this relay charges.
    #[error("Unacceptable fee: offered {offered}, minimum is {minimum}")]
    UnacceptableFee {
        /// The fee offered by the request.
        offered: U256,
        /// The configured minimum fee.
        minimum: U256,
    },
    /// The request's gas price is below our current effective gas price, or
    /// no effective gas price has been computed yet.
    #[error("Unacceptable gasPrice")]
    UnacceptableGasPrice,
    /// The client's cap on our transaction nonce is already behind us.
    #[error("Unacceptable RelayMaxNonce: {max_nonce}, last nonce is {last_nonce}")]
    UnacceptableMaxNonce {
        /// The cap the client placed on the relay's nonce.
        max_nonce: U256,
        /// The highest nonce this relay has allocated.
        last_nonce: u64,
    },
    /// The hub's own admission view refused the request.
    #[error("canRelay() view function returned error code={code}")]
    HubRejected {
        /// The hub's status code, preserved verbatim.
        code: u64,
    },
    /// The recipient's hub deposit cannot cover the worst-case charge.
    #[error("Recipient balance too low: {have}, maxCharge: {need}")]
    RecipientUnderfunded {
        /// The recipient's current hub deposit.
        have: U256,
        /// The computed maximum possible charge.
        need: U256,
    },
    /// Could not fetch the relay account's pending nonce.
    #[error("Failed to fetch relay account nonce: {}", _0)]
    NonceFetchFailed(String),
    /// Could not sign a transaction.
    #[error("Failed to sign transaction: {}", _0)]
    SignFailed(String),
    /// Could not broadcast a signed transaction.
    #[error("Failed to broadcast transaction: {}", _0)]
    BroadcastFailed(String),
    /// Could not persist a transaction record.
    #[error("Failed to persist transaction: {}", _0)]
    StoreFailed(String),
    /// No record with that nonce exists in the store.
    #[error("Could not find transaction with nonce {}", _0)]
    TxNotFound(u64),
    /// No matching registration event within the configured block window.
    #[error("Could not receive RelayAdded() events for our relay")]
    NotRegistered,
    /// The hub has removed this relay; new requests are refused.
    #[error("Relay has been removed by the hub")]
    Removed,
    /// The relay is not yet staked, funded and registered.
    #[error("Relay not staked and registered yet")]
    NotReady,
    /// The relay account has no operating balance yet.
    #[error("Waiting for funding...")]
    WaitingForFunding,
    /// No effective gas price has been computed yet.
    #[error("Waiting for gasPrice...")]
    WaitingForGasPrice,
}

/// A type alias for the result of the relay daemon, using the `Error` enum.
pub type Result<T> = std::result::Result<T, Error>;
