#![deny(unsafe_code)]
//! # Meta-Transaction Relay Daemon
//!
//! A long-lived service that accepts signed, HTTP-wrapped user calls and
//! submits them to an EVM chain as its own transactions, paying gas on the
//! user's behalf. A coordinator contract (the hub) admits the relay, holds
//! recipient deposits, and reimburses the relay for every successfully
//! relayed call.
//!
//! The crate is organised around three cooperating pieces:
//!
//! * the submission pipeline ([`relay`]), which turns an accepted request
//!   into exactly one signed, broadcast and durably recorded transaction,
//! * the pending-transaction reconciler (also in [`relay`]), which resends
//!   stuck transactions with an escalated gas price and prunes confirmed
//!   ones, and
//! * the lifecycle tasks ([`service`]), which keep the relay staked, funded,
//!   registered and ready, and drain its balance back to the owner once the
//!   hub unstakes it.

/// Chain client adapter over the Ethereum JSON-RPC provider.
pub mod chain;
/// Relay configuration, immutable after startup.
pub mod config;
/// Shared context and shutdown signalling.
pub mod context;
/// Crate-wide error type.
pub mod error;
/// HTTP request handlers.
pub mod handler;
/// Typed binding and facade over the hub contract.
pub mod hub;
/// Keystore loading and creation.
pub mod keys;
/// Structured probe events for tracing.
pub mod probe;
/// The relay server: submission pipeline, reconciler and lifecycle operations.
pub mod relay;
/// Background tasks and HTTP server assembly.
pub mod service;
/// Durable transaction store.
pub mod store;
/// Small helpers: calldata gas pricing, dev-mode sleeps.
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};

/// The version reported by `/getaddr`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
