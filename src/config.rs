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
#[cfg(test)]
use std::path::Path;
use std::path::PathBuf;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

const fn default_port() -> u16 {
    8090
}

const fn default_registration_block_rate() -> u64 {
    5800
}

/// RelayConfig is the configuration of the relay daemon. It is immutable
/// after startup; every field comes from the command line.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayConfig {
    /// The relay owner's address, if known up front. When left unset it is
    /// discovered from the hub on the first successful stake lookup.
    pub owner_address: Option<Address>,
    /// The percent premium this relay charges over the raw gas cost of a
    /// relayed call.
    pub fee: U256,
    /// The advertised endpoint of this relay, as registered on the hub.
    pub url: String,
    /// The port the HTTP listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The coordinator hub contract this relay serves.
    pub hub_address: Address,
    /// Gas price floor used whenever the node suggests zero.
    pub default_gas_price: U256,
    /// Percent markup over the node-suggested gas price.
    pub gas_price_percent: u64,
    /// The block window within which a matching registration event must be
    /// found for the relay to count as registered.
    #[serde(default = "default_registration_block_rate")]
    pub registration_block_rate: u64,
    /// The Ethereum node endpoint.
    pub ethereum_node_url: url::Url,
    /// The working directory holding the keystore and the transaction
    /// database.
    pub workdir: PathBuf,
    /// Dev mode: no nonce caching, no resend loop, one-second sleeps, and a
    /// refusal to connect to chains with IDs below 1000.
    #[serde(default)]
    pub dev_mode: bool,
}

impl RelayConfig {
    /// The directory the signing keystore lives in.
    pub fn keystore_dir(&self) -> PathBuf {
        self.workdir.join("keystore")
    }

    /// The directory the durable transaction store lives in.
    pub fn db_dir(&self) -> PathBuf {
        self.workdir.join("db")
    }

    /// Returns the owner address, treating the zero address as unset.
    pub fn configured_owner(&self) -> Option<Address> {
        self.owner_address.filter(|addr| !addr.is_zero())
    }

    /// Picks the listening port: an explicit port wins, otherwise the port
    /// embedded in the advertised url, otherwise the default.
    pub fn resolve_port(url: &str, explicit: Option<u16>) -> u16 {
        if let Some(port) = explicit {
            return port;
        }
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.port())
            .unwrap_or_else(default_port)
    }
}

/// Builds a config suitable for tests against a local dev chain.
#[cfg(test)]
pub fn test_config(hub_address: Address, workdir: &Path) -> RelayConfig {
    RelayConfig {
        owner_address: None,
        fee: U256::from(10u64),
        url: "http://localhost:8090".to_string(),
        port: 8090,
        hub_address,
        default_gas_price: U256::from(1_000_000_000u64),
        gas_price_percent: 10,
        registration_block_rate: 5800,
        ethereum_node_url: "http://localhost:8545".parse().expect("static url"),
        workdir: workdir.to_path_buf(),
        dev_mode: false,
    }
}
