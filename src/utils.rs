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
use std::time::Duration;

use ethers::types::U256;

/// Gas charged per zero byte of calldata.
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Gas charged per non-zero byte of calldata.
pub const TX_DATA_NON_ZERO_GAS: u64 = 68;

/// Computes the intrinsic calldata gas of a byte string: 4 gas per zero
/// byte, 68 per non-zero byte.
pub fn data_gas_cost(data: &[u8]) -> U256 {
    let cost: u64 = data
        .iter()
        .map(|b| {
            if *b == 0 {
                TX_DATA_ZERO_GAS
            } else {
                TX_DATA_NON_ZERO_GAS
            }
        })
        .sum();
    U256::from(cost)
}

/// Computes the calldata gas of a hex string, with or without a `0x` prefix.
pub fn calldata_gas_cost(data: &str) -> crate::Result<U256> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    let bytes = hex::decode(stripped)?;
    Ok(data_gas_cost(&bytes))
}

/// Sleeps for the given duration, shortened to one second when `short_sleep`
/// is set (dev mode).
pub async fn sleep(duration: Duration, short_sleep: bool) {
    if short_sleep {
        tokio::time::sleep(Duration::from_secs(1)).await;
    } else {
        tokio::time::sleep(duration).await;
    }
}

/// Serde helpers for big integers that travel as decimal strings over the
/// wire, while still accepting plain numbers and `0x` hex from older
/// clients.
pub mod dec_u256 {
    use ethers::types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Text(String),
    }

    /// Deserializes a U256 from a decimal string, hex string or number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(U256::from(n)),
            Raw::Text(s) => {
                let s = s.trim();
                match s.strip_prefix("0x") {
                    Some(hex) => U256::from_str_radix(hex, 16)
                        .map_err(serde::de::Error::custom),
                    None => {
                        U256::from_dec_str(s).map_err(serde::de::Error::custom)
                    }
                }
            }
        }
    }

    /// Serializes a U256 as a decimal string.
    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }
}
