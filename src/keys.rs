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
//! # Key Loader
//!
//! Loads the relay's signing key from a JSON keystore directory, creating a
//! fresh key on first run.
//!
//! The keystore is encrypted with an **empty passphrase**. This mirrors the
//! behaviour relay operators and tooling already depend on, and it is an
//! operational weakness: anyone able to read the keystore file controls the
//! relay's operating balance. Protect the working directory accordingly.

use std::fs;
use std::path::Path;

use ethers::signers::{LocalWallet, Signer, Wallet};

use crate::error::Result;

/// Loads the first account in the keystore directory, creating one with an
/// empty passphrase if the directory is empty.
pub fn load_or_create_wallet(keystore_dir: &Path) -> Result<LocalWallet> {
    fs::create_dir_all(keystore_dir)?;
    let mut entries: Vec<_> = fs::read_dir(keystore_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let wallet = match entries.first() {
        Some(path) => {
            let wallet = Wallet::decrypt_keystore(path, "")?;
            tracing::debug!(
                keystore = %path.display(),
                "loaded existing relay key"
            );
            wallet
        }
        None => {
            let (wallet, name) = Wallet::new_keystore(
                keystore_dir,
                &mut rand::thread_rng(),
                "",
                None,
            )?;
            tracing::info!(
                keystore = %keystore_dir.join(name).display(),
                "no key found, created a new relay key"
            );
            wallet
        }
    };
    tracing::info!(address = %wallet.address(), "relay key extracted");
    Ok(wallet)
}
