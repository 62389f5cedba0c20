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
//! # Relay Service Module
//!
//! Long-running tasks the relay constantly runs throughout its lifetime,
//! plus the assembly of the HTTP surface.
//!
//! ## Overview
//!
//! Four periodic duties drive the lifecycle state machine:
//!
//! * `refresh_blockchain_view` waits for stake, funding and an in-window
//!   registration, refreshes the gas price, and flips the ready flag,
//! * `keep_alive` re-registers the relay before its registration goes
//!   stale,
//! * `update_pending_txs` drives the reconciler (disabled in dev mode),
//! * the removal watcher polls for `RelayRemoved`, then for `Unstaked`,
//!   then drains the balance to the owner and shuts the daemon down.
//!
//! Transient failures are logged and retried on the next tick; background
//! tasks never crash the process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::Future;
use warp::Filter;

use crate::context::{RelayContext, Shutdown};
use crate::handler;
use crate::probe;
use crate::relay::{minimum_relay_balance, RelayServer};
use crate::utils::sleep;

/// Seconds between registrations after which the relay re-registers.
const DAILY_REGISTRATION_PERIOD_SECS: u64 = 24 * 60 * 60;

/// The base period of the background tasks: one minute, one second in dev
/// mode.
pub fn time_unit(dev_mode: bool) -> Duration {
    if dev_mode {
        Duration::from_secs(1)
    } else {
        Duration::from_secs(60)
    }
}

/// Runs `job` now and then once per `period` (after `initial_delay`) until
/// the shutdown signal fires. The returned handle can be awaited but the
/// task stops on its own.
pub fn schedule<F, Fut>(
    mut shutdown: Shutdown,
    period: Duration,
    initial_delay: Duration,
    job: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::task::spawn(async move {
        tokio::time::sleep(initial_delay).await;
        loop {
            job().await;
            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// Spawns the four background duties.
pub fn start_background_tasks(ctx: &RelayContext) {
    let dev_mode = ctx.relay().dev_mode();
    let unit = time_unit(dev_mode);

    let relay = ctx.relay();
    schedule(
        ctx.shutdown_signal(),
        60 * unit,
        Duration::ZERO,
        move || keep_alive(relay.clone()),
    );

    let relay = ctx.relay();
    schedule(ctx.shutdown_signal(), unit, Duration::ZERO, move || {
        refresh_blockchain_view(relay.clone())
    });

    if dev_mode {
        tracing::warn!("dev mode: the pending-transaction resend loop is off");
    } else {
        let relay = ctx.relay();
        schedule(ctx.shutdown_signal(), unit, Duration::ZERO, move || {
            update_pending_txs(relay.clone())
        });
    }

    spawn_removal_watcher(ctx);

    tracing::event!(
        target: probe::TARGET,
        tracing::Level::DEBUG,
        kind = %probe::Kind::Lifecycle,
        background_tasks = "started",
    );
}

/// Blocks until the hub records a stake for us and our account is funded.
/// Every iteration drops the ready flag, so the readiness gate closes as
/// soon as a prerequisite disappears.
async fn wait_for_owner_actions(relay: &RelayServer) {
    if relay.removed_flag() {
        tracing::debug!("relay removed, no need to wait for owner actions");
        return;
    }
    let dev_mode = relay.dev_mode();
    loop {
        match relay.is_staked().await {
            Ok(true) => break,
            Ok(false) => tracing::info!("waiting for stake..."),
            Err(e) => tracing::warn!("stake lookup failed: {}", e),
        }
        relay.set_ready(false);
        sleep(Duration::from_secs(5), dev_mode).await;
    }
    loop {
        match relay.balance().await {
            Ok(balance) if balance > minimum_relay_balance() => {
                tracing::info!(%balance, "relay funded");
                break;
            }
            Ok(balance) => tracing::info!(
                %balance,
                required = %minimum_relay_balance(),
                "balance too low, waiting for funding..."
            ),
            Err(e) => tracing::warn!("balance lookup failed: {}", e),
        }
        relay.set_ready(false);
        sleep(Duration::from_secs(10), dev_mode).await;
    }
}

/// Waits for stake and funding, then for a registration within the
/// configured block window, refreshes the gas price, and declares the
/// relay ready.
async fn refresh_blockchain_view(relay: Arc<RelayServer>) {
    if relay.removed_flag() {
        tracing::debug!("relay removed, skipping blockchain view refresh");
        return;
    }
    wait_for_owner_actions(&relay).await;
    let dev_mode = relay.dev_mode();
    while let Err(e) = relay.registration_date().await {
        tracing::debug!("no registration in window yet: {}", e);
        relay.set_ready(false);
        sleep(Duration::from_secs(15), dev_mode).await;
    }
    while let Err(e) = relay.refresh_gas_price().await {
        tracing::warn!("could not refresh gas price: {}", e);
        relay.set_ready(false);
        sleep(Duration::from_secs(10), dev_mode).await;
    }
    relay.set_ready(true);
}

/// Re-registers the relay when the last matching registration is old
/// enough that it could lapse before the next keep-alive tick.
async fn keep_alive(relay: Arc<RelayServer>) {
    if relay.removed_flag() {
        tracing::debug!("relay removed, no need to re-register");
        return;
    }
    wait_for_owner_actions(&relay).await;
    let dev_mode = relay.dev_mode();
    let keep_alive_period = 60 * time_unit(dev_mode);
    match relay.registration_date().await {
        Ok(when) => {
            let age = relay.now().saturating_sub(when);
            if age
                < DAILY_REGISTRATION_PERIOD_SECS
                    .saturating_sub(2 * keep_alive_period.as_secs())
            {
                tracing::debug!(age, "registered recently, no need to re-register");
                return;
            }
        }
        Err(e) => tracing::debug!("no current registration: {}", e),
    }
    loop {
        match relay.register_relay().await {
            Ok(()) => break,
            Err(e) => {
                tracing::warn!("registration failed, trying again: {}", e);
                sleep(Duration::from_secs(60), dev_mode).await;
            }
        }
    }
    tracing::info!("done registering");
}

/// Drives one reconciler pass.
async fn update_pending_txs(relay: Arc<RelayServer>) {
    if relay.removed_flag() {
        tracing::debug!("relay removed, skipping resend pass");
        return;
    }
    wait_for_owner_actions(&relay).await;
    tracing::debug!("updating unconfirmed txs...");
    if let Err(e) = relay.update_unconfirmed_transactions().await {
        tracing::warn!("error updating unconfirmed txs: {}", e);
    }
}

/// Watches for `RelayRemoved`, then for `Unstaked`, then drains the
/// balance back to the owner and shuts the daemon down.
fn spawn_removal_watcher(ctx: &RelayContext) {
    let relay = ctx.relay();
    let ctx = ctx.clone();
    let mut shutdown = ctx.shutdown_signal();
    let dev_mode = relay.dev_mode();
    let unit = time_unit(dev_mode);
    tokio::task::spawn(async move {
        loop {
            match relay.is_removed().await {
                Ok(true) => {
                    relay.set_removed(true);
                    tracing::warn!(
                        "relay removed by hub, listening for the Unstaked event"
                    );
                    break;
                }
                Ok(false) => {}
                Err(e) => tracing::warn!("removal lookup failed: {}", e),
            }
            tokio::select! {
                _ = tokio::time::sleep(unit) => {}
                _ = shutdown.recv() => return,
            }
        }
        loop {
            match relay.is_unstaked().await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => tracing::warn!("unstake lookup failed: {}", e),
            }
            tokio::select! {
                _ = tokio::time::sleep(unit) => {}
                _ = shutdown.recv() => return,
            }
        }
        tracing::warn!("relay unstaked, sending balance back to owner");
        // grace period for funds still in flight towards our account
        sleep(Duration::from_secs(2 * 60), dev_mode).await;
        loop {
            match relay.send_balance_to_owner().await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!("could not drain balance: {}", e);
                    sleep(Duration::from_secs(5), dev_mode).await;
                }
            }
        }
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            drained = true,
        );
        ctx.shutdown();
    });
}

/// The relay's HTTP routes: `GET /getaddr` and `POST /relay`, with
/// permissive CORS for browser clients.
pub fn routes(
    ctx: RelayContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let ctx_filter = warp::any().map(move || ctx.clone());

    let getaddr = warp::path("getaddr")
        .and(warp::get())
        .and(ctx_filter.clone())
        .and_then(handler::handle_get_addr);

    let relay = warp::path("relay")
        .and(warp::post())
        .and(ctx_filter)
        .and(warp::body::json())
        .and_then(handler::handle_relay);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec![
            "Content-Type",
            "Authorization",
            "Content-Length",
            "X-Requested-With",
        ])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    getaddr.or(relay).with(cors)
}

/// Binds the HTTP listener and returns the bound address together with the
/// server future. The server stops when the shutdown signal fires.
pub fn build_web_services(
    ctx: RelayContext,
) -> crate::Result<(SocketAddr, impl Future<Output = ()> + 'static)> {
    let port = ctx.relay().config().port;
    let mut shutdown_signal = ctx.shutdown_signal();
    let shutdown = async move {
        shutdown_signal.recv().await;
    };
    let service = routes(ctx).with(warp::trace::request());
    warp::serve(service)
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), shutdown)
        .map_err(Into::into)
}
