#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use structopt::StructOpt;

use metatx_relayer::chain::{ChainClient, EthClient};
use metatx_relayer::config::RelayConfig;
use metatx_relayer::context::RelayContext;
use metatx_relayer::hub::RelayHubClient;
use metatx_relayer::keys;
use metatx_relayer::probe;
use metatx_relayer::relay::RelayServer;
use metatx_relayer::service;
use metatx_relayer::store::sled::SledTxStore;
use metatx_relayer::VERSION;

/// The meta-transaction relay daemon.
///
/// Submits HTTP-wrapped, signed user calls to the chain as its own
/// transactions and is reimbursed by the configured hub contract.
#[derive(StructOpt)]
#[structopt(name = "metatx-relayer")]
struct Opts {
    /// A level of verbosity, and can be used multiple times
    #[structopt(short, long, parse(from_occurrences))]
    verbose: i32,
    /// Relay's owner address; discovered from the hub when omitted.
    #[structopt(long = "OwnerAddress")]
    owner_address: Option<Address>,
    /// Relay's per transaction fee, in percent over raw gas cost.
    #[structopt(long = "Fee", default_value = "70")]
    fee: u64,
    /// Relay server's url, as advertised on the hub.
    #[structopt(long = "Url", default_value = "http://localhost:8090")]
    url: String,
    /// Relay server's port; defaults to the port embedded in the url.
    #[structopt(long = "Port")]
    port: Option<u16>,
    /// RelayHub address.
    #[structopt(long = "RelayHubAddress")]
    relay_hub_address: Address,
    /// Relay's default gasPrice in wei, used when the node suggests zero.
    #[structopt(long = "DefaultGasPrice", default_value = "1000000000")]
    default_gas_price: u64,
    /// Relay's gas price markup as a percentage over eth_gasPrice().
    #[structopt(long = "GasPricePercent", default_value = "10")]
    gas_price_percent: u64,
    /// Relay registration window, in blocks.
    #[structopt(long = "RegistrationBlockRate", default_value = "5800")]
    registration_block_rate: u64,
    /// The relay's ethereum node.
    #[structopt(long = "EthereumNodeUrl", default_value = "http://localhost:8545")]
    ethereum_node_url: url::Url,
    /// The relay server's workdir, holding the keystore and the database.
    #[structopt(long = "Workdir", default_value = "./data", parse(from_os_str))]
    workdir: PathBuf,
    /// Enable developer mode: no nonce caching, no resend loop, short
    /// sleeps.
    #[structopt(long = "DevMode")]
    dev_mode: bool,
}

#[paw::main]
#[tokio::main]
async fn main(args: Opts) -> anyhow::Result<()> {
    setup_logger(args.verbose)?;
    tracing::info!(version = VERSION, "relay server starting");

    let config = RelayConfig {
        owner_address: args.owner_address,
        fee: args.fee.into(),
        port: RelayConfig::resolve_port(&args.url, args.port),
        url: args.url,
        hub_address: args.relay_hub_address,
        default_gas_price: args.default_gas_price.into(),
        gas_price_percent: args.gas_price_percent,
        registration_block_rate: args.registration_block_rate,
        ethereum_node_url: args.ethereum_node_url,
        workdir: args.workdir,
        dev_mode: args.dev_mode,
    };
    tracing::info!(hub = %config.hub_address, workdir = %config.workdir.display(), "using relay hub");
    if config.dev_mode {
        tracing::warn!("using dev mode");
    }

    let wallet = keys::load_or_create_wallet(&config.keystore_dir())
        .context("failed to load the relay signing key")?;

    let provider =
        Provider::<Http>::try_from(config.ethereum_node_url.as_str())
            .context("invalid ethereum node url")?
            .interval(Duration::from_millis(500));
    let chain = Arc::new(EthClient::new(
        provider.clone(),
        config.default_gas_price,
    ));
    let chain_id = chain
        .network_id()
        .await
        .context("could not connect to the ethereum node")?
        .as_u64();
    tracing::info!(chain_id, "connected to ethereum node");

    let store = SledTxStore::open(config.db_dir())
        .context("could not open the local transactions database")?;
    let hub =
        Arc::new(RelayHubClient::new(config.hub_address, Arc::new(provider)));

    let relay = RelayServer::new(
        config,
        wallet,
        chain,
        hub,
        Arc::new(store),
        chain_id,
        None,
    )
    .context("could not create the relay server")?;
    let ctx = RelayContext::new(Arc::new(relay));

    service::start_background_tasks(&ctx);
    let (addr, server) = service::build_web_services(ctx.clone())?;
    tracing::info!("relay server started, listening on {}", addr);
    tracing::event!(
        target: probe::TARGET,
        tracing::Level::DEBUG,
        kind = %probe::Kind::Lifecycle,
        started = true,
    );

    let mut server_handle = tokio::spawn(server);
    tokio::select! {
        _ = &mut server_handle => {
            // the drain path completed and closed the listener
            tracing::info!("http listener stopped");
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => {
                    tracing::warn!("shutting down...");
                    ctx.shutdown();
                    let _ = server_handle.await;
                }
                Err(err) => {
                    tracing::error!("unable to listen for shutdown signal: {}", err);
                    ctx.shutdown();
                    std::process::exit(1);
                }
            }
        }
    }

    ctx.relay().close_store()?;
    tracing::info!("clean exit ..");
    Ok(())
}

fn setup_logger(verbosity: i32) -> anyhow::Result<()> {
    use tracing::Level;
    let log_level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("metatx_relayer={}", log_level).parse()?);
    tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(log_level)
        .with_env_filter(env_filter)
        .init();
    Ok(())
}
