//! HTTP handlers for the relay's two endpoints.
//!
//! Every failure is reported as a JSON `{"error": "..."}` body with HTTP
//! status 200: companion clients parse JSON out of every response, so a
//! non-200 status would break them. Keep it that way unless the client is
//! changed in lockstep.

use std::convert::Infallible;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::context::RelayContext;
use crate::error::Error;
use crate::relay::RelayTransactionRequest;

/// The `/getaddr` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetAddrResponse {
    /// The relay's on-chain address.
    pub relay_server_address: Address,
    /// The minimum gas price the relay currently accepts.
    #[serde(with = "crate::utils::dec_u256")]
    pub min_gas_price: U256,
    /// Whether the relay passes its readiness gate.
    pub ready: bool,
    /// The daemon version.
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

fn error_reply(err: &Error) -> warp::reply::Json {
    warp::reply::json(&ErrorResponse {
        error: err.to_string(),
    })
}

/// `GET /getaddr`: the relay's address, minimum gas price, readiness and
/// version.
pub async fn handle_get_addr(
    ctx: RelayContext,
) -> Result<impl warp::Reply, Infallible> {
    let relay = ctx.relay();
    let response = GetAddrResponse {
        relay_server_address: relay.address(),
        min_gas_price: relay.gas_price().unwrap_or_default(),
        ready: relay.should_handle_requests(),
        version: crate::VERSION.to_string(),
    };
    tracing::debug!(address = %relay.address(), "address sent");
    Ok(warp::reply::json(&response))
}

/// `POST /relay`: the readiness gate followed by the submission pipeline.
pub async fn handle_relay(
    ctx: RelayContext,
    request: RelayTransactionRequest,
) -> Result<impl warp::Reply, Infallible> {
    tracing::debug!(
        from = %request.from,
        to = %request.to,
        "handling relay request..."
    );
    if let Err(e) = assure_relay_ready(&ctx).await {
        tracing::warn!("refusing relay request: {}", e);
        return Ok(error_reply(&e));
    }
    match ctx.relay().create_relay_transaction(request).await {
        Ok(response) => Ok(warp::reply::json(&response)),
        Err(e) => {
            tracing::warn!("failed to relay: {}", e);
            Ok(error_reply(&e))
        }
    }
}

/// The request guard: the relay must be staked, registered and not
/// removed, must hold an operating balance, and must know a gas price.
async fn assure_relay_ready(ctx: &RelayContext) -> crate::Result<()> {
    let relay = ctx.relay();
    if !relay.should_handle_requests() {
        return Err(Error::NotReady);
    }
    let balance = relay.balance().await?;
    if balance.is_zero() {
        return Err(Error::WaitingForFunding);
    }
    tracing::debug!(%balance, "relay balance");
    if relay.gas_price().is_none() {
        return Err(Error::WaitingForGasPrice);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::routes;
    use crate::test_utils::test_rig;
    use ethers::types::Bytes;

    fn sample_request(
        hub: Address,
        to: Address,
    ) -> RelayTransactionRequest {
        RelayTransactionRequest {
            encoded_function: Bytes::from(vec![0xde, 0xad]),
            approval_data: Bytes::new(),
            signature: Bytes::from(vec![1u8; 65]),
            from: Address::random(),
            to,
            gas_price: U256::from(2_000_000_000u64),
            gas_limit: U256::from(100_000u64),
            sender_nonce: U256::zero(),
            relay_max_nonce: U256::from(1000u64),
            relay_fee: U256::from(10u64),
            relay_hub_address: hub,
        }
    }

    #[tokio::test]
    async fn getaddr_reports_address_readiness_and_version() {
        let rig = test_rig(false).await;
        let ctx = RelayContext::new(rig.relay.clone());
        let filter = routes(ctx);
        let response = warp::test::request()
            .method("GET")
            .path("/getaddr")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), 200);
        let body: GetAddrResponse =
            serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.relay_server_address, rig.relay.address());
        assert!(!body.ready);
        assert_eq!(body.version, crate::VERSION);
    }

    #[tokio::test]
    async fn relay_refuses_until_staked_and_registered() {
        let rig = test_rig(false).await;
        let ctx = RelayContext::new(rig.relay.clone());
        let filter = routes(ctx);
        let request =
            sample_request(rig.relay.hub_address(), rig.recipient);
        let response = warp::test::request()
            .method("POST")
            .path("/relay")
            .json(&request)
            .reply(&filter)
            .await;
        // errors still travel with status 200 for client compatibility
        assert_eq!(response.status(), 200);
        let body: serde_json::Value =
            serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "Relay not staked and registered yet");
    }

    #[tokio::test]
    async fn relay_reports_missing_funding() {
        let rig = test_rig(false).await;
        rig.relay.set_ready(true);
        rig.chain.set_balance(rig.relay.address(), U256::zero());
        let ctx = RelayContext::new(rig.relay.clone());
        let filter = routes(ctx);
        let request =
            sample_request(rig.relay.hub_address(), rig.recipient);
        let response = warp::test::request()
            .method("POST")
            .path("/relay")
            .json(&request)
            .reply(&filter)
            .await;
        let body: serde_json::Value =
            serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "Waiting for funding...");
    }

    #[tokio::test]
    async fn relay_submits_when_ready() {
        let rig = test_rig(false).await;
        rig.relay.set_ready(true);
        let ctx = RelayContext::new(rig.relay.clone());
        let filter = routes(ctx);
        let request =
            sample_request(rig.relay.hub_address(), rig.recipient);
        let response = warp::test::request()
            .method("POST")
            .path("/relay")
            .json(&request)
            .reply(&filter)
            .await;
        assert_eq!(response.status(), 200);
        let body: serde_json::Value =
            serde_json::from_slice(response.body()).unwrap();
        assert!(body.get("SignedTx").is_some(), "body: {body}");
        assert!(body.get("RawTxBytes").is_some());
        assert_eq!(rig.chain.sent_count(), 1);
    }

    #[tokio::test]
    async fn pipeline_errors_become_json_error_bodies() {
        let rig = test_rig(false).await;
        rig.relay.set_ready(true);
        let ctx = RelayContext::new(rig.relay.clone());
        let filter = routes(ctx);
        let mut request =
            sample_request(rig.relay.hub_address(), rig.recipient);
        request.relay_fee = U256::one();
        let response = warp::test::request()
            .method("POST")
            .path("/relay")
            .json(&request)
            .reply(&filter)
            .await;
        assert_eq!(response.status(), 200);
        let body: serde_json::Value =
            serde_json::from_slice(response.body()).unwrap();
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Unacceptable fee"), "got: {message}");
    }
}
