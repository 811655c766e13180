use htlcgate_components::node::memory::{MemoryNode, MemoryRoute};
use htlcgate_service_api::node::{CircuitKey, RawHtlc};
use htlcgate_service_api::payment::{NodeIdentity, Preimage};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

pub fn identity() -> NodeIdentity {
    NodeIdentity::from_str("02eec7245d6b7d2ccb30380bfbe2a3648cd7a942653f5aa340edcea1f283686619")
        .unwrap()
}

pub async fn memory_node(balance_msat: u64, fee_msat: u64, cltv_delta: u64) -> MemoryNode {
    let node = MemoryNode::new(identity(), balance_msat);
    node.add_route(MemoryRoute {
        fee_msat,
        cltv_delta,
        latency: Duration::ZERO,
    })
    .await;
    node
}

pub fn raw_htlc(preimage: &Preimage, short_channel_id: u64, htlc_id: u64) -> RawHtlc {
    RawHtlc {
        payment_hash: preimage.payment_hash().0.to_vec(),
        incoming_circuit: CircuitKey {
            chan_id: 100,
            htlc_id,
        },
        incoming_amount_msat: 3100,
        outgoing_amount_msat: 3000,
        short_channel_id,
        incoming_expiry: 850_000,
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
