use crate::payment::{NodeIdentity, PaymentHash, Preimage};
use crate::service::{HasAdapterErrorKind, HasServiceErrorSource};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Transport to the lightning node's own RPC.
#[async_trait]
pub trait NodeRpcClient {
    type Error: std::error::Error
        + HasServiceErrorSource
        + HasAdapterErrorKind
        + Send
        + Sync
        + 'static;

    async fn get_pub_key(&self) -> Result<NodeIdentity, Self::Error>;

    /// Hints a payer can put in an invoice to reach this node over its
    /// private or unannounced channels. One single hop hint per usable
    /// channel.
    async fn route_hints(&self) -> Result<Vec<RouteHint>, Self::Error>;

    /// Runs one payment attempt to completion. No retries.
    async fn send_payment(
        &self,
        request: NodePaymentRequest,
    ) -> Result<NodePaymentResult, Self::Error>;

    /// Opens a fresh HTLC interception stream. The returned handle owns the
    /// connection; when `notifications` ends the connection is gone and a new
    /// call is needed.
    async fn listen_htlcs(&self) -> Result<NodeHtlcStream, Self::Error>;
}

/// Last hops into this node, ordered from the payer side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteHint {
    pub hops: Vec<RouteHintHop>,
}

/// A channel into this node together with the forwarding policy its remote
/// end applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteHintHop {
    pub src_node_id: NodeIdentity,
    pub short_channel_id: u64,
    pub base_msat: u32,
    pub proportional_millionths: u32,
    pub cltv_expiry_delta: u32,
    pub htlc_minimum_msat: Option<u64>,
    pub htlc_maximum_msat: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodePaymentRequest {
    pub invoice: String,
    pub payment_hash: PaymentHash,
    pub amount_msat: u64,
    pub fee_limit_msat: u64,
    /// Maximum total timelock delta of the route, in blocks.
    pub max_delay: u64,
    pub timeout: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodePaymentResult {
    Succeeded { preimage: Preimage, fee_msat: u64 },
    Failed(NodePaymentFailure),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodePaymentFailure {
    NoRoute,
    Timeout,
    InsufficientBalance,
    IncorrectPaymentDetails,
    Other,
}

impl fmt::Display for NodePaymentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePaymentFailure::NoRoute => write!(f, "no route"),
            NodePaymentFailure::Timeout => write!(f, "timeout"),
            NodePaymentFailure::InsufficientBalance => write!(f, "insufficient balance"),
            NodePaymentFailure::IncorrectPaymentDetails => {
                write!(f, "incorrect payment details")
            }
            NodePaymentFailure::Other => write!(f, "other"),
        }
    }
}

/// Incoming HTLC identifier on the node: inbound channel plus per channel index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CircuitKey {
    pub chan_id: u64,
    pub htlc_id: u64,
}

/// An HTLC held by the node, as reported by the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawHtlc {
    pub payment_hash: Vec<u8>,
    pub incoming_circuit: CircuitKey,
    pub incoming_amount_msat: u64,
    pub outgoing_amount_msat: u64,
    /// Channel the payer asked the HTLC to be forwarded over.
    pub short_channel_id: u64,
    /// Absolute block height at which the incoming HTLC times out.
    pub incoming_expiry: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeHtlcAction {
    Settle(Preimage),
    Fail,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeHtlcResolution {
    pub circuit: CircuitKey,
    pub action: NodeHtlcAction,
}

/// One live interception connection to the node.
#[derive(Debug)]
pub struct NodeHtlcStream {
    pub notifications: mpsc::Receiver<RawHtlc>,
    pub resolutions: mpsc::UnboundedSender<NodeHtlcResolution>,
}
