use crate::node::error::NodeClientError;
use async_trait::async_trait;
use htlcgate_service_api::node::{
    NodeHtlcResolution, NodeHtlcStream, NodePaymentFailure, NodePaymentRequest, NodePaymentResult,
    NodeRpcClient, RawHtlc, RouteHint,
};
use htlcgate_service_api::payment::{NodeIdentity, PaymentHash, Preimage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

const MEMORY_NODE_BUFFER: usize = 64;

/// A route the in-memory node can pay over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryRoute {
    pub fee_msat: u64,
    pub cltv_delta: u64,
    pub latency: Duration,
}

#[derive(Debug, Default)]
struct MemoryNodeState {
    routes: Vec<MemoryRoute>,
    route_hints: Vec<RouteHint>,
    balance_msat: u64,
    preimages: HashMap<PaymentHash, Preimage>,
    paid: Vec<(PaymentHash, u64)>,
    feed: Option<mpsc::Sender<RawHtlc>>,
}

/// Lightning node living in process memory. Payments succeed when a route fits
/// the caller's bounds, the balance covers amount plus fee and the payee
/// preimage was registered. HTLCs are injected by hand.
#[derive(Clone, Debug)]
pub struct MemoryNode {
    identity: NodeIdentity,
    available: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
    connections: Arc<AtomicU64>,
    state: Arc<Mutex<MemoryNodeState>>,
    resolutions_tx: mpsc::UnboundedSender<NodeHtlcResolution>,
    resolutions_rx: Arc<Mutex<mpsc::UnboundedReceiver<NodeHtlcResolution>>>,
}

impl MemoryNode {
    pub fn new(identity: NodeIdentity, balance_msat: u64) -> Self {
        let (resolutions_tx, resolutions_rx) = mpsc::unbounded_channel();
        Self {
            identity,
            available: Arc::new(AtomicBool::new(true)),
            stalled: Arc::new(AtomicBool::new(false)),
            connections: Arc::new(Default::default()),
            state: Arc::new(Mutex::new(MemoryNodeState {
                balance_msat,
                ..Default::default()
            })),
            resolutions_tx,
            resolutions_rx: Arc::new(Mutex::new(resolutions_rx)),
        }
    }

    pub async fn add_route(&self, route: MemoryRoute) {
        self.state.lock().await.routes.push(route);
    }

    /// Publishes a hint through `route_hints`, in insertion order.
    pub async fn add_route_hint(&self, hint: RouteHint) {
        self.state.lock().await.route_hints.push(hint);
    }

    /// Makes invoices for `preimage.payment_hash()` payable.
    pub async fn add_payee_preimage(&self, preimage: Preimage) {
        self.state
            .lock()
            .await
            .preimages
            .insert(preimage.payment_hash(), preimage);
    }

    pub async fn balance_msat(&self) -> u64 {
        self.state.lock().await.balance_msat
    }

    /// Payment hashes paid so far, with the amount plus fee debited.
    pub async fn paid(&self) -> Vec<(PaymentHash, u64)> {
        self.state.lock().await.paid.clone()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// While stalled, payments are accepted and never report an outcome.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Number of interception streams opened so far.
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }

    /// Hands an HTLC to the current interception stream. False when no
    /// stream is open.
    pub async fn inject_htlc(&self, htlc: RawHtlc) -> bool {
        let feed = self.state.lock().await.feed.clone();
        match feed {
            None => false,
            Some(feed) => feed.send(htlc).await.is_ok(),
        }
    }

    /// Ends the current interception stream as if the node connection dropped.
    pub async fn drop_connection(&self) {
        self.state.lock().await.feed = None;
    }

    /// Next HTLC resolution sent back to the node, waiting at most `wait`.
    pub async fn next_resolution(&self, wait: Duration) -> Option<NodeHtlcResolution> {
        let mut rx = self.resolutions_rx.lock().await;
        tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
    }

    fn check_available(&self, context: &'static str) -> Result<(), NodeClientError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NodeClientError::from_unavailable(
                "memory node switched off".to_string(),
                context,
            ))
        }
    }
}

#[async_trait]
impl NodeRpcClient for MemoryNode {
    type Error = NodeClientError;

    async fn get_pub_key(&self) -> Result<NodeIdentity, Self::Error> {
        self.check_available("memory node get pubkey")?;
        Ok(self.identity)
    }

    async fn route_hints(&self) -> Result<Vec<RouteHint>, Self::Error> {
        self.check_available("memory node route hints")?;
        Ok(self.state.lock().await.route_hints.clone())
    }

    async fn send_payment(
        &self,
        request: NodePaymentRequest,
    ) -> Result<NodePaymentResult, Self::Error> {
        self.check_available("memory node send payment")?;
        if self.stalled.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }

        let route = {
            let state = self.state.lock().await;
            state
                .routes
                .iter()
                .filter(|r| r.fee_msat <= request.fee_limit_msat)
                .filter(|r| request.max_delay == 0 || r.cltv_delta <= request.max_delay)
                .min_by_key(|r| r.fee_msat)
                .cloned()
        };

        let route = match route {
            None => return Ok(NodePaymentResult::Failed(NodePaymentFailure::NoRoute)),
            Some(route) => route,
        };

        if route.latency > request.timeout {
            tokio::time::sleep(request.timeout).await;
            return Ok(NodePaymentResult::Failed(NodePaymentFailure::Timeout));
        }
        tokio::time::sleep(route.latency).await;

        let mut state = self.state.lock().await;
        let preimage = match state.preimages.get(&request.payment_hash) {
            None => {
                return Ok(NodePaymentResult::Failed(
                    NodePaymentFailure::IncorrectPaymentDetails,
                ))
            }
            Some(preimage) => *preimage,
        };

        let debit = request.amount_msat + route.fee_msat;
        if state.balance_msat < debit {
            return Ok(NodePaymentResult::Failed(
                NodePaymentFailure::InsufficientBalance,
            ));
        }
        state.balance_msat -= debit;
        state.paid.push((request.payment_hash, debit));

        Ok(NodePaymentResult::Succeeded {
            preimage,
            fee_msat: route.fee_msat,
        })
    }

    async fn listen_htlcs(&self) -> Result<NodeHtlcStream, Self::Error> {
        self.check_available("memory node listen htlcs")?;

        let (feed_tx, feed_rx) = mpsc::channel(MEMORY_NODE_BUFFER);
        let (resolution_tx, mut resolution_rx) = mpsc::unbounded_channel();

        // replacing the feed closes the previous stream
        self.state.lock().await.feed = Some(feed_tx);
        self.connections.fetch_add(1, Ordering::SeqCst);

        let resolutions_tx = self.resolutions_tx.clone();
        tokio::spawn(async move {
            while let Some(resolution) = resolution_rx.recv().await {
                if resolutions_tx.send(resolution).is_err() {
                    break;
                }
            }
        });

        Ok(NodeHtlcStream {
            notifications: feed_rx,
            resolutions: resolution_tx,
        })
    }
}
