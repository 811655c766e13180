use backoff::ExponentialBackoffBuilder;
use htlcgate_components::backoff::ExponentialBackoffProvider;
use htlcgate_components::forward::forwarder::PaymentForwarder;
use htlcgate_components::intercept::listener::HtlcListener;
use htlcgate_components::intercept::registry::{HtlcInterceptRegistry, HtlcRegistryConfig};
use htlcgate_components::node::memory::{MemoryNode, MemoryRoute};
use htlcgate_service::gateway_lnrpc::gateway_lightning_client::GatewayLightningClient;
use htlcgate_service::{GatewayLightningService, GatewayState};
use htlcgate_service_api::node::{CircuitKey, RawHtlc};
use htlcgate_service_api::payment::{NodeIdentity, Preimage};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Server};

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

/// Real gateway server on an ephemeral port over a memory node.
pub struct GatewayHarness {
    pub node: MemoryNode,
    pub registry: HtlcInterceptRegistry,
    pub client: GatewayLightningClient<Channel>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl GatewayHarness {
    pub async fn start(node: MemoryNode) -> anyhow::Result<Self> {
        Self::start_with(node, HtlcRegistryConfig::default()).await
    }

    pub async fn start_with(node: MemoryNode, config: HtlcRegistryConfig) -> anyhow::Result<Self> {
        let registry = HtlcInterceptRegistry::new(config);
        let shared = Arc::new(node.clone());
        let forwarder = PaymentForwarder::new(shared.clone(), Duration::from_secs(5));
        let state = GatewayState::new(shared.clone(), forwarder, registry.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut builder = ExponentialBackoffBuilder::new();
        builder
            .with_initial_interval(Duration::from_millis(10))
            .with_max_interval(Duration::from_millis(50))
            .with_max_elapsed_time(None);
        let listener = HtlcListener::new(
            shared,
            registry.clone(),
            ExponentialBackoffProvider::new(builder),
        );

        let mut handles = Vec::new();

        let listener_shutdown = shutdown_rx.clone();
        handles.push(tokio::spawn(async move {
            let _ = listener.start(listener_shutdown).await;
        }));

        let sweeper = registry.clone();
        let sweeper_shutdown = shutdown_rx.clone();
        handles.push(tokio::spawn(async move {
            sweeper.start(sweeper_shutdown).await
        }));

        let tcp = TcpListener::bind("127.0.0.1:0").await?;
        let address = tcp.local_addr()?;
        let mut server_shutdown = shutdown_rx;
        handles.push(tokio::spawn(async move {
            let _ = Server::builder()
                .add_service(GatewayLightningService::server(state))
                .serve_with_incoming_shutdown(TcpListenerStream::new(tcp), async move {
                    let _ = server_shutdown.changed().await;
                })
                .await;
        }));

        let client = GatewayLightningClient::connect(format!("http://{address}")).await?;

        let connected = {
            let node = node.clone();
            eventually(move || {
                let node = node.clone();
                async move { node.connections() >= 1 }
            })
            .await
        };
        anyhow::ensure!(connected, "memory node never saw the listener connect");

        Ok(Self {
            node,
            registry,
            client,
            shutdown_tx,
            handles,
        })
    }

    pub async fn wait_for_subscriptions(&self, count: usize) -> bool {
        let registry = self.registry.clone();
        eventually(move || {
            let registry = registry.clone();
            async move { registry.subscription_count() >= count }
        })
        .await
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        drop(self.client);
        for handle in self.handles {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }
}
