use crate::backoff::BackoffProvider;
use crate::intercept::error::InterceptError;
use crate::intercept::registry::HtlcInterceptRegistry;
use backoff::backoff::Backoff;
use htlcgate_service_api::node::{NodeHtlcStream, NodeRpcClient};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

enum StreamEnd {
    Shutdown,
    ConnectionLost,
}

/// Keeps one interception stream open against the node and feeds it into
/// the registry, reopening it with backoff whenever it drops.
pub struct HtlcListener<N, B> {
    node: Arc<N>,
    registry: HtlcInterceptRegistry,
    backoff: B,
}

impl<N, B> HtlcListener<N, B>
where
    N: NodeRpcClient + Send + Sync + 'static,
    B: BackoffProvider,
{
    pub fn new(node: Arc<N>, registry: HtlcInterceptRegistry, backoff: B) -> Self {
        Self {
            node,
            registry,
            backoff,
        }
    }

    pub async fn start(
        &self,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), InterceptError> {
        let mut backoff = self.backoff.get_backoff();

        loop {
            if *shutdown_rx.borrow() {
                return Ok(());
            }

            let opened = tokio::select! {
                opened = self.node.listen_htlcs() => opened,
                _ = shutdown_rx.changed() => return Ok(()),
            };

            let failure = match opened {
                Ok(stream) => {
                    backoff = self.backoff.get_backoff();
                    info!("intercepting htlcs from node");
                    match self.intercept(stream, &mut shutdown_rx).await {
                        StreamEnd::Shutdown => return Ok(()),
                        StreamEnd::ConnectionLost => "node htlc stream ended".to_string(),
                    }
                }
                Err(e) => format!("opening node htlc stream: {e}"),
            };

            match backoff.next_backoff() {
                None => {
                    error!("giving up on node htlc interception: {failure}");
                    self.registry.shutdown();
                    return Err(InterceptError::connection_lost(failure));
                }
                Some(delay) => {
                    warn!("{failure}, reconnecting in {delay:?}");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown_rx.changed() => return Ok(()),
                    }
                }
            }
        }
    }

    async fn intercept(
        &self,
        stream: NodeHtlcStream,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> StreamEnd {
        let NodeHtlcStream {
            mut notifications,
            resolutions,
        } = stream;
        let connection = self.registry.connect(resolutions);

        loop {
            tokio::select! {
                htlc = notifications.recv() => match htlc {
                    Some(htlc) => {
                        self.registry.on_htlc_arrived(&connection, htlc);
                    }
                    None => {
                        self.registry.on_connection_lost(&connection);
                        return StreamEnd::ConnectionLost;
                    }
                },
                _ = shutdown_rx.changed() => return StreamEnd::Shutdown,
            }
        }
    }
}
