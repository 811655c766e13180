use crate::di::inject::injectors::backoff::BackoffInjector;
use crate::di::inject::injectors::node::NodeInjector;
use crate::di::inject::injectors::registry::RegistryInjector;
use htlcgate_components::intercept::listener::HtlcListener;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::watch;

pub struct HtlcListenerInjector {
    node: NodeInjector,
    registry: RegistryInjector,
    backoff: BackoffInjector,
}

impl HtlcListenerInjector {
    pub fn new(node: NodeInjector, registry: RegistryInjector, backoff: BackoffInjector) -> Self {
        Self {
            node,
            registry,
            backoff,
        }
    }

    pub fn start(
        &self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>> {
        let listener = HtlcListener::new(self.node.get()?, self.registry.get()?, self.backoff.get());

        let f = async move {
            listener.start(shutdown_rx).await?;
            Ok(())
        };
        Ok(Box::pin(f))
    }
}
