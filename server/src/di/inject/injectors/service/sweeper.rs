use crate::di::inject::injectors::registry::RegistryInjector;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::watch;

pub struct HtlcSweeperInjector {
    registry: RegistryInjector,
}

impl HtlcSweeperInjector {
    pub fn new(registry: RegistryInjector) -> Self {
        Self { registry }
    }

    pub fn start(
        &self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>> {
        let registry = self.registry.get()?;

        let f = async move {
            registry.start(shutdown_rx).await;
            Ok(())
        };
        Ok(Box::pin(f))
    }
}
