use htlcgate_components::forward::forwarder::PaymentForwarder;
use htlcgate_components::intercept::registry::HtlcInterceptRegistry;
use std::sync::Arc;

pub struct GatewayState<N> {
    node: Arc<N>,
    forwarder: PaymentForwarder<N>,
    registry: HtlcInterceptRegistry,
}

impl<N> Clone for GatewayState<N> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            forwarder: self.forwarder.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<N> GatewayState<N> {
    pub fn new(
        node: Arc<N>,
        forwarder: PaymentForwarder<N>,
        registry: HtlcInterceptRegistry,
    ) -> Self {
        Self {
            node,
            forwarder,
            registry,
        }
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn forwarder(&self) -> &PaymentForwarder<N> {
        &self.forwarder
    }

    pub fn registry(&self) -> &HtlcInterceptRegistry {
        &self.registry
    }
}
