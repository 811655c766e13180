use crate::di::macros::delegate_to_node_client_variants;
use async_trait::async_trait;
use htlcgate_components::backoff::{
    BackoffInstance, BackoffProvider, ExponentialBackoffProvider, StopBackoffProvider,
};
use htlcgate_components::node::error::NodeClientError;
use htlcgate_components::node::lnd::grpc::client::LndGrpcNodeClient;
use htlcgate_service_api::node::{
    NodeHtlcStream, NodePaymentRequest, NodePaymentResult, NodeRpcClient, RouteHint,
};
use htlcgate_service_api::payment::NodeIdentity;

// ===== NODE CLIENT DELEGATE =====

pub enum NodeClientDelegate {
    LndGrpc(LndGrpcNodeClient),
}

#[async_trait]
impl NodeRpcClient for NodeClientDelegate {
    type Error = NodeClientError;

    async fn get_pub_key(&self) -> Result<NodeIdentity, Self::Error> {
        delegate_to_node_client_variants!(self, get_pub_key).await
    }

    async fn route_hints(&self) -> Result<Vec<RouteHint>, Self::Error> {
        delegate_to_node_client_variants!(self, route_hints).await
    }

    async fn send_payment(
        &self,
        request: NodePaymentRequest,
    ) -> Result<NodePaymentResult, Self::Error> {
        delegate_to_node_client_variants!(self, send_payment, request).await
    }

    async fn listen_htlcs(&self) -> Result<NodeHtlcStream, Self::Error> {
        delegate_to_node_client_variants!(self, listen_htlcs).await
    }
}

// ===== BACKOFF PROVIDER DELEGATE =====

#[derive(Clone)]
pub enum BackoffProviderDelegate {
    Stop(StopBackoffProvider),
    Exponential(ExponentialBackoffProvider),
}

impl BackoffProvider for BackoffProviderDelegate {
    type Item = BackoffInstance;

    fn get_backoff(&self) -> Self::Item {
        match self {
            Self::Stop(provider) => BackoffInstance::Stop(provider.get_backoff()),
            Self::Exponential(provider) => BackoffInstance::Exponential(provider.get_backoff()),
        }
    }
}
