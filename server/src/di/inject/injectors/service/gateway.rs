use crate::di::inject::injectors::config::ServerConfigInjector;
use crate::di::inject::injectors::node::NodeInjector;
use crate::di::inject::injectors::registry::RegistryInjector;
use crate::di::inject::injectors::service::tls::load_server_x509_credentials;
use anyhow::Context;
use htlcgate_components::forward::forwarder::{PaymentForwarder, PAYMENT_TIMEOUT_GRACE};
use htlcgate_service::{GatewayLightningService, GatewayState};
use log::{info, warn};
use std::future::Future;
use std::net::TcpListener;
use std::pin::Pin;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

pub struct GatewayServiceInjector {
    config: ServerConfigInjector,
    node: NodeInjector,
    registry: RegistryInjector,
}

impl GatewayServiceInjector {
    pub fn new(
        config: ServerConfigInjector,
        node: NodeInjector,
        registry: RegistryInjector,
    ) -> Self {
        Self {
            config,
            node,
            registry,
        }
    }

    pub async fn connect(
        &self,
    ) -> anyhow::Result<Pin<Box<dyn Future<Output = anyhow::Result<()>>>>> {
        let config = self.config.get();
        let service_config = &config.gateway_service;

        let node = self.node.get()?;
        let registry = self.registry.get()?;
        // the node client waits payment timeout + its own timeout, outlast it
        let forwarder = PaymentForwarder::new(node.clone(), config.payment_timeout()?)
            .with_response_grace(config.node_client_timeout()? + PAYMENT_TIMEOUT_GRACE);

        let listener = TcpListener::bind(service_config.address).with_context(|| {
            format!(
                "binding TCP listener for gateway service to address {}",
                service_config.address
            )
        })?;
        let local_addr = listener
            .local_addr()
            .with_context(|| "verifying gateway service address")?;
        listener
            .set_nonblocking(true)
            .with_context(|| "configuring gateway service listener")?;
        let listener = tokio::net::TcpListener::from_std(listener)
            .with_context(|| "registering gateway service listener")?;

        let mut server = Server::builder();
        if let Some(tls) = &service_config.tls {
            let tls_config = load_server_x509_credentials(tls).with_context(|| {
                format!(
                    "loading tls certificate for gateway service {}",
                    service_config.address
                )
            })?;
            server = server
                .tls_config(tls_config)
                .with_context(|| "configuring gateway service TLS")?;
            info!("gateway service with TLS, listening on: {local_addr}");
        } else {
            warn!("gateway service missing TLS, listening on: {local_addr}");
        }

        let router = server.add_service(GatewayLightningService::server(GatewayState::new(
            node, forwarder, registry,
        )));

        let f = async move {
            router
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
                .with_context(|| format!("serving gateway service on {local_addr}"))
        };

        Ok(Box::pin(f))
    }
}
