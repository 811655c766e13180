use crate::di::delegates::NodeClientDelegate;
use crate::di::inject::injectors::config::ServerConfigInjector;
use crate::di::Node;
use htlcgate_components::node::lnd::grpc::client::LndGrpcNodeClient;
use htlcgate_components::node::NodeClientConfig;
use log::info;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Clone)]
pub struct NodeInjector {
    config: ServerConfigInjector,
    singleton: Rc<RefCell<Option<Arc<Node>>>>,
}

impl NodeInjector {
    pub fn new(config: ServerConfigInjector) -> Self {
        Self {
            config,
            singleton: Default::default(),
        }
    }

    pub fn get(&self) -> anyhow::Result<Arc<Node>> {
        if let Some(node) = self.singleton.borrow().as_ref() {
            return Ok(node.clone());
        }
        self.inject()
    }

    fn inject(&self) -> anyhow::Result<Arc<Node>> {
        let config = self.config.get();
        let timeout = config.node_client_timeout()?;

        let node = match &config.node {
            NodeClientConfig::LndGrpc(lnd) => {
                info!("using LND node at {}", lnd.url);
                NodeClientDelegate::LndGrpc(LndGrpcNodeClient::new(timeout, lnd.clone()))
            }
        };

        let node = Arc::new(node);
        *self.singleton.borrow_mut() = Some(node.clone());
        Ok(node)
    }
}
