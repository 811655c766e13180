pub(crate) mod gateway;

#[allow(clippy::all)]
pub mod gateway_lnrpc {
    tonic::include_proto!("gateway_lnrpc");
}

pub use crate::gateway::service::GatewayLightningService;
pub use crate::gateway::state::GatewayState;
