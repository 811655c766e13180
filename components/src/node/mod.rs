pub mod error;
pub mod lnd;
pub mod memory;

use crate::node::lnd::grpc::config::LndGrpcNodeConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(tag = "type")]
pub enum NodeClientConfig {
    LndGrpc(LndGrpcNodeConfig),
}
