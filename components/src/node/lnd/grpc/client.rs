use crate::node::error::NodeClientError;
use crate::node::lnd::grpc::config::{LndGrpcClientAuth, LndGrpcNodeConfig};
use async_trait::async_trait;
use fedimint_tonic_lnd::lnrpc::payment::PaymentStatus;
use fedimint_tonic_lnd::lnrpc::{
    ChanInfoRequest, ChannelEdge, GetInfoRequest, ListChannelsRequest, Payment,
    PaymentFailureReason,
};
use fedimint_tonic_lnd::routerrpc::{
    CircuitKey as LndCircuitKey, ForwardHtlcInterceptRequest, ForwardHtlcInterceptResponse,
    ResolveHoldForwardAction, SendPaymentRequest,
};
pub use fedimint_tonic_lnd::tonic;
use fedimint_tonic_lnd::{connect, Client};
use htlcgate_service_api::node::{
    CircuitKey, NodeHtlcAction, NodeHtlcResolution, NodeHtlcStream, NodePaymentFailure,
    NodePaymentRequest, NodePaymentResult, NodeRpcClient, RawHtlc, RouteHint, RouteHintHop,
};
use htlcgate_service_api::payment::{NodeIdentity, Preimage};
use log::{debug, info, warn};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

const INTERCEPT_BUFFER: usize = 64;

pub struct LndGrpcNodeClient {
    timeout: Duration,
    config: LndGrpcNodeConfig,
    inner: Arc<Mutex<Option<Arc<InnerLndGrpcClient>>>>,
}

impl LndGrpcNodeClient {
    pub fn new(timeout: Duration, config: LndGrpcNodeConfig) -> Self {
        Self {
            timeout,
            config,
            inner: Arc::new(Default::default()),
        }
    }

    async fn inner_connect(&self) -> Result<Arc<InnerLndGrpcClient>, NodeClientError> {
        let mut inner = self.inner.lock().await;
        match inner.as_ref() {
            None => {
                let inner_connect = Arc::new(
                    InnerLndGrpcClient::connect(
                        self.timeout,
                        self.config.clone(),
                        self.config.url.clone(),
                    )
                    .await?,
                );
                *inner = Some(inner_connect.clone());
                Ok(inner_connect)
            }
            Some(inner) => Ok(inner.clone()),
        }
    }

    async fn inner_disconnect(&self) {
        let mut inner = self.inner.lock().await;
        *inner = None;
    }

    async fn disconnect_on_error<T>(
        &self,
        r: Result<T, NodeClientError>,
    ) -> Result<T, NodeClientError> {
        if let Err(e) = &r {
            if e.is_connection_error() {
                debug!("dropping LND connection to {}: {e}", self.config.url);
                self.inner_disconnect().await;
            }
        }
        r
    }
}

#[async_trait]
impl NodeRpcClient for LndGrpcNodeClient {
    type Error = NodeClientError;

    async fn get_pub_key(&self) -> Result<NodeIdentity, Self::Error> {
        let inner = self.inner_connect().await?;

        let r = timeout(self.timeout, inner.get_pub_key())
            .await
            .unwrap_or_else(|_| {
                Err(NodeClientError::from_timeout_error(format!(
                    "LND get pubkey from {}, requesting node info",
                    self.config.url
                )))
            });

        self.disconnect_on_error(r).await
    }

    async fn route_hints(&self) -> Result<Vec<RouteHint>, Self::Error> {
        let inner = self.inner_connect().await?;

        let r = timeout(self.timeout, inner.route_hints())
            .await
            .unwrap_or_else(|_| {
                Err(NodeClientError::from_timeout_error(format!(
                    "LND route hints from {}, reading channels",
                    self.config.url
                )))
            });

        self.disconnect_on_error(r).await
    }

    async fn send_payment(
        &self,
        request: NodePaymentRequest,
    ) -> Result<NodePaymentResult, Self::Error> {
        let inner = self.inner_connect().await?;

        // the node gives up after request.timeout; allow it a round trip to say so
        let deadline = request.timeout + self.timeout;
        let r = timeout(deadline, inner.send_payment(&request))
            .await
            .unwrap_or_else(|_| {
                Err(NodeClientError::from_timeout_error(format!(
                    "LND send payment via {}, awaiting payment {}",
                    self.config.url, request.payment_hash
                )))
            });

        self.disconnect_on_error(r).await
    }

    async fn listen_htlcs(&self) -> Result<NodeHtlcStream, Self::Error> {
        let inner = self.inner_connect().await?;

        let r = timeout(self.timeout, inner.listen_htlcs())
            .await
            .unwrap_or_else(|_| {
                Err(NodeClientError::from_timeout_error(format!(
                    "LND htlc interceptor on {}, opening stream",
                    self.config.url
                )))
            });

        self.disconnect_on_error(r).await
    }
}

struct InnerLndGrpcClient {
    client: Client,
    config: LndGrpcNodeConfig,
}

impl InnerLndGrpcClient {
    async fn connect(
        timeout_d: Duration,
        config: LndGrpcNodeConfig,
        url: Url,
    ) -> Result<Self, NodeClientError> {
        let LndGrpcClientAuth::Path(auth) = config.auth.clone();

        let client = timeout(
            timeout_d,
            connect(
                url.as_str().to_string(),
                &auth.tls_cert_path,
                &auth.macaroon_path,
            ),
        )
        .await
        .map_err(|_| NodeClientError::from_timeout_error(format!("connecting LND client to {url}")))?
        .map_err(|e| {
            NodeClientError::from_lnd_connect_error(e, format!("connecting LND client to {url}"))
        })?;

        info!("connected LND client to {url}");

        Ok(Self { client, config })
    }

    async fn get_pub_key(&self) -> Result<NodeIdentity, NodeClientError> {
        let response = self
            .client
            .clone()
            .lightning()
            .get_info(GetInfoRequest {})
            .await
            .map_err(|e| {
                NodeClientError::from_lnd_tonic_error(
                    e,
                    format!(
                        "LND get pubkey from {}, requesting node info",
                        self.config.url
                    ),
                )
            })?
            .into_inner();

        NodeIdentity::from_str(&response.identity_pubkey).map_err(|e| {
            NodeClientError::from_invalid_response(
                format!("identity pubkey '{}': {e}", response.identity_pubkey),
                format!("LND get pubkey from {}, parsing node info", self.config.url),
            )
        })
    }

    async fn route_hints(&self) -> Result<Vec<RouteHint>, NodeClientError> {
        let mut client = self.client.clone();
        let lightning = client.lightning();

        let channels = lightning
            .list_channels(ListChannelsRequest {
                active_only: true,
                ..Default::default()
            })
            .await
            .map_err(|e| {
                NodeClientError::from_lnd_tonic_error(
                    e,
                    format!("LND route hints from {}, listing channels", self.config.url),
                )
            })?
            .into_inner()
            .channels;

        let mut hints = Vec::with_capacity(channels.len());
        for channel in channels {
            let context = || {
                format!(
                    "LND route hints from {}, reading channel {}",
                    self.config.url, channel.chan_id
                )
            };

            let edge = match lightning
                .get_chan_info(ChanInfoRequest {
                    chan_id: channel.chan_id,
                    ..Default::default()
                })
                .await
            {
                Ok(edge) => edge.into_inner(),
                Err(e) if e.code() == tonic::Code::NotFound => {
                    debug!(
                        "LND {} channel {} not in graph, no route hint",
                        self.config.url, channel.chan_id
                    );
                    continue;
                }
                Err(e) => return Err(NodeClientError::from_lnd_tonic_error(e, context())),
            };

            match route_hint(&channel.remote_pubkey, channel.chan_id, &edge)
                .map_err(|e| NodeClientError::from_invalid_response(e, context()))?
            {
                Some(hint) => hints.push(hint),
                None => debug!(
                    "LND {} channel {} has no usable remote policy, no route hint",
                    self.config.url, channel.chan_id
                ),
            }
        }

        Ok(hints)
    }

    async fn send_payment(
        &self,
        request: &NodePaymentRequest,
    ) -> Result<NodePaymentResult, NodeClientError> {
        let context = || {
            format!(
                "LND send payment via {}, paying {}",
                self.config.url, request.payment_hash
            )
        };

        let mut stream = self
            .client
            .clone()
            .router()
            .send_payment_v2(send_payment_request(request))
            .await
            .map_err(|e| NodeClientError::from_lnd_tonic_error(e, context()))?
            .into_inner();

        while let Some(payment) = stream
            .message()
            .await
            .map_err(|e| NodeClientError::from_lnd_tonic_error(e, context()))?
        {
            if let Some(result) = payment_result(&payment)
                .map_err(|e| NodeClientError::from_invalid_response(e, context()))?
            {
                return Ok(result);
            }
        }

        Err(NodeClientError::from_unavailable(
            "payment stream ended without a final status".to_string(),
            context(),
        ))
    }

    async fn listen_htlcs(&self) -> Result<NodeHtlcStream, NodeClientError> {
        let (response_tx, response_rx) = mpsc::channel(INTERCEPT_BUFFER);

        let mut intercepted = self
            .client
            .clone()
            .router()
            .htlc_interceptor(ReceiverStream::new(response_rx))
            .await
            .map_err(|e| {
                NodeClientError::from_lnd_tonic_error(
                    e,
                    format!(
                        "LND htlc interceptor on {}, opening stream",
                        self.config.url
                    ),
                )
            })?
            .into_inner();

        let (notification_tx, notification_rx) = mpsc::channel(INTERCEPT_BUFFER);
        let (resolution_tx, mut resolution_rx) = mpsc::unbounded_channel::<NodeHtlcResolution>();
        let url = self.config.url.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = intercepted.message() => match message {
                        Ok(Some(request)) => match raw_htlc(request) {
                            Some(htlc) => {
                                if notification_tx.send(htlc).await.is_err() {
                                    break;
                                }
                            }
                            None => warn!("LND {url} intercepted htlc without circuit key, ignoring"),
                        },
                        Ok(None) => {
                            info!("LND {url} htlc interceptor stream closed");
                            break;
                        }
                        Err(e) => {
                            warn!("LND {url} htlc interceptor stream failed: {e}");
                            break;
                        }
                    },
                    resolution = resolution_rx.recv() => match resolution {
                        Some(resolution) => {
                            if response_tx.send(intercept_response(resolution)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        Ok(NodeHtlcStream {
            notifications: notification_rx,
            resolutions: resolution_tx,
        })
    }
}

/// Single hop hint over `chan_id` using the policy `remote_pubkey` applies
/// towards us. `None` when that policy is unknown or disabled.
fn route_hint(
    remote_pubkey: &str,
    chan_id: u64,
    edge: &ChannelEdge,
) -> Result<Option<RouteHint>, String> {
    let policy = if edge.node1_pub == remote_pubkey {
        edge.node1_policy.as_ref()
    } else if edge.node2_pub == remote_pubkey {
        edge.node2_policy.as_ref()
    } else {
        return Err(format!(
            "channel {chan_id} edge does not include remote node {remote_pubkey}"
        ));
    };
    let policy = match policy {
        Some(policy) if !policy.disabled => policy,
        _ => return Ok(None),
    };

    let src_node_id = NodeIdentity::from_str(remote_pubkey)
        .map_err(|e| format!("remote pubkey '{remote_pubkey}': {e}"))?;
    let base_msat = u32::try_from(policy.fee_base_msat)
        .map_err(|_| format!("channel {chan_id} base fee {}", policy.fee_base_msat))?;
    let proportional_millionths = u32::try_from(policy.fee_rate_milli_msat)
        .map_err(|_| format!("channel {chan_id} fee rate {}", policy.fee_rate_milli_msat))?;

    Ok(Some(RouteHint {
        hops: vec![RouteHintHop {
            src_node_id,
            short_channel_id: chan_id,
            base_msat,
            proportional_millionths,
            cltv_expiry_delta: policy.time_lock_delta,
            htlc_minimum_msat: u64::try_from(policy.min_htlc).ok(),
            htlc_maximum_msat: (policy.max_htlc_msat > 0).then_some(policy.max_htlc_msat),
        }],
    }))
}

fn send_payment_request(request: &NodePaymentRequest) -> SendPaymentRequest {
    SendPaymentRequest {
        payment_request: request.invoice.clone(),
        fee_limit_msat: i64::try_from(request.fee_limit_msat).unwrap_or(i64::MAX),
        cltv_limit: i32::try_from(request.max_delay).unwrap_or(i32::MAX),
        timeout_seconds: i32::try_from(request.timeout.as_secs().max(1)).unwrap_or(i32::MAX),
        no_inflight_updates: true,
        ..Default::default()
    }
}

/// `None` while the payment is still in flight.
fn payment_result(payment: &Payment) -> Result<Option<NodePaymentResult>, String> {
    if payment.status == PaymentStatus::Succeeded as i32 {
        let preimage = Preimage::from_str(&payment.payment_preimage)
            .map_err(|e| format!("payment preimage '{}': {e}", payment.payment_preimage))?;
        Ok(Some(NodePaymentResult::Succeeded {
            preimage,
            fee_msat: u64::try_from(payment.fee_msat).unwrap_or_default(),
        }))
    } else if payment.status == PaymentStatus::Failed as i32 {
        Ok(Some(NodePaymentResult::Failed(payment_failure(
            payment.failure_reason,
        ))))
    } else {
        Ok(None)
    }
}

fn payment_failure(reason: i32) -> NodePaymentFailure {
    if reason == PaymentFailureReason::FailureReasonNoRoute as i32 {
        NodePaymentFailure::NoRoute
    } else if reason == PaymentFailureReason::FailureReasonTimeout as i32 {
        NodePaymentFailure::Timeout
    } else if reason == PaymentFailureReason::FailureReasonInsufficientBalance as i32 {
        NodePaymentFailure::InsufficientBalance
    } else if reason == PaymentFailureReason::FailureReasonIncorrectPaymentDetails as i32 {
        NodePaymentFailure::IncorrectPaymentDetails
    } else {
        NodePaymentFailure::Other
    }
}

fn raw_htlc(request: ForwardHtlcInterceptRequest) -> Option<RawHtlc> {
    let circuit = request.incoming_circuit_key?;
    Some(RawHtlc {
        payment_hash: request.payment_hash,
        incoming_circuit: CircuitKey {
            chan_id: circuit.chan_id,
            htlc_id: circuit.htlc_id,
        },
        incoming_amount_msat: request.incoming_amount_msat,
        outgoing_amount_msat: request.outgoing_amount_msat,
        short_channel_id: request.outgoing_requested_chan_id,
        incoming_expiry: request.incoming_expiry,
    })
}

fn intercept_response(resolution: NodeHtlcResolution) -> ForwardHtlcInterceptResponse {
    let incoming_circuit_key = Some(LndCircuitKey {
        chan_id: resolution.circuit.chan_id,
        htlc_id: resolution.circuit.htlc_id,
    });
    match resolution.action {
        NodeHtlcAction::Settle(preimage) => ForwardHtlcInterceptResponse {
            incoming_circuit_key,
            action: ResolveHoldForwardAction::Settle as i32,
            preimage: preimage.as_bytes().to_vec(),
            ..Default::default()
        },
        NodeHtlcAction::Fail => ForwardHtlcInterceptResponse {
            incoming_circuit_key,
            action: ResolveHoldForwardAction::Fail as i32,
            ..Default::default()
        },
    }
}
