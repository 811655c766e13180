use crate::gateway::error::GatewayServiceError;
use crate::gateway::state::GatewayState;
use crate::gateway_lnrpc::complete_htlc_request::Action;
use crate::gateway_lnrpc::get_route_hints_response::{
    RouteHint as WireRouteHint, RouteHintHop as WireRouteHintHop,
};
use crate::gateway_lnrpc::gateway_lightning_server::{GatewayLightning, GatewayLightningServer};
use crate::gateway_lnrpc::{
    CompleteHtlcRequest, CompleteHtlcResponse, GetPubKeyRequest, GetPubKeyResponse,
    GetRouteHintsRequest, GetRouteHintsResponse,
    HtlcOutcome as WireHtlcOutcome, PayInvoiceRequest, PayInvoiceResponse,
    SubscribeInterceptHtlcsRequest, SubscribeInterceptHtlcsResponse,
};
use futures_util::{Stream, StreamExt};
use htlcgate_service_api::intercept::{
    HtlcDecision, HtlcOutcome, HtlcResolver, InterceptedHtlc, SubscriptionScope,
};
use htlcgate_service_api::node::{NodeRpcClient, RouteHint};
use htlcgate_service_api::payment::{PaymentHash, PaymentRequest, Preimage};
use log::{debug, info};
use std::pin::Pin;
use tonic::{Request, Response, Status};

const AMOUNT_UNITS: &str = "msat";

pub type InterceptHtlcStream =
    Pin<Box<dyn Stream<Item = Result<SubscribeInterceptHtlcsResponse, Status>> + Send + 'static>>;

pub struct GatewayLightningService<N> {
    state: GatewayState<N>,
}

impl<N> GatewayLightningService<N>
where
    N: NodeRpcClient + Send + Sync + 'static,
{
    pub fn new(state: GatewayState<N>) -> Self {
        Self { state }
    }

    pub fn server(state: GatewayState<N>) -> GatewayLightningServer<Self> {
        GatewayLightningServer::new(Self::new(state))
    }
}

#[tonic::async_trait]
impl<N> GatewayLightning for GatewayLightningService<N>
where
    N: NodeRpcClient + Send + Sync + 'static,
{
    async fn get_pub_key(
        &self,
        _request: Request<GetPubKeyRequest>,
    ) -> Result<Response<GetPubKeyResponse>, Status> {
        let identity = self
            .state
            .node()
            .get_pub_key()
            .await
            .map_err(|e| crate::gateway_error_from_service!(e))?;

        Ok(Response::new(GetPubKeyResponse {
            pub_key: identity.to_bytes().to_vec(),
        }))
    }

    async fn get_route_hints(
        &self,
        _request: Request<GetRouteHintsRequest>,
    ) -> Result<Response<GetRouteHintsResponse>, Status> {
        let hints = self
            .state
            .node()
            .route_hints()
            .await
            .map_err(|e| crate::gateway_error_from_service!(e))?;

        debug!("gateway serving {} route hints", hints.len());

        Ok(Response::new(GetRouteHintsResponse {
            route_hints: hints.into_iter().map(wire_route_hint).collect(),
        }))
    }

    async fn pay_invoice(
        &self,
        request: Request<PayInvoiceRequest>,
    ) -> Result<Response<PayInvoiceResponse>, Status> {
        let request = request.into_inner();

        let outcome = self
            .state
            .forwarder()
            .pay(PaymentRequest {
                invoice: request.invoice,
                max_delay: request.max_delay,
                max_fee_percent: request.max_fee_percent,
            })
            .await
            .map_err(|e| crate::gateway_error_from_service!(e))?;

        Ok(Response::new(PayInvoiceResponse {
            preimage: outcome.preimage.as_bytes().to_vec(),
        }))
    }

    type SubscribeInterceptHtlcsStream = InterceptHtlcStream;

    async fn subscribe_intercept_htlcs(
        &self,
        request: Request<SubscribeInterceptHtlcsRequest>,
    ) -> Result<Response<Self::SubscribeInterceptHtlcsStream>, Status> {
        let scope = SubscriptionScope::from_short_channel_id(request.into_inner().short_channel_id);

        let subscription = self
            .state
            .registry()
            .subscribe(scope)
            .map_err(|e| crate::gateway_error_from_service!(e))?;

        info!(
            "gateway subscription {} streaming htlcs for {scope}",
            subscription.id()
        );

        // dropped by tonic when the caller goes away, which unsubscribes
        let stream = subscription.map(|item| match item {
            Ok(htlc) => Ok(intercept_event(htlc)),
            Err(e) => Err(Status::from(crate::gateway_error_from_service!(e))),
        });

        Ok(Response::new(Box::pin(stream)))
    }

    async fn complete_htlc(
        &self,
        request: Request<CompleteHtlcRequest>,
    ) -> Result<Response<CompleteHtlcResponse>, Status> {
        let request = request.into_inner();

        let payment_hash = PaymentHash::from_slice(&request.payment_hash)
            .map_err(|e| GatewayServiceError::invalid_argument(format!("payment hash: {e}")))?;

        let decision = match request.action {
            Some(Action::Settle(settle)) => HtlcDecision::Settle {
                preimage: Preimage::from_slice(&settle.preimage)
                    .map_err(|e| GatewayServiceError::invalid_argument(format!("preimage: {e}")))?,
            },
            Some(Action::Cancel(cancel)) => HtlcDecision::Fail {
                reason: cancel.reason,
            },
            None => {
                return Err(GatewayServiceError::invalid_argument("missing settle or cancel").into())
            }
        };

        debug!("gateway decision for htlc {payment_hash}: {decision:?}");

        let outcome = HtlcResolver::resolve(self.state.registry(), &payment_hash, decision)
            .map_err(|e| crate::gateway_error_from_service!(e))?;

        Ok(Response::new(CompleteHtlcResponse {
            outcome: wire_outcome(outcome) as i32,
        }))
    }
}

fn intercept_event(htlc: InterceptedHtlc) -> SubscribeInterceptHtlcsResponse {
    SubscribeInterceptHtlcsResponse {
        payment_hash: htlc.payment_hash.as_bytes().to_vec(),
        amount: htlc.amount_msat,
        units: AMOUNT_UNITS.to_string(),
        expiry: htlc.expiry,
        short_channel_id: htlc.short_channel_id,
        incoming_chan_id: htlc.incoming_chan_id,
        htlc_id: htlc.htlc_id,
        subscription_id: htlc.subscription_id.0,
    }
}

fn wire_route_hint(hint: RouteHint) -> WireRouteHint {
    WireRouteHint {
        hops: hint
            .hops
            .into_iter()
            .map(|hop| WireRouteHintHop {
                src_node_id: hop.src_node_id.to_bytes().to_vec(),
                short_channel_id: hop.short_channel_id,
                base_msat: hop.base_msat,
                proportional_millionths: hop.proportional_millionths,
                cltv_expiry_delta: hop.cltv_expiry_delta,
                htlc_minimum_msat: hop.htlc_minimum_msat,
                htlc_maximum_msat: hop.htlc_maximum_msat,
            })
            .collect(),
    }
}

fn wire_outcome(outcome: HtlcOutcome) -> WireHtlcOutcome {
    match outcome {
        HtlcOutcome::Settled => WireHtlcOutcome::Settled,
        HtlcOutcome::Failed => WireHtlcOutcome::Failed,
        HtlcOutcome::Expired => WireHtlcOutcome::Expired,
    }
}
