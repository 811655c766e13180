use crate::forward::error::PaymentForwardError;
use htlcgate_service_api::node::{NodePaymentRequest, NodePaymentResult, NodeRpcClient};
use htlcgate_service_api::payment::{PaymentHash, PaymentOutcome, PaymentRequest};
use lightning_invoice::Bolt11Invoice;
use log::{info, warn};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Extra time the node gets past the payment timeout to report the outcome.
pub const PAYMENT_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Pays BOLT11 invoices through the node, one attempt per call, inside the
/// caller's fee and timelock bounds.
///
/// A payment the node has not finished by `timeout` plus the response grace
/// is reported as pending, never as failed.
pub struct PaymentForwarder<N> {
    node: Arc<N>,
    timeout: Duration,
    response_grace: Duration,
}

impl<N> Clone for PaymentForwarder<N> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            timeout: self.timeout,
            response_grace: self.response_grace,
        }
    }
}

impl<N> PaymentForwarder<N>
where
    N: NodeRpcClient + Send + Sync + 'static,
{
    pub fn new(node: Arc<N>, timeout: Duration) -> Self {
        Self {
            node,
            timeout,
            response_grace: PAYMENT_TIMEOUT_GRACE,
        }
    }

    /// Time past `timeout` to keep waiting on the node. Must cover the node
    /// client's own deadline so its final answer is not cut off.
    pub fn with_response_grace(mut self, response_grace: Duration) -> Self {
        self.response_grace = response_grace;
        self
    }

    pub async fn pay(&self, request: PaymentRequest) -> Result<PaymentOutcome, PaymentForwardError> {
        let node_request = self.node_request(&request)?;
        let payment_hash = node_request.payment_hash;
        let context = format!("paying invoice {payment_hash}");

        info!(
            "paying {payment_hash}: {} msat, fee limit {} msat, max delay {}",
            node_request.amount_msat, node_request.fee_limit_msat, node_request.max_delay
        );

        let deadline = self.timeout + self.response_grace;
        let result = tokio::time::timeout(deadline, self.node.send_payment(node_request))
            .await
            .map_err(|_| {
                warn!("payment {payment_hash} still in flight after {deadline:?}");
                PaymentForwardError::from_timeout(deadline, context.clone())
            })?
            .map_err(|e| PaymentForwardError::from_node_error(e, context.clone()))?;

        match result {
            NodePaymentResult::Succeeded { preimage, fee_msat } => {
                if preimage.payment_hash() != payment_hash {
                    return Err(PaymentForwardError::from_preimage_mismatch(context));
                }
                info!("paid {payment_hash}, fee {fee_msat} msat");
                Ok(PaymentOutcome { preimage, fee_msat })
            }
            NodePaymentResult::Failed(failure) => {
                warn!("payment {payment_hash} failed: {failure}");
                Err(PaymentForwardError::from_node_failure(failure, context))
            }
        }
    }

    fn node_request(&self, request: &PaymentRequest) -> Result<NodePaymentRequest, PaymentForwardError> {
        const CONTEXT: &str = "validating payment request";

        let invoice = Bolt11Invoice::from_str(request.invoice.trim())
            .map_err(|e| PaymentForwardError::from_invalid_invoice(e.to_string(), CONTEXT))?;

        if invoice.is_expired() {
            return Err(PaymentForwardError::from_invalid_invoice(
                "invoice expired".to_string(),
                CONTEXT,
            ));
        }

        let amount_msat = match invoice.amount_milli_satoshis() {
            None | Some(0) => {
                return Err(PaymentForwardError::from_invalid_invoice(
                    "invoice carries no amount".to_string(),
                    CONTEXT,
                ))
            }
            Some(amount_msat) => amount_msat,
        };

        if !request.max_fee_percent.is_finite() || request.max_fee_percent < 0.0 {
            return Err(PaymentForwardError::from_invalid_invoice(
                format!("max fee percent {} out of range", request.max_fee_percent),
                CONTEXT,
            ));
        }

        let payment_hash = PaymentHash::from_str(&invoice.payment_hash().to_string())
            .map_err(|e| PaymentForwardError::from_invalid_invoice(e.to_string(), CONTEXT))?;

        Ok(NodePaymentRequest {
            invoice: request.invoice.trim().to_string(),
            payment_hash,
            amount_msat,
            fee_limit_msat: fee_limit_msat(amount_msat, request.max_fee_percent),
            max_delay: request.max_delay,
            timeout: self.timeout,
        })
    }
}

fn fee_limit_msat(amount_msat: u64, max_fee_percent: f64) -> u64 {
    (amount_msat as f64 * max_fee_percent).floor() as u64
}
