use crate::common::invoice::{invoice, signed_invoice};
use crate::common::node::{identity, memory_node};
use htlcgate_components::forward::forwarder::PaymentForwarder;
use htlcgate_components::node::memory::{MemoryNode, MemoryRoute};
use htlcgate_service_api::payment::{PaymentRequest, Preimage};
use htlcgate_service_api::service::{AdapterErrorKind, HasAdapterErrorKind};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn forwarder(node: &MemoryNode) -> PaymentForwarder<MemoryNode> {
    PaymentForwarder::new(Arc::new(node.clone()), Duration::from_secs(5))
}

fn request(invoice: String, max_delay: u64, max_fee_percent: f64) -> PaymentRequest {
    PaymentRequest {
        invoice,
        max_delay,
        max_fee_percent,
    }
}

#[tokio::test]
async fn test_pay_when_route_within_bounds_then_preimage_returned() {
    let node = memory_node(10_000, 10, 40).await;
    let preimage = Preimage([11u8; 32]);
    node.add_payee_preimage(preimage).await;

    let outcome = forwarder(&node)
        .pay(request(invoice(&preimage, 3000), 60, 1.0))
        .await
        .unwrap();

    assert_eq!(outcome.preimage, preimage);
    assert_eq!(outcome.fee_msat, 10);
    assert_eq!(node.balance_msat().await, 10_000 - 3010);
    assert_eq!(node.paid().await, vec![(preimage.payment_hash(), 3010)]);
}

#[tokio::test]
async fn test_pay_when_zero_fee_budget_then_route_not_found() {
    let node = memory_node(10_000, 10, 40).await;
    let preimage = Preimage([11u8; 32]);
    node.add_payee_preimage(preimage).await;

    let e = forwarder(&node)
        .pay(request(invoice(&preimage, 3000), 60, 0.0))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::RouteNotFound);
    assert_eq!(node.balance_msat().await, 10_000);
}

#[tokio::test]
async fn test_pay_when_timelock_too_long_then_route_not_found() {
    let node = memory_node(10_000, 10, 40).await;
    let preimage = Preimage([11u8; 32]);
    node.add_payee_preimage(preimage).await;

    let e = forwarder(&node)
        .pay(request(invoice(&preimage, 3000), 30, 1.0))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::RouteNotFound);
}

#[tokio::test]
async fn test_pay_when_cheaper_route_fits_then_cheaper_route_used() {
    let node = memory_node(10_000, 50, 40).await;
    node.add_route(MemoryRoute {
        fee_msat: 5,
        cltv_delta: 80,
        latency: Duration::ZERO,
    })
    .await;
    let preimage = Preimage([11u8; 32]);
    node.add_payee_preimage(preimage).await;

    let outcome = forwarder(&node)
        .pay(request(invoice(&preimage, 3000), 100, 0.1))
        .await
        .unwrap();

    assert_eq!(outcome.fee_msat, 5);
}

#[tokio::test]
async fn test_pay_when_payment_slow_then_route_not_found() {
    let node = MemoryNode::new(identity(), 10_000);
    node.add_route(MemoryRoute {
        fee_msat: 0,
        cltv_delta: 40,
        latency: Duration::from_secs(10),
    })
    .await;
    let preimage = Preimage([11u8; 32]);
    node.add_payee_preimage(preimage).await;
    let forwarder = PaymentForwarder::new(Arc::new(node.clone()), Duration::from_millis(100));

    let e = forwarder
        .pay(request(invoice(&preimage, 3000), 60, 1.0))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::RouteNotFound);
}

#[tokio::test]
async fn test_pay_when_node_never_answers_then_payment_pending() {
    let node = memory_node(10_000, 10, 40).await;
    let preimage = Preimage([11u8; 32]);
    node.add_payee_preimage(preimage).await;
    node.set_stalled(true);
    let forwarder = PaymentForwarder::new(Arc::new(node.clone()), Duration::from_millis(50))
        .with_response_grace(Duration::from_millis(50));

    let e = forwarder
        .pay(request(invoice(&preimage, 3000), 60, 1.0))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::PaymentPending);
    assert_ne!(e.get_adapter_error_kind(), AdapterErrorKind::PaymentFailed);
}

#[tokio::test]
async fn test_pay_when_payee_unknown_then_payment_failed() {
    let node = memory_node(10_000, 10, 40).await;
    let preimage = Preimage([11u8; 32]);

    let e = forwarder(&node)
        .pay(request(invoice(&preimage, 3000), 60, 1.0))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::PaymentFailed);
}

#[tokio::test]
async fn test_pay_when_node_down_then_node_unavailable() {
    let node = memory_node(10_000, 10, 40).await;
    let preimage = Preimage([11u8; 32]);
    node.add_payee_preimage(preimage).await;
    node.set_available(false);

    let e = forwarder(&node)
        .pay(request(invoice(&preimage, 3000), 60, 1.0))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::NodeUnavailable);
}

#[tokio::test]
async fn test_pay_when_invoice_malformed_then_invalid_invoice() {
    let node = memory_node(10_000, 10, 40).await;

    let e = forwarder(&node)
        .pay(request("lnbcnotaninvoice".to_string(), 60, 1.0))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::InvalidInvoice);
}

#[tokio::test]
async fn test_pay_when_invoice_expired_then_invalid_invoice() {
    let node = memory_node(10_000, 10, 40).await;
    let preimage = Preimage([11u8; 32]);
    node.add_payee_preimage(preimage).await;
    let expired = signed_invoice(&preimage, Some(3000), SystemTime::UNIX_EPOCH);

    let e = forwarder(&node)
        .pay(request(expired, 60, 1.0))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::InvalidInvoice);
    assert_eq!(node.balance_msat().await, 10_000);
}

#[tokio::test]
async fn test_pay_when_invoice_has_no_amount_then_invalid_invoice() {
    let node = memory_node(10_000, 10, 40).await;
    let preimage = Preimage([11u8; 32]);
    let open_amount = signed_invoice(&preimage, None, SystemTime::now());

    let e = forwarder(&node)
        .pay(request(open_amount, 60, 1.0))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::InvalidInvoice);
}

#[tokio::test]
async fn test_pay_when_fee_percent_negative_then_invalid_invoice() {
    let node = memory_node(10_000, 10, 40).await;
    let preimage = Preimage([11u8; 32]);

    let e = forwarder(&node)
        .pay(request(invoice(&preimage, 3000), 60, -0.5))
        .await
        .unwrap_err();

    assert_eq!(e.get_adapter_error_kind(), AdapterErrorKind::InvalidInvoice);
}
