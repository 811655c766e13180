use std::error::Error;
use std::fmt;
pub use tonic::Code;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorSource {
    Upstream,
    Downstream,
    Internal,
}

impl fmt::Display for ServiceErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErrorSource::Upstream => write!(f, "Upstream"),
            ServiceErrorSource::Downstream => write!(f, "Downstream"),
            ServiceErrorSource::Internal => write!(f, "Internal"),
        }
    }
}

impl Error for ServiceErrorSource {}

pub trait HasServiceErrorSource {
    fn get_service_error_source(&self) -> ServiceErrorSource;
}

/// Caller visible failure kinds of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterErrorKind {
    /// The lightning node could not be reached.
    NodeUnavailable,
    /// Malformed, amountless or expired invoice, or bad payment bounds.
    InvalidInvoice,
    /// No route within the caller's fee and delay bounds.
    RouteNotFound,
    /// The node attempted the payment and it failed for good.
    PaymentFailed,
    /// The node gave no final answer in time. The payment may still settle,
    /// so it must not be treated as failed.
    PaymentPending,
    /// A decision was already recorded for the HTLC.
    AlreadyResolved,
    /// The node HTLC stream dropped; subscribers must resubscribe.
    ConnectionLost,
    /// The subscriber went away.
    SubscriptionClosed,
    /// A decision names a payment hash that was never intercepted.
    UnknownHtlc,
    /// A settle decision carries a preimage that does not hash to the payment hash.
    InvalidPreimage,
    Internal,
}

impl fmt::Display for AdapterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdapterErrorKind::NodeUnavailable => "node unavailable",
            AdapterErrorKind::InvalidInvoice => "invalid invoice",
            AdapterErrorKind::RouteNotFound => "route not found",
            AdapterErrorKind::PaymentFailed => "payment failed",
            AdapterErrorKind::PaymentPending => "payment outcome unknown",
            AdapterErrorKind::AlreadyResolved => "htlc already resolved",
            AdapterErrorKind::ConnectionLost => "node connection lost",
            AdapterErrorKind::SubscriptionClosed => "subscription closed",
            AdapterErrorKind::UnknownHtlc => "unknown htlc",
            AdapterErrorKind::InvalidPreimage => "invalid preimage",
            AdapterErrorKind::Internal => "internal server error",
        };
        write!(f, "{s}")
    }
}

impl AdapterErrorKind {
    pub fn to_grpc_code(&self) -> Code {
        match self {
            AdapterErrorKind::NodeUnavailable => Code::Unavailable,
            AdapterErrorKind::InvalidInvoice => Code::InvalidArgument,
            AdapterErrorKind::RouteNotFound => Code::NotFound,
            AdapterErrorKind::PaymentFailed => Code::Aborted,
            AdapterErrorKind::PaymentPending => Code::DeadlineExceeded,
            AdapterErrorKind::AlreadyResolved => Code::AlreadyExists,
            AdapterErrorKind::ConnectionLost => Code::Unavailable,
            AdapterErrorKind::SubscriptionClosed => Code::Cancelled,
            AdapterErrorKind::UnknownHtlc => Code::NotFound,
            AdapterErrorKind::InvalidPreimage => Code::InvalidArgument,
            AdapterErrorKind::Internal => Code::Internal,
        }
    }
}

pub trait HasAdapterErrorKind {
    fn get_adapter_error_kind(&self) -> AdapterErrorKind;
}
