use htlcgate_service_api::node::NodePaymentFailure;
use htlcgate_service_api::service::{
    AdapterErrorKind, HasAdapterErrorKind, HasServiceErrorSource, ServiceErrorSource,
};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentForwardErrorSourceKind {
    #[error("invalid invoice: {0}")]
    InvalidInvoice(String),
    #[error("payment failed on node: {0}")]
    NodeFailure(NodePaymentFailure),
    #[error("node error: {0}")]
    NodeError(Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("payment still in flight after {0:?}")]
    Timeout(Duration),
    #[error("node returned a preimage that does not match the invoice")]
    PreimageMismatch,
}

#[derive(Error, Debug)]
pub struct PaymentForwardError {
    context: Cow<'static, str>,
    #[source]
    source: PaymentForwardErrorSourceKind,
    esource: ServiceErrorSource,
    kind: AdapterErrorKind,
}

impl Display for PaymentForwardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PaymentForwardError: while {}: {}",
            self.context.as_ref(),
            self.source
        )
    }
}

impl PaymentForwardError {
    pub fn from_invalid_invoice<C: Into<Cow<'static, str>>>(source: String, context: C) -> Self {
        Self {
            context: context.into(),
            source: PaymentForwardErrorSourceKind::InvalidInvoice(source),
            esource: ServiceErrorSource::Downstream,
            kind: AdapterErrorKind::InvalidInvoice,
        }
    }

    pub fn from_node_failure<C: Into<Cow<'static, str>>>(
        failure: NodePaymentFailure,
        context: C,
    ) -> Self {
        let kind = match failure {
            NodePaymentFailure::NoRoute | NodePaymentFailure::Timeout => {
                AdapterErrorKind::RouteNotFound
            }
            _ => AdapterErrorKind::PaymentFailed,
        };
        Self {
            context: context.into(),
            source: PaymentForwardErrorSourceKind::NodeFailure(failure),
            esource: ServiceErrorSource::Downstream,
            kind,
        }
    }

    pub fn from_node_error<E, C>(error: E, context: C) -> Self
    where
        E: std::error::Error + HasAdapterErrorKind + Send + Sync + 'static,
        C: Into<Cow<'static, str>>,
    {
        Self {
            context: context.into(),
            kind: error.get_adapter_error_kind(),
            source: PaymentForwardErrorSourceKind::NodeError(Box::new(error)),
            esource: ServiceErrorSource::Upstream,
        }
    }

    pub fn from_timeout<C: Into<Cow<'static, str>>>(after: Duration, context: C) -> Self {
        Self {
            context: context.into(),
            source: PaymentForwardErrorSourceKind::Timeout(after),
            esource: ServiceErrorSource::Upstream,
            kind: AdapterErrorKind::PaymentPending,
        }
    }

    pub fn from_preimage_mismatch<C: Into<Cow<'static, str>>>(context: C) -> Self {
        Self {
            context: context.into(),
            source: PaymentForwardErrorSourceKind::PreimageMismatch,
            esource: ServiceErrorSource::Upstream,
            kind: AdapterErrorKind::PaymentFailed,
        }
    }

    pub fn context(&self) -> &str {
        self.context.as_ref()
    }

    pub fn source(&self) -> &PaymentForwardErrorSourceKind {
        &self.source
    }

    pub fn esource(&self) -> ServiceErrorSource {
        self.esource
    }
}

impl HasServiceErrorSource for PaymentForwardError {
    fn get_service_error_source(&self) -> ServiceErrorSource {
        self.esource
    }
}

impl HasAdapterErrorKind for PaymentForwardError {
    fn get_adapter_error_kind(&self) -> AdapterErrorKind {
        self.kind
    }
}
