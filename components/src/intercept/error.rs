use htlcgate_service_api::intercept::{HtlcOutcome, SubscriptionId};
use htlcgate_service_api::payment::PaymentHash;
use htlcgate_service_api::service::{
    AdapterErrorKind, HasAdapterErrorKind, HasServiceErrorSource, ServiceErrorSource,
};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterceptErrorSourceKind {
    #[error("htlc {0} was never intercepted")]
    UnknownHtlc(PaymentHash),
    #[error("htlc {0} already {1}")]
    AlreadyResolved(PaymentHash, HtlcOutcome),
    #[error("preimage does not hash to {0}")]
    PreimageMismatch(PaymentHash),
    #[error("node htlc stream closed")]
    ConnectionLost,
    #[error("subscription {0} closed")]
    SubscriptionClosed(SubscriptionId),
    #[error("memory error: {0}")]
    MemoryError(String),
}

#[derive(Error, Debug, Clone)]
pub struct InterceptError {
    context: Cow<'static, str>,
    #[source]
    source: InterceptErrorSourceKind,
    esource: ServiceErrorSource,
}

impl Display for InterceptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "InterceptError: while {}: {}",
            self.context.as_ref(),
            self.source
        )
    }
}

impl InterceptError {
    fn new<C: Into<Cow<'static, str>>>(
        source: InterceptErrorSourceKind,
        esource: ServiceErrorSource,
        context: C,
    ) -> Self {
        Self {
            context: context.into(),
            source,
            esource,
        }
    }

    pub fn unknown_htlc<C: Into<Cow<'static, str>>>(payment_hash: PaymentHash, context: C) -> Self {
        Self::new(
            InterceptErrorSourceKind::UnknownHtlc(payment_hash),
            ServiceErrorSource::Downstream,
            context,
        )
    }

    pub fn already_resolved<C: Into<Cow<'static, str>>>(
        payment_hash: PaymentHash,
        outcome: HtlcOutcome,
        context: C,
    ) -> Self {
        Self::new(
            InterceptErrorSourceKind::AlreadyResolved(payment_hash, outcome),
            ServiceErrorSource::Downstream,
            context,
        )
    }

    pub fn preimage_mismatch<C: Into<Cow<'static, str>>>(
        payment_hash: PaymentHash,
        context: C,
    ) -> Self {
        Self::new(
            InterceptErrorSourceKind::PreimageMismatch(payment_hash),
            ServiceErrorSource::Downstream,
            context,
        )
    }

    pub fn connection_lost<C: Into<Cow<'static, str>>>(context: C) -> Self {
        Self::new(
            InterceptErrorSourceKind::ConnectionLost,
            ServiceErrorSource::Upstream,
            context,
        )
    }

    pub fn subscription_closed<C: Into<Cow<'static, str>>>(
        subscription_id: SubscriptionId,
        context: C,
    ) -> Self {
        Self::new(
            InterceptErrorSourceKind::SubscriptionClosed(subscription_id),
            ServiceErrorSource::Internal,
            context,
        )
    }

    pub fn from_memory_error<C: Into<Cow<'static, str>>>(source: String, context: C) -> Self {
        Self::new(
            InterceptErrorSourceKind::MemoryError(source),
            ServiceErrorSource::Internal,
            context,
        )
    }

    pub fn context(&self) -> &str {
        self.context.as_ref()
    }

    pub fn source(&self) -> &InterceptErrorSourceKind {
        &self.source
    }

    pub fn esource(&self) -> ServiceErrorSource {
        self.esource
    }
}

impl HasServiceErrorSource for InterceptError {
    fn get_service_error_source(&self) -> ServiceErrorSource {
        self.esource
    }
}

impl HasAdapterErrorKind for InterceptError {
    fn get_adapter_error_kind(&self) -> AdapterErrorKind {
        match self.source {
            InterceptErrorSourceKind::UnknownHtlc(_) => AdapterErrorKind::UnknownHtlc,
            InterceptErrorSourceKind::AlreadyResolved(_, _) => AdapterErrorKind::AlreadyResolved,
            InterceptErrorSourceKind::PreimageMismatch(_) => AdapterErrorKind::InvalidPreimage,
            InterceptErrorSourceKind::ConnectionLost => AdapterErrorKind::ConnectionLost,
            InterceptErrorSourceKind::SubscriptionClosed(_) => AdapterErrorKind::SubscriptionClosed,
            InterceptErrorSourceKind::MemoryError(_) => AdapterErrorKind::Internal,
        }
    }
}
