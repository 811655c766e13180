use crate::node::lnd::grpc::client::tonic;
use htlcgate_service_api::service::{
    AdapterErrorKind, HasAdapterErrorKind, HasServiceErrorSource, ServiceErrorSource,
};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeClientErrorSourceKind {
    #[error("LND tonic gRPC error: {0}")]
    LndTonicError(tonic::Status),
    #[error("LND connection error: {0}")]
    LndConnectError(fedimint_tonic_lnd::ConnectError),
    #[error("invalid node response: {0}")]
    InvalidResponse(String),
    #[error("node unavailable: {0}")]
    Unavailable(String),
    #[error("operation timed out")]
    Timeout,
}

#[derive(Error, Debug)]
pub struct NodeClientError {
    context: Cow<'static, str>,
    #[source]
    source: NodeClientErrorSourceKind,
    esource: ServiceErrorSource,
}

impl Display for NodeClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NodeClientError: while {}: {}",
            self.context.as_ref(),
            self.source
        )
    }
}

impl NodeClientError {
    pub fn new<C: Into<Cow<'static, str>>>(
        source: NodeClientErrorSourceKind,
        esource: ServiceErrorSource,
        context: C,
    ) -> Self {
        Self {
            context: context.into(),
            source,
            esource,
        }
    }

    pub fn from_lnd_tonic_error<C: Into<Cow<'static, str>>>(
        source: tonic::Status,
        context: C,
    ) -> Self {
        let esource = Self::from_lnd_tonic_code(source.code());
        Self::new(
            NodeClientErrorSourceKind::LndTonicError(source),
            esource,
            context,
        )
    }

    pub fn from_lnd_connect_error<C: Into<Cow<'static, str>>>(
        source: fedimint_tonic_lnd::ConnectError,
        context: C,
    ) -> Self {
        Self::new(
            NodeClientErrorSourceKind::LndConnectError(source),
            ServiceErrorSource::Upstream,
            context,
        )
    }

    pub fn from_invalid_response<C: Into<Cow<'static, str>>>(source: String, context: C) -> Self {
        Self::new(
            NodeClientErrorSourceKind::InvalidResponse(source),
            ServiceErrorSource::Upstream,
            context,
        )
    }

    pub fn from_unavailable<C: Into<Cow<'static, str>>>(source: String, context: C) -> Self {
        Self::new(
            NodeClientErrorSourceKind::Unavailable(source),
            ServiceErrorSource::Upstream,
            context,
        )
    }

    pub fn from_timeout_error<C: Into<Cow<'static, str>>>(context: C) -> Self {
        Self::new(
            NodeClientErrorSourceKind::Timeout,
            ServiceErrorSource::Upstream,
            context,
        )
    }

    pub fn context(&self) -> &str {
        self.context.as_ref()
    }

    pub fn source(&self) -> &NodeClientErrorSourceKind {
        &self.source
    }

    pub fn esource(&self) -> ServiceErrorSource {
        self.esource
    }

    /// Whether the connection that produced this error should be dropped.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.get_adapter_error_kind(),
            AdapterErrorKind::NodeUnavailable
        )
    }

    pub fn from_lnd_tonic_code(code: tonic::Code) -> ServiceErrorSource {
        match code {
            tonic::Code::OutOfRange | tonic::Code::AlreadyExists => ServiceErrorSource::Downstream,
            _ => ServiceErrorSource::Upstream,
        }
    }
}

impl HasServiceErrorSource for NodeClientError {
    fn get_service_error_source(&self) -> ServiceErrorSource {
        self.esource
    }
}

impl HasAdapterErrorKind for NodeClientError {
    fn get_adapter_error_kind(&self) -> AdapterErrorKind {
        match &self.source {
            NodeClientErrorSourceKind::LndTonicError(status) => match status.code() {
                tonic::Code::Unavailable
                | tonic::Code::DeadlineExceeded
                | tonic::Code::Cancelled
                | tonic::Code::Unknown
                | tonic::Code::Unauthenticated
                | tonic::Code::PermissionDenied => AdapterErrorKind::NodeUnavailable,
                _ => AdapterErrorKind::PaymentFailed,
            },
            NodeClientErrorSourceKind::LndConnectError(_)
            | NodeClientErrorSourceKind::Unavailable(_)
            | NodeClientErrorSourceKind::Timeout => AdapterErrorKind::NodeUnavailable,
            NodeClientErrorSourceKind::InvalidResponse(_) => AdapterErrorKind::Internal,
        }
    }
}
