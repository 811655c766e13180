use htlcgate_service_api::service::{
    Code, HasAdapterErrorKind, HasServiceErrorSource, ServiceErrorSource,
};
use log::{error, warn};
use thiserror::Error;
use tonic::Status;

#[macro_export]
macro_rules! gateway_error_from_service {
    ($error:expr) => {
        $crate::gateway::error::GatewayServiceError::from_service_error(
            module_path!(),
            &format!("{}:{}", file!(), line!()),
            $error,
        )
    };
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code:?}: {message}")]
pub struct GatewayServiceError {
    code: Code,
    message: String,
}

impl GatewayServiceError {
    pub fn invalid_argument<E>(error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self {
            code: Code::InvalidArgument,
            message: error.to_string(),
        }
    }

    /// Node and internal failures are logged in full and reach the caller
    /// only as their error kind.
    pub fn from_service_error<E>(service: &str, location: &str, error: E) -> Self
    where
        E: HasServiceErrorSource + HasAdapterErrorKind + std::fmt::Display,
    {
        let kind = error.get_adapter_error_kind();
        let message = match error.get_service_error_source() {
            ServiceErrorSource::Downstream => {
                warn!(target: service, "{error} at: {location}");
                error.to_string()
            }
            ServiceErrorSource::Upstream | ServiceErrorSource::Internal => {
                error!(target: service, "{error} at: {location}");
                kind.to_string()
            }
        };

        Self {
            code: kind.to_grpc_code(),
            message,
        }
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<GatewayServiceError> for Status {
    fn from(error: GatewayServiceError) -> Self {
        Status::new(error.code, error.message)
    }
}
