//! Entity graph error types

use crate::api::ApiError;
use crate::bus::BusError;
use crate::sync::GatewayError;

/// Error type for synchronizer operations
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// An entity expected to exist is missing, a consistency violation
    MissingEntity { kind: &'static str, id: String },
    /// A topic arrived with a payload variant its handler cannot use
    UnexpectedPayload { topic: String },
    /// The remote API failed without a recovery path
    Api(ApiError),
    /// The synchronized storage gateway failed
    Gateway(GatewayError),
    /// A bus interaction failed
    Bus(BusError),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::MissingEntity { kind, id } => {
                write!(f, "Expected {} {} has vanished", kind, id)
            }
            GraphError::UnexpectedPayload { topic } => {
                write!(f, "Unusable payload on topic {}", topic)
            }
            GraphError::Api(error) => write!(f, "{}", error),
            GraphError::Gateway(error) => write!(f, "{}", error),
            GraphError::Bus(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for GraphError {}

impl From<ApiError> for GraphError {
    fn from(error: ApiError) -> Self {
        GraphError::Api(error)
    }
}

impl From<GatewayError> for GraphError {
    fn from(error: GatewayError) -> Self {
        GraphError::Gateway(error)
    }
}

impl From<BusError> for GraphError {
    fn from(error: BusError) -> Self {
        GraphError::Bus(error)
    }
}
