//! Synchronized storage error types

use crate::bus::BusError;

/// Error type for flat-list decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The raw item is not a JSON array
    NotAnArray,
    /// The array has an odd number of elements
    DanglingId(String),
    /// A resource id slot does not hold a string
    InvalidId(String),
    /// An enabled-flag slot holds neither a number nor a boolean
    InvalidFlag(String),
    /// The raw bytes are not valid JSON
    InvalidJson(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::NotAnArray => write!(f, "Resource list is not an array"),
            CodecError::DanglingId(id) => {
                write!(f, "Resource id has no enabled flag: {}", id)
            }
            CodecError::InvalidId(value) => write!(f, "Resource id is not a string: {}", value),
            CodecError::InvalidFlag(value) => write!(f, "Invalid enabled flag: {}", value),
            CodecError::InvalidJson(detail) => write!(f, "Resource list is not JSON: {}", detail),
        }
    }
}

impl std::error::Error for CodecError {}

/// Error type for external synchronized store operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store reported a failure
    Backend(String),
    /// A single item would exceed the per-item byte quota
    QuotaExceeded { key: String, bytes: u64 },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Backend(detail) => write!(f, "Synchronized store error: {}", detail),
            StoreError::QuotaExceeded { key, bytes } => {
                write!(f, "Item {} would use {} bytes, over the per-item quota", key, bytes)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Error type for gateway operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    Store(StoreError),
    Codec(CodecError),
    Bus(BusError),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Store(error) => write!(f, "{}", error),
            GatewayError::Codec(error) => write!(f, "{}", error),
            GatewayError::Bus(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<StoreError> for GatewayError {
    fn from(error: StoreError) -> Self {
        GatewayError::Store(error)
    }
}

impl From<CodecError> for GatewayError {
    fn from(error: CodecError) -> Self {
        GatewayError::Codec(error)
    }
}

impl From<BusError> for GatewayError {
    fn from(error: BusError) -> Self {
        GatewayError::Bus(error)
    }
}
