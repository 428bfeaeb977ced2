// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Engine Error Types
//!
//! Every engine operation returns `Result<T, EngineError>`. Each variant maps to
//! exactly one [`Status`] code, and the codes are listed in validation
//! precedence order: a call that violates several gates reports the earliest.
//!
//! ## Status Codes
//!
//! - **NullParameter**: a required argument slot was absent
//! - **BadParameter**: structurally invalid argument (wrong length, unknown handle)
//! - **InvalidParameter**: data-dependent mismatch found while processing
//! - **BadKeyType**: resolved key has the wrong type or size for the algorithm
//! - **OperationNotAllowed**: rights window, usage flag or caller scope rejected the call
//! - **OperationNotSupported**: algorithm/mode combination not implemented
//! - **VerificationFailed**: authentication tag or padding check failed
//! - **InvalidState**: session already finalized
//! - **ResourceExhausted**: key registry is full
//! - **InternalError**: provider failure outside the contract
//!
//! ## Usage Example
//!
//! ```rust
//! use keyguard_engine::error::{EngineError, Status};
//!
//! let err = EngineError::BadParameter("iv length 13, expected 12".to_string());
//! assert_eq!(err.status(), Status::BadParameter);
//! ```

use std::fmt;
use thiserror::Error;

/// Discrete result code carried by every [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    NullParameter,
    BadParameter,
    InvalidParameter,
    BadKeyType,
    OperationNotAllowed,
    OperationNotSupported,
    VerificationFailed,
    InvalidState,
    ResourceExhausted,
    InternalError,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::NullParameter => "NULL_PARAMETER",
            Status::BadParameter => "BAD_PARAMETER",
            Status::InvalidParameter => "INVALID_PARAMETER",
            Status::BadKeyType => "BAD_KEY_TYPE",
            Status::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            Status::OperationNotSupported => "OPERATION_NOT_SUPPORTED",
            Status::VerificationFailed => "VERIFICATION_FAILED",
            Status::InvalidState => "INVALID_STATE",
            Status::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Status::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(name)
    }
}

/// Error type for all engine operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A required argument was absent. Carries the argument name.
    #[error("Null parameter: {0}")]
    NullParameter(&'static str),

    /// Structurally invalid argument, including unknown or released handles
    #[error("Bad parameter: {0}")]
    BadParameter(String),

    /// Data-dependent mismatch discovered once processing begins
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Key type or size does not fit the requested algorithm
    #[error("Bad key type: {0}")]
    BadKeyType(String),

    /// Rights evaluation rejected the call
    #[error("Operation not allowed: {0}")]
    OperationNotAllowed(String),

    /// Algorithm/mode combination not implemented by the provider
    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    /// Authentication tag or padding verification failed
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Session was driven after finalization
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Registry is full
    #[error("Key registry exhausted: capacity {capacity} reached")]
    ResourceExhausted {
        /// Configured maximum number of live keys
        capacity: usize,
    },

    /// Provider failure that is not part of the status contract
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Status code for this error
    pub fn status(&self) -> Status {
        match self {
            EngineError::NullParameter(_) => Status::NullParameter,
            EngineError::BadParameter(_) => Status::BadParameter,
            EngineError::InvalidParameter(_) => Status::InvalidParameter,
            EngineError::BadKeyType(_) => Status::BadKeyType,
            EngineError::OperationNotAllowed(_) => Status::OperationNotAllowed,
            EngineError::OperationNotSupported(_) => Status::OperationNotSupported,
            EngineError::VerificationFailed(_) => Status::VerificationFailed,
            EngineError::InvalidState(_) => Status::InvalidState,
            EngineError::ResourceExhausted { .. } => Status::ResourceExhausted,
            EngineError::Internal(_) => Status::InternalError,
        }
    }
}

/// Result alias used across the engine
pub type EngineResult<T> = Result<T, EngineError>;

// Conversion from rights evaluation failures
impl From<crate::rights::AuthorizationError> for EngineError {
    fn from(err: crate::rights::AuthorizationError) -> Self {
        EngineError::OperationNotAllowed(err.to_string())
    }
}

// Conversion from crypto provider failures
impl From<crate::provider::ProviderError> for EngineError {
    fn from(err: crate::provider::ProviderError) -> Self {
        use crate::provider::ProviderError;
        match err {
            ProviderError::AuthenticationFailed { .. } => {
                EngineError::VerificationFailed(err.to_string())
            }
            ProviderError::Unsupported(reason) => EngineError::OperationNotSupported(reason),
            ProviderError::Failure(reason) => EngineError::Internal(reason),
        }
    }
}
