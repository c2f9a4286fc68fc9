// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for Pocket federation
//!
//! Source adapters report `ExecutorError`; the engine wraps those into
//! `FederationError` together with the id of the failing source.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a single source's executor.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ExecutorError {
    #[error("Source call failed: {message}")]
    Failed { message: String },

    #[error("Source call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Collection not found: {collection}")]
    CollectionNotFound { collection: String },
}

impl ExecutorError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed { message: msg.into() }
    }

    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound {
            collection: name.into(),
        }
    }
}

/// Unified error type for all federation operations
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum FederationError {
    #[error("Source not found: {source_id}")]
    SourceNotFound { source_id: String },

    #[error("Source already registered: {source_id}")]
    DuplicateSource { source_id: String },

    #[error("Source '{source_id}' failed: {message}")]
    SourceExecution { source_id: String, message: String },

    #[error("Invalid federated query: {message}")]
    InvalidQuery { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FederationError {
    pub fn source_not_found(id: impl Into<String>) -> Self {
        Self::SourceNotFound {
            source_id: id.into(),
        }
    }

    pub fn duplicate_source(id: impl Into<String>) -> Self {
        Self::DuplicateSource {
            source_id: id.into(),
        }
    }

    pub fn source_execution(id: impl Into<String>, err: &ExecutorError) -> Self {
        Self::SourceExecution {
            source_id: id.into(),
            message: err.to_string(),
        }
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery { message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config { message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }
}

/// Result type alias for executor calls
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Result type alias for federation operations
pub type FederationResult<T> = Result<T, FederationError>;
