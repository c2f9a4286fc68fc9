// SPDX-License-Identifier: Apache-2.0

//! Pocket federation core
//!
//! Types shared by the federation engine and by source adapters: the
//! document model, filters, the executor capability and the error taxonomy.

pub mod document;
pub mod error;
pub mod filter;
pub mod memory;
pub mod traits;

pub use document::Document;
pub use error::{ExecutorError, ExecutorResult, FederationError, FederationResult};
pub use filter::Filter;
pub use memory::MemorySource;
pub use traits::QueryExecutor;
