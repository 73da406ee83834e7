//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use council_sdk::prelude::*;
//!
//! let rooms = client.list::<Room>("rooms", &Filters::new().with("Active", true), QueryOptions::new()).await;
//! ```

pub use crate::{
    CacheConfig, CredentialStore, ErrorShape, Filters, HttpTransport, MemoryCredentials, Operation,
    QueryCache, QueryClient, QueryError, QueryOptions, QueryResult, QuerySubscription,
    ResourceDescriptor, ResourceRegistry, Transport, TransportConfig,
};

pub use futures_util::StreamExt;
pub use serde_json::json;
pub use std::sync::Arc;
