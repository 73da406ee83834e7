//! # council-sdk
//!
//! Cache-backed query layer for the committee administration REST backend.
//!
//! Every backend resource is described once in a [`ResourceRegistry`] and
//! read through a [`QueryClient`], which deduplicates concurrent requests,
//! reuses fresh results and invalidates a resource's cached queries after a
//! successful mutation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use council_sdk::prelude::*;
//!
//! let credentials = Arc::new(MemoryCredentials::with_token(token));
//! let transport = HttpTransport::new(TransportConfig::new("https://council.example.org"), credentials)?;
//! let client = QueryClient::new(Arc::new(transport), ResourceRegistry::dashboard("api"));
//!
//! let filters = Filters::new().with("DepartmentId", 3).with("Search", None::<String>);
//! let committees = client.list::<Committee>("committees", &filters, QueryOptions::new()).await;
//!
//! client.mutate("committees", Operation::Create, json!({"name": "Audit"})).await?;
//! ```

mod cache;
mod client;
mod config;
mod credentials;
mod error;
mod filter;
mod key;
mod mutation;
pub mod prelude;
mod registry;
mod response;
mod subscription;
mod transport;

pub use cache::{Fetcher, QueryCache, QueryResult};
pub use client::{QueryClient, ResourceHandle};
pub use config::{
    CacheConfig, QueryOptions, TransportConfig, DEFAULT_LOGIN_ROUTE, DEFAULT_MAX_ENTRIES,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_STALE_TIME,
};
pub use credentials::{CredentialStore, MemoryCredentials};
pub use error::{ErrorShape, QueryError, RegistryError};
pub use filter::{FilterValue, Filters, IntoFilterValue, NormalizedFilters};
pub use key::CacheKey;
pub use mutation::Operation;
pub use registry::{ResourceDescriptor, ResourceRegistry, DEFAULT_ID_PARAM, DEFAULT_SERVICE};
pub use response::{decode_detail, decode_list, normalize_field_names, to_camel_case, unwrap_envelope};
pub use subscription::QuerySubscription;
pub use transport::{ApiRequest, HttpTransport, Method, SessionExpiredHook, Transport};

pub use serde_json::Value;
