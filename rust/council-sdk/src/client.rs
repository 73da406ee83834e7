use crate::cache::{Fetcher, QueryCache, QueryResult};
use crate::config::QueryOptions;
use crate::error::QueryError;
use crate::filter::{FilterValue, Filters, IntoFilterValue, NormalizedFilters};
use crate::key::CacheKey;
use crate::mutation::Operation;
use crate::registry::{ResourceDescriptor, ResourceRegistry};
use crate::response::{decode_detail, decode_list, unwrap_envelope};
use crate::subscription::QuerySubscription;
use crate::transport::{ApiRequest, Transport};
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Entry point of the query layer.
///
/// Resolves resource names through the registry, reads through the shared
/// [`QueryCache`] and sends requests through the [`Transport`]. Cloning is
/// cheap and every clone shares the same cache.
#[derive(Clone)]
pub struct QueryClient {
    transport: Arc<dyn Transport>,
    cache: QueryCache,
    registry: Arc<ResourceRegistry>,
}

impl QueryClient {
    pub fn new(transport: Arc<dyn Transport>, registry: ResourceRegistry) -> Self {
        Self {
            transport,
            cache: QueryCache::new(),
            registry: Arc::new(registry),
        }
    }

    pub fn with_cache(mut self, cache: QueryCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn resource(&self, resource_name: impl Into<String>) -> ResourceHandle {
        ResourceHandle {
            client: self.clone(),
            resource_name: resource_name.into(),
        }
    }

    /// Reads the list of `resource_name` matching `filters`.
    ///
    /// Absent and empty filter values never reach the wire, and logically
    /// equal filter sets share one cache entry and one in-flight request.
    pub async fn list<T: DeserializeOwned>(
        &self,
        resource_name: &str,
        filters: &Filters,
        options: QueryOptions,
    ) -> QueryResult<Vec<T>> {
        self.list_raw(resource_name, filters, options)
            .await
            .try_map(decode_list)
    }

    pub async fn list_raw(
        &self,
        resource_name: &str,
        filters: &Filters,
        options: QueryOptions,
    ) -> QueryResult<Value> {
        match self.list_query(resource_name, filters) {
            Ok((key, fetcher)) => self.cache.fetch(key, fetcher, options).await,
            Err(err) => QueryResult::failed(&err),
        }
    }

    /// Reads one record. A falsy `id` (`0`, `false`, `""`, `None`) disables
    /// the query: no request is sent and an idle result is returned.
    ///
    /// An absent record (`404` or a `null` payload) is `data: Some(None)`.
    pub async fn get_by_id<T: DeserializeOwned>(
        &self,
        resource_name: &str,
        id: impl IntoFilterValue,
        options: QueryOptions,
    ) -> QueryResult<Option<T>> {
        self.get_by_id_raw(resource_name, id, options)
            .await
            .try_map(decode_detail)
    }

    pub async fn get_by_id_raw(
        &self,
        resource_name: &str,
        id: impl IntoFilterValue,
        options: QueryOptions,
    ) -> QueryResult<Value> {
        match self.detail_query(resource_name, id) {
            Ok(Some((key, fetcher))) => self.cache.fetch(key, fetcher, options).await,
            Ok(None) => QueryResult::idle(),
            Err(err) => QueryResult::failed(&err),
        }
    }

    /// Sends one create/update/delete request. On success every cached
    /// query of the resource is invalidated; on failure the cache is left
    /// as it was.
    pub async fn mutate(
        &self,
        resource_name: &str,
        operation: Operation,
        payload: Value,
    ) -> Result<Value, QueryError> {
        let descriptor = self.descriptor(resource_name)?;
        if !descriptor.mutable {
            return Err(QueryError::ReadOnly(resource_name.to_string()));
        }

        let request = ApiRequest::new(operation.method(), descriptor.mutation_path(operation))
            .with_body(payload);
        let response = self.transport.execute(request).await.map_err(|e| {
            tracing::warn!(resource = resource_name, %operation, error = %e, "mutation failed");
            e
        })?;

        tracing::info!(resource = resource_name, %operation, "mutation succeeded");
        self.cache.invalidate_resource(resource_name).await;
        Ok(unwrap_envelope(response))
    }

    /// Marks every cached query of `resource_name` stale.
    pub async fn invalidate(&self, resource_name: &str) -> usize {
        self.cache.invalidate_resource(resource_name).await
    }

    /// Fetches a list even if it is fresh or already in flight.
    pub async fn refetch_list(
        &self,
        resource_name: &str,
        filters: &Filters,
        options: QueryOptions,
    ) -> QueryResult<Value> {
        match self.list_query(resource_name, filters) {
            Ok((key, fetcher)) => self.cache.refetch(key, fetcher, options).await,
            Err(err) => QueryResult::failed(&err),
        }
    }

    pub async fn refetch_detail(
        &self,
        resource_name: &str,
        id: impl IntoFilterValue,
        options: QueryOptions,
    ) -> QueryResult<Value> {
        match self.detail_query(resource_name, id) {
            Ok(Some((key, fetcher))) => self.cache.refetch(key, fetcher, options).await,
            Ok(None) => QueryResult::idle(),
            Err(err) => QueryResult::failed(&err),
        }
    }

    /// Subscribes to a list query and starts loading it in the background.
    pub async fn subscribe_list(
        &self,
        resource_name: &str,
        filters: &Filters,
        options: QueryOptions,
    ) -> Result<QuerySubscription, QueryError> {
        let (key, fetcher) = self.list_query(resource_name, filters)?;
        Ok(self.subscribe_and_load(key, fetcher, options).await)
    }

    /// Subscribes to a detail query. `None` when the id is falsy.
    pub async fn subscribe_detail(
        &self,
        resource_name: &str,
        id: impl IntoFilterValue,
        options: QueryOptions,
    ) -> Result<Option<QuerySubscription>, QueryError> {
        match self.detail_query(resource_name, id)? {
            Some((key, fetcher)) => Ok(Some(self.subscribe_and_load(key, fetcher, options).await)),
            None => Ok(None),
        }
    }

    /// Call when the application regains focus.
    pub async fn focus(&self) -> usize {
        self.cache.focus().await
    }

    async fn subscribe_and_load(
        &self,
        key: CacheKey,
        fetcher: Fetcher,
        options: QueryOptions,
    ) -> QuerySubscription {
        let subscription = self.cache.subscribe(key.clone()).await;
        if options.enabled {
            let cache = self.cache.clone();
            tokio::spawn(async move {
                cache.fetch(key, fetcher, options).await;
            });
        }
        subscription
    }

    fn descriptor(&self, resource_name: &str) -> Result<Arc<ResourceDescriptor>, QueryError> {
        self.registry
            .get(resource_name)
            .ok_or_else(|| QueryError::UnknownResource(resource_name.to_string()))
    }

    fn list_query(
        &self,
        resource_name: &str,
        filters: &Filters,
    ) -> Result<(CacheKey, Fetcher), QueryError> {
        let descriptor = self.descriptor(resource_name)?;
        let filters = filters.normalize();
        let fetcher = list_fetcher(Arc::clone(&self.transport), &descriptor, &filters);
        Ok((CacheKey::list(resource_name, filters), fetcher))
    }

    fn detail_query(
        &self,
        resource_name: &str,
        id: impl IntoFilterValue,
    ) -> Result<Option<(CacheKey, Fetcher)>, QueryError> {
        let descriptor = self.descriptor(resource_name)?;
        let Some(id) = id.into_filter_value().filter(|id| !id.is_falsy()) else {
            tracing::debug!(resource = resource_name, "no id; detail query disabled");
            return Ok(None);
        };
        let fetcher = detail_fetcher(Arc::clone(&self.transport), &descriptor, &id);
        Ok(Some((CacheKey::detail(resource_name, &id), fetcher)))
    }
}

fn list_fetcher(
    transport: Arc<dyn Transport>,
    descriptor: &ResourceDescriptor,
    filters: &NormalizedFilters,
) -> Fetcher {
    let request =
        ApiRequest::get(descriptor.list_path.clone()).with_query(filters.to_query_pairs());
    Arc::new(move || {
        let transport = Arc::clone(&transport);
        let request = request.clone();
        async move { transport.execute(request).await.map(unwrap_envelope) }.boxed()
    })
}

fn detail_fetcher(
    transport: Arc<dyn Transport>,
    descriptor: &ResourceDescriptor,
    id: &FilterValue,
) -> Fetcher {
    let request = ApiRequest::get(descriptor.detail_path.clone())
        .with_query(vec![(descriptor.id_param_name.clone(), id.to_string())]);
    Arc::new(move || {
        let transport = Arc::clone(&transport);
        let request = request.clone();
        async move {
            match transport.execute(request).await {
                Ok(body) => Ok(unwrap_envelope(body)),
                Err(err) if err.is_not_found() => Ok(Value::Null),
                Err(err) => Err(err),
            }
        }
        .boxed()
    })
}

/// A [`QueryClient`] bound to one resource name.
#[derive(Clone)]
pub struct ResourceHandle {
    client: QueryClient,
    resource_name: String,
}

impl ResourceHandle {
    pub fn name(&self) -> &str {
        &self.resource_name
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        filters: &Filters,
        options: QueryOptions,
    ) -> QueryResult<Vec<T>> {
        self.client.list(&self.resource_name, filters, options).await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        id: impl IntoFilterValue,
        options: QueryOptions,
    ) -> QueryResult<Option<T>> {
        self.client.get_by_id(&self.resource_name, id, options).await
    }

    pub async fn create(&self, payload: Value) -> Result<Value, QueryError> {
        self.client
            .mutate(&self.resource_name, Operation::Create, payload)
            .await
    }

    pub async fn update(&self, payload: Value) -> Result<Value, QueryError> {
        self.client
            .mutate(&self.resource_name, Operation::Update, payload)
            .await
    }

    pub async fn delete(&self, payload: Value) -> Result<Value, QueryError> {
        self.client
            .mutate(&self.resource_name, Operation::Delete, payload)
            .await
    }

    pub async fn invalidate(&self) -> usize {
        self.client.invalidate(&self.resource_name).await
    }
}
