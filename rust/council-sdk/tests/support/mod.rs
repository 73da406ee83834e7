#![allow(dead_code)]

use async_trait::async_trait;
use council_sdk::{ApiRequest, QueryError, Transport, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};

type Handler = Box<dyn Fn(&ApiRequest) -> Result<Value, QueryError> + Send + Sync>;

/// Answers every request immediately from a closure and records it.
pub struct ScriptedTransport {
    requests: Mutex<Vec<ApiRequest>>,
    handler: Handler,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value, QueryError> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;
        (self.handler)(&request)
    }
}

/// Holds every request open until the test resolves it by index.
pub struct GatedTransport {
    requests: Mutex<Vec<ApiRequest>>,
    gates: Mutex<Vec<Option<oneshot::Sender<Result<Value, QueryError>>>>>,
    arrived: watch::Sender<usize>,
}

impl GatedTransport {
    pub fn new() -> Arc<Self> {
        let (arrived, _) = watch::channel(0);
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            gates: Mutex::new(Vec::new()),
            arrived,
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub async fn wait_for_requests(&self, count: usize) {
        let mut rx = self.arrived.subscribe();
        rx.wait_for(|arrived| *arrived >= count)
            .await
            .expect("transport dropped");
    }

    pub fn resolve(&self, index: usize, outcome: Result<Value, QueryError>) {
        let gate = self.gates.lock().unwrap()[index]
            .take()
            .expect("request already resolved");
        let _ = gate.send(outcome);
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value, QueryError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            self.gates.lock().unwrap().push(Some(tx));
            self.arrived.send_replace(requests.len());
        }
        rx.await
            .unwrap_or_else(|_| Err(QueryError::Network("gate dropped".to_string())))
    }
}

pub fn http_error(status_code: u16, message: &str) -> QueryError {
    QueryError::Http {
        status_code,
        message: message.to_string(),
    }
}
