//! In-memory transport that records every request

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Duration;

use crate::client::transport::Transport;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: String,
    pub query: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Handler = Box<dyn Fn(&RecordedCall) -> Result<Value> + Send + Sync>;

pub struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    handler: Handler,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&RecordedCall) -> Result<Value> + Send + Sync + 'static) -> Self {
        MockTransport {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Most requests that were outstanding at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        _timeout: Duration,
    ) -> Result<Value> {
        let call = RecordedCall {
            endpoint: endpoint.to_string(),
            query: query.to_vec(),
        };
        self.calls.lock().unwrap().push(call.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        // Let sibling requests in the same group start before this one settles
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.handler)(&call)
    }
}
