//! Concurrent, windowed history retrieval across the key pool
use futures_util::future::join_all;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Duration;

use crate::client::keys::KeyPool;
use crate::client::retry::{credential_query, RetryPolicy};
use crate::client::transport::Transport;
use crate::config::Credentials;
use crate::error::{AmbientError, ErrorKind, Result};
use crate::models::{BatchRequest, BatchRequestResult, ProgressInfo, Timestamped};
use crate::utils::{format_datetime, iso_from_millis};

// Stations report every 5 minutes; one page holds at most a day of samples
pub const DATA_INTERVAL_MS: i64 = 5 * 60 * 1000;
pub const BATCH_LIMIT: usize = 288;

pub type ProgressCallback<'a> = dyn Fn(ProgressInfo) + Send + Sync + 'a;

pub struct BatchFetchOptions<'a> {
    pub mac_address: &'a str,
    pub start_ts: i64,
    pub end_ts: i64,
    pub limit: usize,
    pub timeout: Duration,
    pub policy: RetryPolicy,
    pub on_progress: Option<&'a ProgressCallback<'a>>,
}

impl fmt::Debug for BatchFetchOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchFetchOptions")
            .field("mac_address", &self.mac_address)
            .field("start_ts", &self.start_ts)
            .field("end_ts", &self.end_ts)
            .field("limit", &self.limit)
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// A window that used up its retries
#[derive(Debug)]
pub struct FailedBatch {
    pub request: BatchRequest,
    pub error: AmbientError,
    pub retries: u32,
}

#[derive(Debug)]
pub struct BatchFetchOutcome<T> {
    /// Merged samples, unique by timestamp, ascending
    pub data: Vec<T>,
    pub total_batches: usize,
    pub failed: Vec<FailedBatch>,
}

/// Plan the pages needed to cover `[start_ts, end_ts]`, newest first
///
/// The expected sample count is `ceil(range / interval)`, capped at `limit`.
/// Each page ends where the previous one began and takes the next key pair
/// in rotation.
pub fn plan_batches(pool: &KeyPool, start_ts: i64, end_ts: i64, limit: usize) -> Vec<BatchRequest> {
    let range = end_ts.saturating_sub(start_ts);
    let estimated_points = if range <= 0 {
        0
    } else {
        ((range - 1) / DATA_INTERVAL_MS + 1) as usize
    };
    let total_needed = estimated_points.min(limit);
    let batch_count = total_needed.div_ceil(BATCH_LIMIT);

    let mut rotation = pool.rotation();
    let mut cursor = end_ts;
    let mut batches = Vec::with_capacity(batch_count);

    for batch_index in 0..batch_count {
        let limit = BATCH_LIMIT.min(total_needed - batch_index * BATCH_LIMIT);
        batches.push(BatchRequest {
            key_pair: rotation.next_pair().clone(),
            end_date: cursor,
            limit,
            batch_index,
        });
        cursor -= limit as i64 * DATA_INTERVAL_MS;
    }

    batches
}

/// Decode a page row by row, skipping rows that do not match the schema
fn decode_rows<T: DeserializeOwned>(value: Value) -> Result<Vec<T>> {
    let rows = match value {
        Value::Array(rows) => rows,
        _ => {
            return Err(AmbientError::new(
                ErrorKind::InvalidResponseFormat,
                "Invalid response format from API",
            ))
        }
    };

    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping undecodable history row: {}", e);
                None
            }
        })
        .collect();
    if decoded.len() < total {
        warn!("Kept {} of {} rows in page", decoded.len(), total);
    }
    Ok(decoded)
}

async fn execute_batch_with_retry<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: BatchRequest,
    endpoint: &str,
    timeout: Duration,
    policy: &RetryPolicy,
) -> BatchRequestResult<Vec<T>> {
    let query = iso_from_millis(request.end_date).map(|end_date| {
        credential_query(
            &[
                ("endDate".to_string(), end_date),
                ("limit".to_string(), request.limit.to_string()),
            ],
            &request.key_pair,
        )
    });

    let (result, retries) = match query {
        Ok(query) => {
            let attempted = policy
                .run(|_| transport.get(endpoint, &query, timeout))
                .await;
            (attempted.result.and_then(decode_rows::<T>), attempted.retries)
        }
        Err(e) => (Err(e), 0),
    };

    BatchRequestResult {
        request,
        result,
        retries,
    }
}

/// Keep samples inside `[start_ts, end_ts]`, first occurrence of each
/// timestamp only, sorted ascending
pub fn merge_batches<T: Timestamped>(
    pages: impl IntoIterator<Item = Vec<T>>,
    start_ts: i64,
    end_ts: i64,
) -> Vec<T> {
    let mut seen_timestamps = HashSet::new();
    let mut merged: Vec<T> = pages
        .into_iter()
        .flatten()
        .filter(|item| {
            let ts = item.timestamp_ms();
            ts >= start_ts && ts <= end_ts && seen_timestamps.insert(ts)
        })
        .collect();
    merged.sort_by_key(|item| item.timestamp_ms());
    merged
}

/// Fetch `[start_ts, end_ts]` for one device in key-pool-wide groups
///
/// Requests inside a group run concurrently and each retries on its own;
/// the next group starts only once the current one has settled. A window
/// that fails is recorded in the outcome and does not fail the call.
pub async fn concurrent_batch_fetch<T>(
    transport: &dyn Transport,
    credentials: &Credentials,
    options: BatchFetchOptions<'_>,
) -> Result<BatchFetchOutcome<T>>
where
    T: DeserializeOwned + Timestamped,
{
    let pool = KeyPool::from_credentials(credentials)?;
    let batches = plan_batches(&pool, options.start_ts, options.end_ts, options.limit);
    let total = batches.len();
    let width = pool.width();

    info!(
        "Fetching history for {} in {} batches across {} key pairs",
        options.mac_address, total, width
    );

    let endpoint = format!("/devices/{}", options.mac_address);
    let endpoint = endpoint.as_str();
    let policy = &options.policy;
    let timeout = options.timeout;
    let on_progress = options.on_progress;
    let completed = AtomicUsize::new(0);
    let completed = &completed;

    let mut settled: Vec<BatchRequestResult<Vec<T>>> = Vec::with_capacity(total);
    for group in batches.chunks(width) {
        let group_results = join_all(group.iter().cloned().map(|request| async move {
            let result =
                execute_batch_with_retry::<T>(transport, request, endpoint, timeout, policy).await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(
                "Batch {} settled ({}/{}), success: {}",
                result.request.batch_index,
                done,
                total,
                result.success()
            );
            if let Some(callback) = on_progress {
                callback(ProgressInfo::new(done, total));
            }
            result
        }))
        .await;
        settled.extend(group_results);
    }

    let mut pages = Vec::with_capacity(total);
    let mut failed = Vec::new();
    for batch in settled {
        match batch.result {
            Ok(rows) => pages.push(rows),
            Err(e) => {
                error!(
                    "Batch {} ending at {} failed after {} retries: {}",
                    batch.request.batch_index,
                    format_datetime(batch.request.end_date),
                    batch.retries,
                    e
                );
                failed.push(FailedBatch {
                    request: batch.request,
                    error: e,
                    retries: batch.retries,
                });
            }
        }
    }

    Ok(BatchFetchOutcome {
        data: merge_batches(pages, options.start_ts, options.end_ts),
        total_batches: total,
        failed,
    })
}
