pub mod batch;
pub mod keys;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use batch::{concurrent_batch_fetch, plan_batches, BatchFetchOptions, BatchFetchOutcome};
pub use keys::KeyPool;
pub use retry::{fetch_with_retry, RetryPolicy};
pub use transport::{HttpTransport, Transport};
