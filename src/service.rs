//! Device and history operations on top of the retrying client
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tokio::time::Duration;

use crate::client::batch::{
    concurrent_batch_fetch, BatchFetchOptions, BatchFetchOutcome, ProgressCallback,
};
use crate::client::retry::{fetch_with_retry, RetryPolicy};
use crate::client::transport::{HttpTransport, Transport};
use crate::config::{Credentials, WeatherConfig};
use crate::error::{AmbientError, ErrorKind, Result};
use crate::models::{Device, DeviceDataPoint, UnifiedMeasurement};
use crate::transform::transform_to_unified_format;
use crate::utils::iso_from_millis;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30000);
pub const DEFAULT_DEVICE_LIMIT: usize = 288;
pub const DEFAULT_HISTORY_LIMIT: usize = 43200;

#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceDataOptions {
    /// Defaults to [`DEFAULT_DEVICE_LIMIT`]
    pub limit: Option<usize>,
    /// Epoch milliseconds of the newest sample wanted
    pub end_date: Option<i64>,
}

#[derive(Clone, Copy, Default)]
pub struct HistoryFetchOptions<'a> {
    pub start_ts: Option<i64>,
    pub end_ts: Option<i64>,
    /// Defaults to [`DEFAULT_HISTORY_LIMIT`]
    pub limit: Option<usize>,
    pub on_progress: Option<&'a ProgressCallback<'a>>,
}

impl fmt::Debug for HistoryFetchOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryFetchOptions")
            .field("start_ts", &self.start_ts)
            .field("end_ts", &self.end_ts)
            .field("limit", &self.limit)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

pub struct AmbientWeatherClient<T> {
    transport: T,
    credentials: Credentials,
    timeout: Duration,
    policy: RetryPolicy,
}

impl AmbientWeatherClient<HttpTransport> {
    pub fn from_config(config: &WeatherConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.base_url.clone())?;
        Ok(AmbientWeatherClient::new(transport, config.credentials.clone())
            .with_timeout(config.timeout)
            .with_retry_policy(RetryPolicy::new(config.max_retries)))
    }
}

fn decode_array<R: DeserializeOwned>(value: Value) -> Result<Vec<R>> {
    if !value.is_array() {
        return Err(AmbientError::new(
            ErrorKind::InvalidResponseFormat,
            "Invalid response format from API",
        ));
    }
    serde_json::from_value(value).map_err(|e| {
        AmbientError::new(ErrorKind::Unknown, "Unexpected payload shape").with_source(e)
    })
}

impl<T: Transport> AmbientWeatherClient<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        AmbientWeatherClient {
            transport,
            credentials,
            timeout: DEFAULT_TIMEOUT,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        fetch_with_retry(
            &self.transport,
            &self.credentials,
            endpoint,
            params,
            self.timeout,
            &self.policy,
        )
        .await
    }

    pub async fn get_user_devices(&self) -> Result<Vec<Device>> {
        let wrap = |e: AmbientError| e.or_wrap(ErrorKind::FetchDevices, "Failed to fetch devices");
        let value = self.fetch("/devices", &[]).await.map_err(wrap)?;
        decode_array(value).map_err(wrap)
    }

    pub async fn get_device_data(
        &self,
        mac_address: &str,
        options: DeviceDataOptions,
    ) -> Result<Vec<DeviceDataPoint>> {
        if mac_address.is_empty() {
            return Err(AmbientError::new(
                ErrorKind::MissingMacAddress,
                "MAC address is required",
            ));
        }

        let mut params = vec![(
            "limit".to_string(),
            options.limit.unwrap_or(DEFAULT_DEVICE_LIMIT).to_string(),
        )];
        if let Some(end_date) = options.end_date {
            params.push(("endDate".to_string(), iso_from_millis(end_date)?));
        }

        let wrap = |e: AmbientError| {
            e.or_wrap(
                ErrorKind::FetchDeviceData,
                format!("Failed to fetch data for device {}", mac_address),
            )
        };
        let value = self
            .fetch(&format!("/devices/{}", mac_address), &params)
            .await
            .map_err(wrap)?;
        decode_array(value).map_err(wrap)
    }

    pub async fn get_latest_device_data(
        &self,
        mac_address: &str,
    ) -> Result<Option<DeviceDataPoint>> {
        let data = self
            .get_device_data(
                mac_address,
                DeviceDataOptions {
                    limit: Some(1),
                    end_date: None,
                },
            )
            .await?;
        Ok(data.into_iter().next())
    }

    /// Current reading of the first device, or `None` when there is nothing to show
    pub async fn get_weather_data(&self) -> Result<Option<UnifiedMeasurement>> {
        let devices = self.get_user_devices().await?;
        Ok(devices
            .first()
            .and_then(|device| device.last_data.as_ref())
            .map(transform_to_unified_format))
    }

    /// Windowed history through the concurrent batch fetcher
    pub async fn fetch_history_batches(
        &self,
        mac_address: &str,
        start_ts: i64,
        end_ts: i64,
        limit: usize,
        on_progress: Option<&ProgressCallback<'_>>,
    ) -> Result<BatchFetchOutcome<DeviceDataPoint>> {
        concurrent_batch_fetch(
            &self.transport,
            &self.credentials,
            BatchFetchOptions {
                mac_address,
                start_ts,
                end_ts,
                limit,
                timeout: self.timeout,
                policy: self.policy,
                on_progress,
            },
        )
        .await
    }

    /// History for a device, defaulting to the first one on the account
    ///
    /// With both `start_ts` and `end_ts` the range is fetched in concurrent
    /// batches; otherwise the latest `limit` samples come from one request.
    pub async fn get_history_weather_data(
        &self,
        mac_address: Option<&str>,
        options: HistoryFetchOptions<'_>,
    ) -> Result<Vec<UnifiedMeasurement>> {
        let mac_address = match mac_address {
            Some(mac) => mac.to_string(),
            None => match self.get_user_devices().await?.into_iter().next() {
                Some(device) => device.mac_address,
                None => {
                    info!("No devices available, returning empty history");
                    return Ok(Vec::new());
                }
            },
        };
        let limit = options.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

        let data_points = match (options.start_ts, options.end_ts) {
            (Some(start_ts), Some(end_ts)) => {
                let outcome = self
                    .fetch_history_batches(
                        &mac_address,
                        start_ts,
                        end_ts,
                        limit,
                        options.on_progress,
                    )
                    .await?;
                if !outcome.failed.is_empty() {
                    warn!(
                        "{} of {} history batches failed for {}; returning partial data",
                        outcome.failed.len(),
                        outcome.total_batches,
                        mac_address
                    );
                }
                outcome.data
            }
            _ => {
                self.get_device_data(
                    &mac_address,
                    DeviceDataOptions {
                        limit: Some(limit),
                        end_date: None,
                    },
                )
                .await?
            }
        };

        Ok(data_points.iter().map(transform_to_unified_format).collect())
    }
}
