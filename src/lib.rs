pub mod client;
pub mod config;
pub mod data_service;
pub mod error;
pub mod models;
pub mod service;
pub mod transform;
pub mod units;
pub mod utils;

pub use config::{Credentials, WeatherConfig};
pub use error::{AmbientError, ErrorKind, Result};
pub use models::{Device, DeviceDataPoint, DeviceLastData, ProgressInfo, UnifiedMeasurement};
pub use service::{AmbientWeatherClient, DeviceDataOptions, HistoryFetchOptions};
pub use transform::transform_to_unified_format;
