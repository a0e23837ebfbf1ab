//! Chart-facing view of the weather data: per-field series and current values
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::client::batch::ProgressCallback;
use crate::client::transport::Transport;
use crate::error::{AmbientError, ErrorKind, Result};
use crate::models::UnifiedMeasurement;
use crate::service::{AmbientWeatherClient, HistoryFetchOptions};
use crate::utils::{minute_label, truncate_to_minute};

/// Unified fields that can be charted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    AmbientTemperature,
    AmbientHumidity,
    Pressure,
    WindSpeed,
    WindDirection,
    Rainfall,
}

const SUPPORTED_DATA_TYPES: [DataType; 6] = [
    DataType::AmbientTemperature,
    DataType::AmbientHumidity,
    DataType::Pressure,
    DataType::WindSpeed,
    DataType::WindDirection,
    DataType::Rainfall,
];

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::AmbientTemperature => "ambientTemperature",
            DataType::AmbientHumidity => "ambientHumidity",
            DataType::Pressure => "pressure",
            DataType::WindSpeed => "windSpeed",
            DataType::WindDirection => "windDirection",
            DataType::Rainfall => "rainfall",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            DataType::AmbientTemperature => "°C",
            DataType::AmbientHumidity => "%",
            DataType::Pressure => "kPa",
            DataType::WindSpeed => "m/s",
            DataType::WindDirection => "°",
            DataType::Rainfall => "mm",
        }
    }

    pub fn value_of(&self, measurement: &UnifiedMeasurement) -> Option<f64> {
        match self {
            DataType::AmbientTemperature => measurement.ambient_temperature,
            DataType::AmbientHumidity => measurement.ambient_humidity,
            DataType::Pressure => measurement.pressure,
            DataType::WindSpeed => measurement.wind_speed,
            DataType::WindDirection => measurement.wind_direction,
            DataType::Rainfall => measurement.rainfall,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = AmbientError;

    fn from_str(s: &str) -> Result<Self> {
        SUPPORTED_DATA_TYPES
            .iter()
            .copied()
            .find(|data_type| data_type.as_str() == s)
            .ok_or_else(|| {
                AmbientError::new(
                    ErrorKind::Configuration,
                    format!("Data type \"{}\" is not supported by Ambient Weather API", s),
                )
            })
    }
}

pub fn supported_data_types() -> &'static [DataType] {
    &SUPPORTED_DATA_TYPES
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time: String,
    pub value: f64,
}

/// Present fields of one measurement, keyed by data type
pub fn readings_of(measurement: &UnifiedMeasurement) -> BTreeMap<DataType, f64> {
    SUPPORTED_DATA_TYPES
        .iter()
        .filter_map(|data_type| Some((*data_type, data_type.value_of(measurement)?)))
        .collect()
}

/// One data type's series, labelled by UTC minute and kept within
/// `[start_ts, end_ts]` at minute resolution
pub fn series_of(
    measurements: &[UnifiedMeasurement],
    data_type: DataType,
    start_ts: i64,
    end_ts: i64,
) -> Vec<SeriesPoint> {
    let mut points: Vec<(i64, SeriesPoint)> = measurements
        .iter()
        .filter_map(|measurement| {
            let value = data_type.value_of(measurement)?;
            let minute = truncate_to_minute(measurement.timestamp);
            if minute < start_ts || minute > end_ts {
                return None;
            }
            let time = minute_label(minute)?;
            Some((minute, SeriesPoint { time, value }))
        })
        .collect();
    points.sort_by_key(|(minute, _)| *minute);
    points.into_iter().map(|(_, point)| point).collect()
}

pub async fn fetch_current_readings<T: Transport>(
    client: &AmbientWeatherClient<T>,
) -> Result<Option<BTreeMap<DataType, f64>>> {
    Ok(client.get_weather_data().await?.as_ref().map(readings_of))
}

pub async fn fetch_history_series<T: Transport>(
    client: &AmbientWeatherClient<T>,
    data_type: DataType,
    start_ts: i64,
    end_ts: i64,
    limit: usize,
    on_progress: Option<&ProgressCallback<'_>>,
) -> Result<Vec<SeriesPoint>> {
    let measurements = client
        .get_history_weather_data(
            None,
            HistoryFetchOptions {
                start_ts: Some(start_ts),
                end_ts: Some(end_ts),
                limit: Some(limit),
                on_progress,
            },
        )
        .await?;

    let series = series_of(&measurements, data_type, start_ts, end_ts);
    debug!(
        "{} series has {} of {} samples",
        data_type,
        series.len(),
        measurements.len()
    );
    Ok(series)
}

/// Whether the account's devices can be listed with the configured keys
pub async fn check_availability<T: Transport>(client: &AmbientWeatherClient<T>) -> bool {
    match client.get_user_devices().await {
        Ok(_) => true,
        Err(e) => {
            warn!("Ambient Weather API unavailable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::client::retry::RetryPolicy;
    use crate::config::Credentials;
    use serde_json::json;

    const MAC: &str = "00:00:00:00:00:00";
    const START: i64 = 1515430000000;
    const END: i64 = 1515440000000;

    fn client(transport: MockTransport) -> AmbientWeatherClient<MockTransport> {
        let credentials = Credentials::new(vec!["k1".into()], vec!["a1".into()]).unwrap();
        AmbientWeatherClient::new(transport, credentials)
            .with_retry_policy(RetryPolicy::immediate(0))
    }

    fn measurement(timestamp: i64, temperature: Option<f64>) -> UnifiedMeasurement {
        UnifiedMeasurement {
            timestamp,
            date: String::new(),
            ambient_temperature: temperature,
            pressure: Some(101.3),
            ..Default::default()
        }
    }

    #[test]
    fn data_types_parse_from_field_names() {
        for data_type in supported_data_types() {
            assert_eq!(data_type.as_str().parse::<DataType>().unwrap(), *data_type);
        }
        let err = "CO2".parse::<DataType>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn readings_keep_only_present_fields() {
        let readings = readings_of(&measurement(0, Some(19.39)));
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[&DataType::AmbientTemperature], 19.39);
        assert_eq!(readings[&DataType::Pressure], 101.3);
    }

    #[test]
    fn series_skips_missing_values_and_sorts() {
        let measurements = vec![
            measurement(1515436500000, Some(20.0)),
            measurement(1515436200000, None),
            measurement(1515435900000, Some(19.0)),
        ];
        let series = series_of(&measurements, DataType::AmbientTemperature, START, END);
        assert_eq!(
            series,
            vec![
                SeriesPoint { time: "2018-01-08 18:25".into(), value: 19.0 },
                SeriesPoint { time: "2018-01-08 18:35".into(), value: 20.0 },
            ]
        );
    }

    #[test]
    fn series_range_is_checked_at_minute_resolution() {
        // 18:35:30 truncates to 18:35:00, which is before a 18:35:10 start
        let start = 1515436510000;
        let measurements = vec![measurement(1515436530000, Some(1.0))];
        assert!(series_of(&measurements, DataType::AmbientTemperature, start, END).is_empty());
    }

    #[tokio::test]
    async fn current_readings_from_first_device() {
        let c = client(MockTransport::new(|_| {
            Ok(json!([{
                "macAddress": MAC,
                "info": {"name": "Roof"},
                "lastData": {"dateutc": 1515436500000i64, "date": "", "tempf": 32.0, "winddir": 90}
            }]))
        }));
        let readings = fetch_current_readings(&c).await.unwrap().unwrap();
        assert_eq!(readings[&DataType::AmbientTemperature], 0.0);
        assert_eq!(readings[&DataType::WindDirection], 90.0);
        assert!(!readings.contains_key(&DataType::Rainfall));
    }

    #[tokio::test]
    async fn history_series_for_first_device() {
        let c = client(MockTransport::new(|call| {
            if call.endpoint == "/devices" {
                return Ok(json!([{"macAddress": MAC, "info": {"name": "Roof"}}]));
            }
            Ok(json!([
                {"macAddress": MAC, "dateutc": 1515436500000i64, "date": "", "baromrelin": 30.0},
                {"macAddress": MAC, "dateutc": 1515436200000i64, "date": ""}
            ]))
        }));

        let series = fetch_history_series(&c, DataType::Pressure, START, END, 43200, None)
            .await
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].time, "2018-01-08 18:35");
        assert!((series[0].value - 101.59).abs() < 0.01);
    }

    #[tokio::test]
    async fn availability_reflects_device_listing() {
        let c = client(MockTransport::new(|_| Ok(json!([]))));
        assert!(check_availability(&c).await);

        let c = client(MockTransport::new(|_| Err(AmbientError::from_status(401))));
        assert!(!check_availability(&c).await);
    }
}
