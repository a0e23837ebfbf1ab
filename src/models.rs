use serde::{Deserialize, Serialize};

use crate::error::AmbientError;

/// One (API key, application key) credential pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub api_key: String,
    pub application_key: String,
    pub index: usize,
}

/// One page of history ending at `end_date`, covering at most `limit` samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub key_pair: KeyPair,
    pub end_date: i64,
    pub limit: usize,
    pub batch_index: usize,
}

/// Settled outcome of one batch request
#[derive(Debug)]
pub struct BatchRequestResult<T> {
    pub request: BatchRequest,
    pub result: Result<T, AmbientError>,
    pub retries: u32,
}

impl<T> BatchRequestResult<T> {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fractional completion reported after each batch settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressInfo {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

impl ProgressInfo {
    pub fn new(completed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u8
        };
        ProgressInfo {
            completed,
            total,
            percentage,
        }
    }
}

/// Imperial sensor channels shared by the snapshot and history schemas.
/// A channel the station does not have is simply missing from the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempf: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baromrelin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baromabsin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windspeedmph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windgustmph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxdailygust: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winddir: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourlyrainin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dailyrainin: Option<f64>,
    #[serde(rename = "feelsLike", default, skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
    #[serde(rename = "dewPoint", default, skip_serializing_if = "Option::is_none")]
    pub dew_point: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempinf: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidityin: Option<f64>,
}

/// Current snapshot attached to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceLastData {
    pub dateutc: i64,
    pub date: String,
    #[serde(flatten)]
    pub fields: WeatherFields,
    #[serde(rename = "deviceId", default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
}

/// One historical row returned by `/devices/{macAddress}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDataPoint {
    #[serde(rename = "macAddress", default)]
    pub mac_address: String,
    pub dateutc: i64,
    #[serde(default)]
    pub date: String,
    #[serde(flatten)]
    pub fields: WeatherFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCoords {
    pub coords: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<DeviceCoords>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "macAddress")]
    pub mac_address: String,
    pub info: DeviceInfo,
    #[serde(rename = "lastData", default)]
    pub last_data: Option<DeviceLastData>,
    #[serde(rename = "apiKey", default)]
    pub api_key: String,
}

/// Metric, source-agnostic reading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedMeasurement {
    pub timestamp: i64,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient_humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dew_point: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_gust: Option<f64>,
}

/// Either raw schema, seen through the fields the transformer needs
pub trait RawMeasurement {
    fn dateutc(&self) -> i64;
    fn date(&self) -> &str;
    fn fields(&self) -> &WeatherFields;
}

impl RawMeasurement for DeviceLastData {
    fn dateutc(&self) -> i64 {
        self.dateutc
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn fields(&self) -> &WeatherFields {
        &self.fields
    }
}

impl RawMeasurement for DeviceDataPoint {
    fn dateutc(&self) -> i64 {
        self.dateutc
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn fields(&self) -> &WeatherFields {
        &self.fields
    }
}

/// Records that can be deduplicated and ordered by sample time
pub trait Timestamped {
    fn timestamp_ms(&self) -> i64;
}

impl Timestamped for DeviceDataPoint {
    fn timestamp_ms(&self) -> i64 {
        self.dateutc
    }
}

impl Timestamped for UnifiedMeasurement {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_point_decodes_optional_channels() {
        let raw = r#"{
            "macAddress": "00:00:00:00:00:00",
            "dateutc": 1515436500000,
            "date": "2018-01-08T18:35:00.000Z",
            "tempf": 66.9,
            "feelsLike": 66.9,
            "winddir": 58
        }"#;
        let point: DeviceDataPoint = serde_json::from_str(raw).unwrap();
        assert_eq!(point.dateutc, 1515436500000);
        assert_eq!(point.fields.tempf, Some(66.9));
        assert_eq!(point.fields.feels_like, Some(66.9));
        assert_eq!(point.fields.winddir, Some(58.0));
        assert_eq!(point.fields.humidity, None);
    }

    #[test]
    fn data_point_needs_only_a_timestamp() {
        let point: DeviceDataPoint =
            serde_json::from_str(r#"{"dateutc": 1515436200000}"#).unwrap();
        assert_eq!(point.dateutc, 1515436200000);
        assert!(point.date.is_empty());

        assert!(serde_json::from_str::<DeviceDataPoint>(r#"{"date": "no-ts"}"#).is_err());
    }

    #[test]
    fn device_without_last_data_decodes() {
        let raw = r#"[{"macAddress": "AA:BB", "info": {"name": "Roof"}}]"#;
        let devices: Vec<Device> = serde_json::from_str(raw).unwrap();
        assert_eq!(devices[0].mac_address, "AA:BB");
        assert!(devices[0].last_data.is_none());
    }

    #[test]
    fn unified_measurement_skips_absent_fields() {
        let unified = UnifiedMeasurement {
            timestamp: 1,
            date: "d".to_string(),
            pressure: Some(101.76),
            ..Default::default()
        };
        let json = serde_json::to_value(&unified).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert!(object.contains_key("pressure"));
        assert!(!object.contains_key("ambientTemperature"));
    }

    #[test]
    fn progress_percentage_rounds() {
        assert_eq!(ProgressInfo::new(1, 3).percentage, 33);
        assert_eq!(ProgressInfo::new(2, 3).percentage, 67);
        assert_eq!(ProgressInfo::new(3, 3).percentage, 100);
    }
}
