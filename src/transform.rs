//! Normalization of raw station payloads into the unified metric record
use crate::models::{RawMeasurement, UnifiedMeasurement};
use crate::units::{
    fahrenheit_to_celsius, inch_hg_to_kilopascal, inch_to_millimeter, mph_to_meters_per_second,
};

/// Convert a snapshot or history row into a [`UnifiedMeasurement`]
///
/// Only channels present on the source appear in the output. Humidity and
/// wind direction are already in unified units and are copied through.
pub fn transform_to_unified_format<M: RawMeasurement + ?Sized>(raw: &M) -> UnifiedMeasurement {
    let fields = raw.fields();

    UnifiedMeasurement {
        timestamp: raw.dateutc(),
        date: raw.date().to_string(),
        ambient_temperature: fields.tempf.map(fahrenheit_to_celsius),
        ambient_humidity: fields.humidity,
        pressure: fields.baromrelin.map(inch_hg_to_kilopascal),
        wind_speed: fields.windspeedmph.map(mph_to_meters_per_second),
        wind_direction: fields.winddir,
        rainfall: fields.hourlyrainin.map(inch_to_millimeter),
        feels_like: fields.feels_like.map(fahrenheit_to_celsius),
        dew_point: fields.dew_point.map(fahrenheit_to_celsius),
        wind_gust: fields.windgustmph.map(mph_to_meters_per_second),
        max_daily_gust: fields.maxdailygust.map(mph_to_meters_per_second),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceDataPoint, DeviceLastData, WeatherFields};

    const TS: i64 = 1515436500000;
    const DATE: &str = "2018-01-08T18:35:00.000Z";

    fn last_data(fields: WeatherFields) -> DeviceLastData {
        DeviceLastData {
            dateutc: TS,
            date: DATE.to_string(),
            fields,
            device_id: None,
            tz: None,
        }
    }

    #[test]
    fn converts_temperature_and_keeps_time() {
        let result = transform_to_unified_format(&last_data(WeatherFields {
            tempf: Some(66.9),
            ..Default::default()
        }));

        assert!((result.ambient_temperature.unwrap() - 19.39).abs() < 0.05);
        assert_eq!(result.timestamp, TS);
        assert_eq!(result.date, DATE);
    }

    #[test]
    fn converts_wind_pressure_and_rain() {
        let result = transform_to_unified_format(&last_data(WeatherFields {
            windspeedmph: Some(10.0),
            baromrelin: Some(30.05),
            hourlyrainin: Some(0.5),
            ..Default::default()
        }));

        assert!((result.wind_speed.unwrap() - 4.47).abs() < 0.05);
        assert!((result.pressure.unwrap() - 101.76).abs() < 0.5);
        assert_eq!(result.rainfall, Some(12.7));
    }

    #[test]
    fn humidity_and_direction_pass_through() {
        let result = transform_to_unified_format(&last_data(WeatherFields {
            humidity: Some(65.0),
            winddir: Some(180.0),
            ..Default::default()
        }));

        assert_eq!(result.ambient_humidity, Some(65.0));
        assert_eq!(result.wind_direction, Some(180.0));
    }

    #[test]
    fn all_channels_present() {
        let result = transform_to_unified_format(&last_data(WeatherFields {
            tempf: Some(66.9),
            humidity: Some(30.0),
            baromrelin: Some(30.05),
            windspeedmph: Some(0.9),
            winddir: Some(58.0),
            hourlyrainin: Some(0.0),
            feels_like: Some(66.9),
            dew_point: Some(34.45),
            windgustmph: Some(4.0),
            maxdailygust: Some(5.0),
            ..Default::default()
        }));

        assert!(result.ambient_temperature.is_some());
        assert_eq!(result.ambient_humidity, Some(30.0));
        assert!(result.pressure.is_some());
        assert!(result.wind_speed.is_some());
        assert_eq!(result.wind_direction, Some(58.0));
        assert_eq!(result.rainfall, Some(0.0));
        assert!(result.feels_like.is_some());
        assert!(result.dew_point.is_some());
        assert!(result.wind_gust.is_some());
        assert!(result.max_daily_gust.is_some());
    }

    #[test]
    fn bare_payload_has_no_measurements() {
        let result = transform_to_unified_format(&last_data(WeatherFields::default()));

        assert_eq!(
            result,
            UnifiedMeasurement {
                timestamp: TS,
                date: DATE.to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn history_rows_use_the_same_mapping() {
        let point = DeviceDataPoint {
            mac_address: "00:00:00:00:00:00".to_string(),
            dateutc: TS,
            date: DATE.to_string(),
            fields: WeatherFields {
                dew_point: Some(32.0),
                tempinf: Some(70.0),
                ..Default::default()
            },
            tz: None,
        };

        let result = transform_to_unified_format(&point);
        assert_eq!(result.dew_point, Some(0.0));
        assert!(result.ambient_temperature.is_none());
    }
}
