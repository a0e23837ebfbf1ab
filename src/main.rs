use log::{error, info, warn};

use ambient_weather::data_service::{check_availability, supported_data_types};
use ambient_weather::utils::{format_datetime, now_millis, summarize};
use ambient_weather::{
    AmbientWeatherClient, HistoryFetchOptions, ProgressInfo, UnifiedMeasurement, WeatherConfig,
};

const HOUR_MS: i64 = 60 * 60 * 1000;

fn log_current_reading(reading: &UnifiedMeasurement) {
    info!("Current reading at {}:", format_datetime(reading.timestamp));
    for data_type in supported_data_types() {
        if let Some(value) = data_type.value_of(reading) {
            info!("  {}: {:.2} {}", data_type, value, data_type.unit());
        }
    }
}

async fn run(config: WeatherConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Ambient Weather history fetch");

    let client = AmbientWeatherClient::from_config(&config)?;

    if !check_availability(&client).await {
        return Err("Ambient Weather API is not reachable with the configured keys".into());
    }

    match client.get_weather_data().await? {
        Some(reading) => log_current_reading(&reading),
        None => warn!("No devices with current data on this account"),
    }

    let end_ts = now_millis();
    let start_ts = end_ts - i64::from(config.history_hours) * HOUR_MS;
    info!(
        "Fetching history from {} to {}",
        format_datetime(start_ts),
        format_datetime(end_ts)
    );

    let on_progress = |progress: ProgressInfo| {
        info!(
            "History progress: {}/{} batches ({}%)",
            progress.completed, progress.total, progress.percentage
        );
    };
    let history = client
        .get_history_weather_data(
            None,
            HistoryFetchOptions {
                start_ts: Some(start_ts),
                end_ts: Some(end_ts),
                limit: None,
                on_progress: Some(&on_progress),
            },
        )
        .await?;

    // Warning if no data collected
    if history.is_empty() {
        warn!("No history returned for this interval!");
        return Ok(());
    }

    // Print summary
    for data_type in supported_data_types() {
        let values: Vec<f64> = history.iter().filter_map(|m| data_type.value_of(m)).collect();
        if let Some(summary) = summarize(&values) {
            info!("Summary for {}:", data_type);
            info!("  Minimum: {:.2} {}", summary.min, data_type.unit());
            info!("  Maximum: {:.2} {}", summary.max, data_type.unit());
            info!("  Average: {:.2} {}", summary.average, data_type.unit());
            info!("  Based on {} samples", summary.samples);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match WeatherConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(());
        }
    });

    // Run the fetch or wait for shutdown signal
    tokio::select! {
        result = run(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
