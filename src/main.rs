/*!
 * Telemetry Sensor - Main Entry Point
 *
 * Subscribes to ticker events and prints every joined event as one JSON
 * line on stdout until Ctrl+C, then closes the session and drains it.
 */

use miette::{IntoDiagnostic, Result};
use telemetry_sensor::{init_tracing, span_operation, Sensor, SensorConfig, Subscription};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Telemetry sensor starting...");

    let config = SensorConfig::from_env()?;
    info!(
        sensor_id = %config.sensor_id,
        channel_buffer_length = config.channel_buffer_length,
        ticker_interval_ms = config.ticker_interval.as_millis() as u64,
        "Configuration loaded"
    );

    let sensor = Sensor::new(config);
    let subscription = Subscription::new().with_ticker(sensor.config().ticker_interval);

    let operation = span_operation("session");
    let session = sensor.subscribe(&subscription).await?;
    info!("Press Ctrl+C to exit");

    let mut printed: u64 = 0;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.into_diagnostic()?;
                info!("Interrupt received, closing session");
                break;
            }
            event = session.recv() => {
                let Some(event) = event else {
                    break;
                };
                println!("{}", serde_json::to_string(&event).into_diagnostic()?);
                printed += 1;
            }
        }
    }

    let events = session.close();
    while let Some(event) = events.recv().await {
        println!("{}", serde_json::to_string(&event).into_diagnostic()?);
        printed += 1;
    }

    operation.record_items_processed(printed);
    info!(events = printed, "Telemetry sensor stopped");
    Ok(())
}
