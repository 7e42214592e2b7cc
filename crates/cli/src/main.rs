mod menu;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use airline_core::{
    config::{self, AppConfig},
    BookingEvent, BookingService, DataStore,
};
use tokio::{io::BufReader, sync::mpsc};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let store = DataStore::from_config(&config);
    let (service, events) = BookingService::load(store, config.persist_on_change).subscribe();
    let history = tokio::spawn(record_events(events));

    let mut menu = menu::Menu::new(service.clone(), BufReader::new(tokio::io::stdin()));
    let outcome = menu.run().await;
    drop(menu);

    let saved = service.save().context("failed to save booking data");
    // The history task ends once every sender is gone.
    drop(service);
    history.await.context("booking history task failed")?;

    saved?;
    println!("Thank you for using the Airline Reservation System!");
    outcome
}

async fn record_events(mut events: mpsc::UnboundedReceiver<BookingEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            BookingEvent::Booked {
                reservation,
                flight,
            } => tracing::info!(
                target: "airline::history",
                reservation_id = %reservation.reservation_id(),
                passenger = %reservation.passenger_name(),
                flight_number = flight.flight_number,
                route = %format!("{} → {}", flight.origin, flight.destination),
                price = flight.price,
                "Booking recorded"
            ),
            BookingEvent::Cancelled {
                reservation,
                flight,
                reason,
            } => tracing::info!(
                target: "airline::history",
                reservation_id = %reservation.reservation_id(),
                passenger = %reservation.passenger_name(),
                flight_number = flight.flight_number,
                reason = %reason,
                "Cancellation recorded"
            ),
        }
    }
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("airline.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The menu owns stdout; only warnings reach the terminal.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
