use std::io::{self, Write};

use anyhow::{Context, Result};
use airline_core::{
    ledger::RESERVATION_ID_PREFIX,
    models::{BOOKING_TIME_FORMAT, DEPARTURE_TIME_FORMAT},
    BookingError, BookingService, Flight, Reservation,
};
use chrono::NaiveDate;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

const CANCELLATION_REASONS: &[&str] = &[
    "Change of plans",
    "Found better price",
    "Schedule conflict",
    "Personal emergency",
    "Weather concerns",
    "Other",
];

const DEFAULT_REASON: &str = "Cancelled by user";

const SEARCH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Numbered console menu driving a [`BookingService`].
pub struct Menu<R> {
    service: BookingService,
    input: Lines<R>,
}

impl<R> Menu<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(service: BookingService, reader: R) -> Self {
        Self {
            service,
            input: reader.lines(),
        }
    }

    /// Loop until the user exits or input ends.
    pub async fn run(&mut self) -> Result<()> {
        let summary = self.service.summary();
        println!("Airline Reservation System initialized successfully!");
        println!(
            "Loaded {} flights and {} reservations.",
            summary.flights, summary.reservations
        );

        loop {
            print_main_menu();
            let Some(choice) = self.prompt("Choose an option: ").await? else {
                return Ok(());
            };
            match choice.trim() {
                "1" => self.show_flights(),
                "2" => self.search().await?,
                "3" => self.book().await?,
                "4" => self.show_reservations(),
                "5" => self.cancel().await?,
                "6" => {
                    println!("Saving data...");
                    return Ok(());
                }
                _ => println!("Invalid option, please try again"),
            }
        }
    }

    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        print!("{label}");
        io::stdout().flush().context("failed to flush stdout")?;
        self.input
            .next_line()
            .await
            .context("failed to read from stdin")
    }

    fn show_flights(&self) {
        let flights = self.service.flights();
        println!("\n---- Available Flights ----");
        if flights.is_empty() {
            println!("No flights available.");
            return;
        }

        print_flight_table(&flights);
        let summary = self.service.summary();
        println!("Total available seats: {}", summary.available_seats);
    }

    async fn search(&mut self) -> Result<()> {
        let Some(origin) = self.prompt("From: ").await? else {
            return Ok(());
        };
        let Some(destination) = self.prompt("To: ").await? else {
            return Ok(());
        };
        let Some(date) = self.prompt("Date (YYYY-MM-DD): ").await? else {
            return Ok(());
        };

        if origin.trim().is_empty() || destination.trim().is_empty() {
            println!("Please fill in both departure and destination cities.");
            return Ok(());
        }
        let Ok(date) = NaiveDate::parse_from_str(date.trim(), SEARCH_DATE_FORMAT) else {
            println!("Invalid date format. Please use YYYY-MM-DD.");
            return Ok(());
        };

        let flights = self.service.search_flights(&origin, &destination, date);
        if flights.is_empty() {
            println!(
                "No flights from {} to {} on {date}.",
                origin.trim(),
                destination.trim()
            );
            return Ok(());
        }
        println!("\n---- Matching Flights ----");
        print_flight_table(&flights);
        Ok(())
    }

    async fn book(&mut self) -> Result<()> {
        self.show_flights();

        let flight_number = loop {
            let Some(line) = self.prompt("Enter the flight number to book: ").await? else {
                return Ok(());
            };
            match line.trim().parse::<u32>() {
                Ok(number) => break number,
                Err(_) => println!("Please enter a valid number:"),
            }
        };

        let Some(passenger) = self.prompt("Enter passenger name: ").await? else {
            return Ok(());
        };

        match self.service.book(flight_number, &passenger) {
            Ok(reservation) => print_booking(&self.service, &reservation),
            Err(BookingError::Unsaved {
                reservation,
                source,
            }) => {
                print_booking(&self.service, &reservation);
                println!("Warning: the booking could not be saved: {source}");
            }
            Err(err) => println!("Booking failed: {err}"),
        }
        Ok(())
    }

    fn show_reservations(&self) {
        let reservations = self.service.reservations();
        if reservations.is_empty() {
            println!("No reservations found.");
            return;
        }

        println!("\n---- Current Reservations ----");
        println!(
            "{:<18} {:<20} {:<8} {:<15} {:<10} {:<19}",
            "Reservation ID", "Passenger Name", "Flight", "Destination", "Status", "Booked"
        );
        println!("{}", "-".repeat(95));
        for reservation in &reservations {
            let destination = self
                .service
                .find_flight(reservation.flight_number())
                .map(|flight| flight.destination)
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<18} {:<20} {:<8} {:<15} {:<10} {:<19}",
                reservation.reservation_id(),
                reservation.passenger_name(),
                reservation.flight_number(),
                destination,
                reservation.status(),
                reservation.booking_time().format(BOOKING_TIME_FORMAT)
            );
        }
    }

    async fn cancel(&mut self) -> Result<()> {
        if self.service.summary().active == 0 {
            println!("No reservations to cancel.");
            return Ok(());
        }

        let Some(target) = self
            .prompt("Enter reservation ID or passenger name to cancel: ")
            .await?
        else {
            return Ok(());
        };

        println!("Cancellation reason:");
        for (index, reason) in CANCELLATION_REASONS.iter().enumerate() {
            println!("  {}. {reason}", index + 1);
        }
        let reason = match self.prompt("Choose a reason (blank to skip): ").await? {
            Some(choice) => pick_reason(&choice),
            None => DEFAULT_REASON,
        };

        let result = if looks_like_reservation_id(&target) {
            match self.service.cancel(&target, reason) {
                // Passenger names may start with the id prefix too.
                Err(BookingError::ReservationNotFound(_)) => {
                    self.service.cancel_by_passenger(&target, reason)
                }
                other => other,
            }
        } else {
            self.service.cancel_by_passenger(&target, reason)
        };

        match result {
            Ok(reservation) => print_cancellation(&reservation),
            Err(BookingError::Unsaved {
                reservation,
                source,
            }) => {
                print_cancellation(&reservation);
                println!("Warning: the cancellation could not be saved: {source}");
            }
            Err(BookingError::ReservationNotFound(_)) => {
                println!("No active reservation found for: {}", target.trim());
            }
            Err(err) => println!("Cancellation failed: {err}"),
        }
        Ok(())
    }
}

fn print_main_menu() {
    println!("\n====== Airline Reservation System ======");
    println!("1. Display Available Flights");
    println!("2. Search Flights");
    println!("3. Book a Flight");
    println!("4. View Reservations");
    println!("5. Cancel Booking");
    println!("6. Exit");
}

fn print_flight_table(flights: &[Flight]) {
    println!(
        "{:<8} {:<15} {:<15} {:<11} {:>9} {:<16}",
        "Flight", "From", "To", "Seats", "Price", "Departure"
    );
    println!("{}", "-".repeat(80));
    for flight in flights {
        println!(
            "{:<8} {:<15} {:<15} {:<11} {:>9.2} {:<16}",
            flight.flight_number,
            flight.origin,
            flight.destination,
            format!("{}/{}", flight.available_seats(), flight.total_seats()),
            flight.price,
            flight.departure_time.format(DEPARTURE_TIME_FORMAT)
        );
    }
}

fn print_cancellation(reservation: &Reservation) {
    println!(
        "Reservation {} cancelled successfully for: {}",
        reservation.reservation_id(),
        reservation.passenger_name()
    );
}

fn print_booking(service: &BookingService, reservation: &Reservation) {
    println!("Booking successful!");
    println!("Reservation ID: {}", reservation.reservation_id());
    println!("Passenger: {}", reservation.passenger_name());
    if let Some(flight) = service.find_flight(reservation.flight_number()) {
        println!("Flight: {} to {}", flight.flight_number, flight.destination);
    }
}

fn looks_like_reservation_id(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.len() > RESERVATION_ID_PREFIX.len()
        && trimmed
            .get(..RESERVATION_ID_PREFIX.len())
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case(RESERVATION_ID_PREFIX))
}

fn pick_reason(choice: &str) -> &'static str {
    choice
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| CANCELLATION_REASONS.get(index).copied())
        .unwrap_or(DEFAULT_REASON)
}
