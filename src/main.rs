use crate::configuration::get_configuration;
use crate::error::Result;
use crate::gradient::Palette;
use crate::models::LocationId;
use crate::provider::HttpProvider;
use crate::reference::ReferenceData;
use crate::series::MAX_WINDOW_DAYS;
use crate::session::{SeriesRequest, SeriesResponse, SeriesSession};
use crate::table::Table;
use log::{ info, warn, error };
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

mod configuration;
mod dates;
mod error;
mod gradient;
mod models;
mod provider;
mod reference;
mod series;
mod session;
mod table;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let configuration = get_configuration().expect("Failed to read configuration.");
    let provider = Arc::new(HttpProvider::new(&configuration.provider)?);

    let _start_loading = Instant::now();
    let reference = ReferenceData::load(provider.as_ref()).await?;
    info!(
        "Loaded {} allergens and {} locations from {} in {:?}",
        reference.allergens.len(),
        reference.locations.len(),
        configuration.provider.base_url,
        _start_loading.elapsed()
    );

    let display = &configuration.display;
    let mut session = SeriesSession::new(provider);
    let mut window_days = display.window_days;
    session.request(SeriesRequest {
        location: display.location_id,
        window_days,
    });
    println!(
        "Enter a location id (optionally followed by a number of days, at most {}), `locations`, `allergens` or `q`.",
        MAX_WINDOW_DAYS
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Command::Show { location, days } => {
                        window_days = days.unwrap_or(window_days);
                        session.request(SeriesRequest { location, window_days });
                    }
                    Command::Locations => print_locations(&reference),
                    Command::Allergens => print_allergens(&reference),
                    Command::Quit => break,
                    Command::Empty => (),
                    Command::Unknown => warn!("Unrecognized input: {}", line.trim()),
                },
                Ok(None) => {
                    // Input closed: show what was last asked for, then stop.
                    if session.is_pending() {
                        if let Some(response) = session.next_response().await {
                            present(&reference, &configuration.palette, display.ansi_colors, response);
                        }
                    }
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            Some(response) = session.next_response() => {
                present(&reference, &configuration.palette, display.ansi_colors, response);
            }
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Show { location: LocationId, days: Option<u32> },
    Locations,
    Allergens,
    Quit,
    Empty,
    Unknown,
}

fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Command::Empty;
    };
    match first {
        "q" | "quit" | "exit" => return Command::Quit,
        "locations" | "l" => return Command::Locations,
        "allergens" | "a" => return Command::Allergens,
        _ => (),
    }

    let Ok(location) = first.parse::<LocationId>() else {
        return Command::Unknown;
    };
    let days = match words.next().map(str::parse::<u32>) {
        None => None,
        Some(Ok(days)) => Some(days),
        Some(Err(_)) => return Command::Unknown,
    };
    if words.next().is_some() {
        return Command::Unknown;
    }
    Command::Show { location, days }
}

fn print_locations(reference: &ReferenceData) {
    for location in &reference.locations {
        println!("{:>4}  {}", location.id, location.name);
    }
}

fn print_allergens(reference: &ReferenceData) {
    for allergen in &reference.allergens {
        println!(
            "{:>4}  {} ({}), elevated from {}, high from {}{}",
            allergen.id,
            allergen.label(),
            allergen.name,
            allergen.margin_low,
            allergen.margin_high,
            allergen
                .allergenicity_display
                .as_deref()
                .map(|level| format!(", allergenicity: {}", level))
                .unwrap_or_default()
        );
    }
}

fn present(reference: &ReferenceData, palette: &Palette, ansi: bool, response: SeriesResponse) {
    let SeriesRequest { location, window_days } = response.request;
    match reference.location(location) {
        Some(found) => {
            println!(
                "\n{} (lat: {}, lon: {}) {}",
                found.name,
                found.latitude,
                found.longitude,
                found.map_url()
            );
            if !found.description.trim().is_empty() {
                println!("{}", found.description.trim());
            }
        }
        None => println!("\nLocation {}", location),
    }

    match response.series {
        Ok(series) => {
            info!(
                "Assembled {} days ({} without samples) for location {} in {:?}",
                series.len(),
                series.iter().filter(|day| day.is_placeholder()).count(),
                location,
                response.elapsed
            );
            let table = Table::build(&series, reference, palette);
            if table.rows.is_empty() {
                println!("No measurements in the last {} days.", window_days);
            } else {
                print!("{}", table.render(ansi));
            }
        }
        Err(e) => {
            error!("Failed to load measurements for location {}: {}", location, e);
            println!("Measurements are unavailable right now. Enter the location again to retry.");
        }
    }
}
