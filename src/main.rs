use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use clima_core::{App, AppError, SelectedLocation};
use clima_weather::{cities, AlertSeverity, Coordinate, FetchState};

#[derive(Parser)]
#[command(name = "clima")]
#[command(about = "Weather forecast and alerts for Ecuadorian cities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in cities
    Cities,
    /// Show current conditions and the next hours
    Forecast {
        #[command(flatten)]
        location: LocationArgs,

        /// Number of hourly rows to show
        #[arg(long, default_value_t = 12)]
        hours: usize,
    },
    /// Show weather alerts for the next 12 hours
    Alerts {
        #[command(flatten)]
        location: LocationArgs,
    },
}

#[derive(Args)]
struct LocationArgs {
    /// City name (see `clima cities`)
    #[arg(short, long, env = "CLIMA_CITY", conflicts_with_all = ["lat", "lon"])]
    city: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
}

impl LocationArgs {
    fn coordinate(&self) -> Option<Coordinate> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    clima_core::init("warn")?;
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Cities => {
            for city in cities::all() {
                println!(
                    "{:<10} {:<10} {}",
                    city.slug, city.name, city.coordinate
                );
            }
            Ok(())
        }
        Commands::Forecast { location, hours } => {
            let app = App::new()?;
            let selected = app.resolve_location(location.city.as_deref(), location.coordinate())?;
            let state = fetch(&app, &selected).await?;
            print_forecast(&selected, &state, hours);
            Ok(())
        }
        Commands::Alerts { location } => {
            let app = App::new()?;
            let selected = app.resolve_location(location.city.as_deref(), location.coordinate())?;
            let state = fetch(&app, &selected).await?;
            print_alerts(&selected, &state);
            Ok(())
        }
    }
}

/// Fetch forecast state, failing only when there is nothing to show.
async fn fetch(app: &App, selected: &SelectedLocation) -> Result<FetchState, AppError> {
    let state = app.load_forecast(selected.coordinate).await?;

    if state.is_stale() {
        if let Some(error) = &state.error {
            println!(
                "! Showing cached data, latest update failed: {}",
                error.user_message()
            );
        }
    }

    Ok(state)
}

fn print_forecast(selected: &SelectedLocation, state: &FetchState, hours: usize) {
    let Some(data) = &state.data else {
        return;
    };

    println!("{} ({})", selected.label, selected.coordinate);
    if let Some(observed_at) = data.current.observed_at {
        println!("Observed at {}", observed_at.format("%Y-%m-%d %H:%M"));
    }
    println!(
        "Temperature {:.1}°C (feels like {:.1}°C), humidity {:.0}%, wind {:.1} km/h",
        data.current.temperature,
        data.current.apparent_temperature,
        data.current.relative_humidity,
        data.current.wind_speed
    );

    if data.hourly.is_empty() {
        return;
    }

    println!();
    println!("{:<17} {:>10} {:>12}", "Hour", "Temp (°C)", "Wind (km/h)");
    for entry in data.hourly.entries().take(hours) {
        println!(
            "{:<17} {:>10.1} {:>12.1}",
            entry.time.format("%Y-%m-%d %H:%M"),
            entry.temperature,
            entry.wind_speed
        );
    }
}

fn print_alerts(selected: &SelectedLocation, state: &FetchState) {
    println!("Alerts for {}", selected.label);

    let alerts = state.alerts();
    if alerts.is_empty() {
        println!("[{}] No weather alerts", AlertSeverity::Success.label());
        println!("  Conditions are stable for the next hours:");
        println!("  - temperatures between 10°C and 28°C");
        println!("  - wind below 20 km/h");
        println!("  - no sharp temperature changes expected");
        return;
    }

    for alert in alerts {
        println!("[{}] {}", alert.severity.label(), alert.title);
        println!("  {}", alert.description);
    }
}
