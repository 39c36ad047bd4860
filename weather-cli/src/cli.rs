use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Select, Text};
use weather_core::{
    Config, Coordinate, LocationId, PositionSource, Services, Synced, convert_saved_cities,
    convert_weather,
    model::WeatherType,
    units::{PressureUnit, TemperatureUnit, TimeFormat, WindSpeedUnit},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Offline-first weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the geocoding API key and position source.
    Configure,

    /// Look up the coordinate of a city.
    Coordinate {
        city: String,

        /// Ask the geocoding service before reading the local store.
        #[arg(long)]
        refresh: bool,
    },

    /// Look up the city at a coordinate.
    City {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,

        #[arg(long)]
        refresh: bool,
    },

    /// Suggest places matching a query.
    Search { query: String },

    /// Save the first place matching a query.
    Add { query: String },

    /// Update the current location from the configured position source.
    Here,

    /// List saved locations with their latest temperature.
    List,

    /// Remove a saved location.
    Remove { id: LocationId },

    /// Refresh forecasts, for one location or all of them.
    Refresh { id: Option<LocationId> },

    /// Show the stored forecast of a location.
    Show {
        id: LocationId,

        /// Number of hourly rows to print.
        #[arg(long, default_value_t = 12)]
        hours: usize,
    },

    /// Show or change display units.
    Units(UnitsArgs),
}

#[derive(Debug, Args)]
pub struct UnitsArgs {
    /// celsius | fahrenheit
    #[arg(long)]
    temperature: Option<TemperatureUnit>,
    /// kmh | ms | mph
    #[arg(long)]
    wind: Option<WindSpeedUnit>,
    /// hpa | inhg
    #[arg(long)]
    pressure: Option<PressureUnit>,
    /// 24h | am-pm
    #[arg(long)]
    time: Option<TimeFormat>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        let prefs = config.units;

        match self.command {
            Command::Configure => configure(&mut config)?,
            Command::Units(args) => units(&mut config, args)?,
            Command::Coordinate { city, refresh } => {
                let repo = Services::open(config)?.location_repository()?;
                let synced = repo.get_coordinate_by_city(&city, refresh).await?;
                warn_if_stale(&synced);
                println!("{city}: {}", synced.value);
            }
            Command::City { latitude, longitude, refresh } => {
                let coordinate = Coordinate::new(latitude, longitude);
                let repo = Services::open(config)?.location_repository()?;
                let synced = repo.get_city_by_coordinate(coordinate, refresh).await?;
                warn_if_stale(&synced);
                println!("{coordinate}: {}", synced.value);
            }
            Command::Search { query } => {
                let repo = Services::open(config)?.location_repository()?;
                let places = repo.search_places(&query).await?;
                if places.is_empty() {
                    println!("No places match '{query}'.");
                }
                for place in places {
                    println!(
                        "{} ({}) {}",
                        place.city,
                        place.coordinate,
                        place.time_zone.as_deref().unwrap_or("")
                    );
                }
            }
            Command::Add { query } => {
                let services = Services::open(config)?;
                let repo = services.location_repository()?;
                let place = repo
                    .search_places(&query)
                    .await?
                    .into_iter()
                    .next()
                    .with_context(|| format!("No places match '{query}'"))?;
                let saved = repo.save_place(place).await?;
                services.weather_repository()?.refresh_weather_of_location(saved.id).await?;
                println!("Saved #{} {} ({})", saved.id, saved.city, saved.coordinate);
            }
            Command::Here => {
                let services = Services::open(config)?;
                let saved = services.location_repository()?.update_current_location().await?;
                services.weather_repository()?.refresh_weather_of_location(saved.id).await?;
                println!("Current location: #{} {} ({})", saved.id, saved.city, saved.coordinate);
            }
            Command::List => {
                let repo = Services::open(config)?.weather_repository()?;
                let cities =
                    convert_saved_cities(&repo.get_saved_cities().await?, prefs.temperature);
                let symbol = prefs.temperature.unwrap_or_default().symbol();
                if cities.is_empty() {
                    println!(
                        "No saved locations with weather. \
                         Try `weather add <city>` or `weather refresh`."
                    );
                }
                for city in cities {
                    let marker = if city.is_current { "*" } else { " " };
                    println!(
                        "{marker} #{:<3} {:<24} {:>6.1}{symbol}  {}",
                        city.id,
                        city.city,
                        city.temperature,
                        city.condition.description()
                    );
                }
            }
            Command::Remove { id } => {
                Services::open(config)?.location_repository()?.delete_location(id).await?;
                println!("Location #{id} deleted.");
            }
            Command::Refresh { id: Some(id) } => {
                let repo = Services::open(config)?.weather_repository()?;
                repo.refresh_weather_of_location(id).await?;
                println!("Refreshed location #{id}.");
            }
            Command::Refresh { id: None } => {
                let repo = Services::open(config)?.weather_repository()?;
                let report = repo.refresh_weather_of_locations().await?;
                println!("Refreshed {} location(s).", report.refreshed.len());
                for failure in &report.failures {
                    eprintln!("  #{} {}: {}", failure.location_id, failure.city, failure.error);
                }
                if !report.is_complete() {
                    bail!("{} location(s) failed to refresh", report.failures.len());
                }
            }
            Command::Show { id, hours } => {
                let repo = Services::open(config)?.weather_repository()?;
                let detail = repo.get_location_with_weather(id).await?;
                let display = convert_weather(&detail.weather, Some(&prefs));
                let u = display.units;
                let (t, w, p) =
                    (u.temperature.symbol(), u.wind_speed.symbol(), u.pressure.symbol());

                let location = &detail.location;
                println!("{} ({}, {})", location.city, location.coordinate, location.time_zone);
                if detail.weather.is_empty() {
                    println!("No stored forecast. Run `weather refresh {id}`.");
                    return Ok(());
                }

                println!("\nDaily");
                for d in &display.daily {
                    let pressure =
                        d.pressure.map(|v| format!("{v:.2} {p}")).unwrap_or_else(|| "-".into());
                    println!(
                        "  {}  {:>6.1}{t} / {:>6.1}{t}  wind {:>5.1} {w}  {pressure}  {}",
                        d.time,
                        d.temperature_max,
                        d.temperature_min,
                        d.wind_speed,
                        WeatherType::from_wmo(d.weather_code).description()
                    );
                }

                println!("\nHourly");
                for h in display.hourly.iter().take(hours) {
                    println!(
                        "  {:<19}  {:>6.1}{t}  wind {:>5.1} {w}  {:.2} {p}  {}",
                        h.time,
                        h.temperature,
                        h.wind_speed,
                        h.pressure,
                        WeatherType::from_wmo(h.weather_code).description()
                    );
                }
            }
        }

        Ok(())
    }
}

fn warn_if_stale<T>(synced: &Synced<T>) {
    if let Some(err) = &synced.refresh_error {
        eprintln!("warning: refresh failed, showing stored value ({err})");
    }
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    let api_key = Text::new("Geocoding API key:")
        .with_initial_value(config.geocoding_api_key().unwrap_or(""))
        .prompt()?;
    config.set_geocoding_api_key(api_key.trim().to_string());

    let sources = vec![PositionSource::Off, PositionSource::Fixed, PositionSource::Ip];
    let source = Select::new("Position source:", sources).prompt()?;
    config.position.source = source;

    if source == PositionSource::Fixed {
        let latitude: f64 =
            Text::new("Latitude:").prompt()?.trim().parse().context("Invalid latitude")?;
        let longitude: f64 =
            Text::new("Longitude:").prompt()?.trim().parse().context("Invalid longitude")?;
        config.position.latitude = Some(latitude);
        config.position.longitude = Some(longitude);
    }

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

fn units(config: &mut Config, args: UnitsArgs) -> anyhow::Result<()> {
    let changed = args.temperature.is_some()
        || args.wind.is_some()
        || args.pressure.is_some()
        || args.time.is_some();

    let prefs = &mut config.units;
    prefs.temperature = args.temperature.or(prefs.temperature);
    prefs.wind_speed = args.wind.or(prefs.wind_speed);
    prefs.pressure = args.pressure.or(prefs.pressure);
    prefs.time_format = args.time.or(prefs.time_format);

    if changed {
        config.save()?;
    }

    let prefs = config.units;
    println!("temperature: {}", prefs.temperature.unwrap_or_default().symbol());
    println!("wind speed:  {}", prefs.wind_speed.unwrap_or_default().symbol());
    println!("pressure:    {}", prefs.pressure.unwrap_or_default().symbol());
    println!(
        "time format: {}",
        match prefs.time_format.unwrap_or_default() {
            TimeFormat::TwentyFourHour => "24h",
            TimeFormat::AmPm => "am-pm",
        }
    );
    Ok(())
}
