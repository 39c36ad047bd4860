use serde::{Deserialize, Serialize};

/// Canonical hourly timestamp format, as delivered by the forecast API.
pub const HOURLY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
/// Canonical daily date format.
pub const DAILY_DATE_FORMAT: &str = "%Y-%m-%d";

const UNIFY_SCALE: f64 = 10_000.0;

pub type LocationId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Rounds both axes to 4 decimal places so a GPS fix and a stored row compare equal.
    pub fn unified(self) -> Self {
        Self {
            latitude: (self.latitude * UNIFY_SCALE).round() / UNIFY_SCALE,
            longitude: (self.longitude * UNIFY_SCALE).round() / UNIFY_SCALE,
        }
    }

    /// Reverse-geocoding query key, `"lat+lon"`.
    pub fn as_query(&self) -> String {
        format!("{}+{}", self.latitude, self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A persisted location row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub city: String,
    pub coordinate: Coordinate,
    pub time_zone: String,
    pub is_current: bool,
    /// Created by a position fix and never saved explicitly. Only such rows
    /// are dropped when the device moves on.
    pub from_position: bool,
}

/// Location not yet written to the store. Upserts are keyed by the trimmed `city`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub city: String,
    pub coordinate: Coordinate,
    pub time_zone: String,
    pub is_current: bool,
    pub from_position: bool,
}

impl NewLocation {
    /// Time zone placeholder the forecast API resolves from the coordinate.
    pub const AUTO_TIME_ZONE: &'static str = "auto";

    pub fn new(city: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            city: city.into().trim().to_string(),
            coordinate: coordinate.unified(),
            time_zone: Self::AUTO_TIME_ZONE.to_string(),
            is_current: false,
            from_position: false,
        }
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn current(mut self) -> Self {
        self.is_current = true;
        self
    }

    /// Marks a row derived from a position fix rather than saved by the user.
    pub fn from_position(mut self) -> Self {
        self.from_position = true;
        self
    }
}

/// One geocoding hit, as offered in search suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub coordinate: Coordinate,
    pub time_zone: Option<String>,
}

impl From<Place> for NewLocation {
    fn from(place: Place) -> Self {
        let location = NewLocation::new(place.city, place.coordinate);
        match place.time_zone {
            Some(tz) => location.with_time_zone(tz),
            None => location,
        }
    }
}

/// Hourly forecast record in canonical units (°C, km/h, hPa).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub time: String,
    pub temperature: f64,
    pub wind_speed: f64,
    pub pressure: f64,
    pub weather_code: i32,
}

/// Daily forecast record in canonical units (°C, km/h, hPa).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub time: String,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub wind_speed: f64,
    /// Mean of the day's hourly readings.
    pub pressure: Option<f64>,
    pub weather_code: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub daily: Vec<DailyWeather>,
    pub hourly: Vec<HourlyWeather>,
}

impl Weather {
    pub fn is_empty(&self) -> bool {
        self.daily.is_empty() && self.hourly.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationWithWeather {
    pub location: Location,
    pub weather: Weather,
}

/// Summary row for list views.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCity {
    pub id: LocationId,
    pub city: String,
    pub coordinate: Coordinate,
    pub time_zone: String,
    pub is_current: bool,
    pub temperature: f64,
    pub condition: WeatherType,
}

impl SavedCity {
    /// Builds the summary from the first hourly record; `None` when no weather is stored.
    pub fn from_location(location: &Location, weather: &Weather) -> Option<Self> {
        let first = weather.hourly.first()?;
        Some(Self {
            id: location.id,
            city: location.city.clone(),
            coordinate: location.coordinate,
            time_zone: location.time_zone.clone(),
            is_current: location.is_current,
            temperature: first.temperature,
            condition: WeatherType::from_wmo(first.weather_code),
        })
    }
}

/// Weather condition categories mapped from WMO codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherType {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    FreezingDrizzle,
    Rain,
    FreezingRain,
    Snow,
    RainShowers,
    SnowShowers,
    Thunderstorm,
    Unknown,
}

impl WeatherType {
    /// See: <https://open-meteo.com/en/docs> for the WMO code table.
    pub fn from_wmo(code: i32) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::FreezingDrizzle,
            61 | 63 | 65 => Self::Rain,
            66 | 67 => Self::FreezingRain,
            71 | 73 | 75 | 77 => Self::Snow,
            80..=82 => Self::RainShowers,
            85 | 86 => Self::SnowShowers,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ClearSky => "Clear sky",
            Self::MainlyClear => "Mainly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::FreezingDrizzle => "Freezing drizzle",
            Self::Rain => "Rain",
            Self::FreezingRain => "Freezing rain",
            Self::Snow => "Snow",
            Self::RainShowers => "Rain showers",
            Self::SnowShowers => "Snow showers",
            Self::Thunderstorm => "Thunderstorm",
            Self::Unknown => "Unknown",
        }
    }
}
