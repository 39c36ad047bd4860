//! Display-unit conversion.
//!
//! Stored weather is always canonical (°C, km/h, hPa, 24-hour timestamps). The
//! converter reads a [`Weather`] and produces a [`DisplayWeather`]; since the
//! output type is never accepted as input, a value can only ever be converted
//! once, from its canonical form.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::{HOURLY_TIME_FORMAT, SavedCity, Weather};

/// hPa to inHg factor. The only place this constant lives.
pub const HPA_TO_INHG: f64 = 0.0295299830714;
const KMH_PER_MS: f64 = 3.6;
const KMH_PER_MPH: f64 = 1.609344;

const TIME_AM_PM_FORMAT: &str = "%Y-%m-%d %I:%M %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindSpeedUnit {
    #[default]
    KilometersPerHour,
    MetersPerSecond,
    MilesPerHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureUnit {
    #[default]
    Hectopascal,
    InchOfMercury,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    #[default]
    TwentyFourHour,
    AmPm,
}

/// User's display-unit selection. `None` fields mean "not chosen", treated like the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<TemperatureUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<WindSpeedUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<PressureUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format: Option<TimeFormat>,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

impl WindSpeedUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            WindSpeedUnit::KilometersPerHour => "km/h",
            WindSpeedUnit::MetersPerSecond => "m/s",
            WindSpeedUnit::MilesPerHour => "mph",
        }
    }
}

impl PressureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            PressureUnit::Hectopascal => "hPa",
            PressureUnit::InchOfMercury => "inHg",
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(format!("Unknown temperature unit '{s}'. Use celsius or fahrenheit.")),
        }
    }
}

impl FromStr for WindSpeedUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kmh" | "km/h" => Ok(WindSpeedUnit::KilometersPerHour),
            "ms" | "m/s" => Ok(WindSpeedUnit::MetersPerSecond),
            "mph" => Ok(WindSpeedUnit::MilesPerHour),
            _ => Err(format!("Unknown wind speed unit '{s}'. Use kmh, ms or mph.")),
        }
    }
}

impl FromStr for PressureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hpa" => Ok(PressureUnit::Hectopascal),
            "inhg" => Ok(PressureUnit::InchOfMercury),
            _ => Err(format!("Unknown pressure unit '{s}'. Use hpa or inhg.")),
        }
    }
}

impl FromStr for TimeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "24" | "24h" => Ok(TimeFormat::TwentyFourHour),
            "12" | "12h" | "am-pm" | "ampm" => Ok(TimeFormat::AmPm),
            _ => Err(format!("Unknown time format '{s}'. Use 24h or am-pm.")),
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / KMH_PER_MS
}

pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh / KMH_PER_MPH
}

pub fn hpa_to_inhg(hpa: f64) -> f64 {
    hpa * HPA_TO_INHG
}

/// Reformats a canonical hourly timestamp as `yyyy-mm-dd hh:mm AM`. `None` if it does not parse.
pub fn to_am_pm(time: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(time, HOURLY_TIME_FORMAT)
        .ok()
        .map(|dt| dt.format(TIME_AM_PM_FORMAT).to_string())
}

/// Resolved units a [`DisplayWeather`] is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayUnits {
    pub temperature: TemperatureUnit,
    pub wind_speed: WindSpeedUnit,
    pub pressure: PressureUnit,
    pub time_format: TimeFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayHourly {
    pub time: String,
    pub temperature: f64,
    pub wind_speed: f64,
    pub pressure: f64,
    pub weather_code: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayDaily {
    pub time: String,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub wind_speed: f64,
    pub pressure: Option<f64>,
    pub weather_code: i32,
}

/// Weather ready for display. Deliberately not convertible back into [`Weather`].
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayWeather {
    pub units: DisplayUnits,
    pub daily: Vec<DisplayDaily>,
    pub hourly: Vec<DisplayHourly>,
}

/// Converts canonical weather into the preferred display units.
///
/// Absent preferences, or a field left at its default, leave the matching
/// values untouched. Hourly timestamps that do not parse are passed through.
pub fn convert_weather(weather: &Weather, preferences: Option<&UnitPreferences>) -> DisplayWeather {
    let prefs = preferences.copied().unwrap_or_default();
    let units = DisplayUnits {
        temperature: prefs.temperature.unwrap_or_default(),
        wind_speed: prefs.wind_speed.unwrap_or_default(),
        pressure: prefs.pressure.unwrap_or_default(),
        time_format: prefs.time_format.unwrap_or_default(),
    };

    let temperature = |c: f64| match units.temperature {
        TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(c),
        TemperatureUnit::Celsius => c,
    };
    let wind = |kmh: f64| match units.wind_speed {
        WindSpeedUnit::MetersPerSecond => kmh_to_ms(kmh),
        WindSpeedUnit::MilesPerHour => kmh_to_mph(kmh),
        WindSpeedUnit::KilometersPerHour => kmh,
    };
    let pressure = |hpa: f64| match units.pressure {
        PressureUnit::InchOfMercury => hpa_to_inhg(hpa),
        PressureUnit::Hectopascal => hpa,
    };
    let time = |t: &str| match units.time_format {
        TimeFormat::AmPm => to_am_pm(t).unwrap_or_else(|| t.to_string()),
        TimeFormat::TwentyFourHour => t.to_string(),
    };

    DisplayWeather {
        units,
        daily: weather
            .daily
            .iter()
            .map(|d| DisplayDaily {
                time: d.time.clone(),
                temperature_max: temperature(d.temperature_max),
                temperature_min: temperature(d.temperature_min),
                wind_speed: wind(d.wind_speed),
                pressure: d.pressure.map(pressure),
                weather_code: d.weather_code,
            })
            .collect(),
        hourly: weather
            .hourly
            .iter()
            .map(|h| DisplayHourly {
                time: time(&h.time),
                temperature: temperature(h.temperature),
                wind_speed: wind(h.wind_speed),
                pressure: pressure(h.pressure),
                weather_code: h.weather_code,
            })
            .collect(),
    }
}

/// Temperature conversion for list views.
pub fn convert_saved_cities(cities: &[SavedCity], unit: Option<TemperatureUnit>) -> Vec<SavedCity> {
    cities
        .iter()
        .map(|city| SavedCity {
            temperature: match unit {
                Some(TemperatureUnit::Fahrenheit) => celsius_to_fahrenheit(city.temperature),
                _ => city.temperature,
            },
            ..city.clone()
        })
        .collect()
}
