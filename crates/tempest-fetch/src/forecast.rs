//! Wire types for the vendor forecast endpoint

use serde::Deserialize;

/// Station-level conditions at request time.
///
/// The vendor omits any field it has no reading for, so everything here is
/// optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentConditions {
    pub timestamp: Option<i64>,
    pub air_temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub wind_avg: Option<f64>,
    pub wind_direction: Option<f64>,
    pub station_pressure: Option<f64>,
    pub pressure_trend: Option<String>,
    pub uv: Option<f64>,
    pub brightness: Option<f64>,
    pub conditions: Option<String>,
    pub icon: Option<String>,
}

/// One calendar day of the forecast outlook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyForecast {
    pub day_num: Option<u32>,
    pub month_num: Option<u32>,
    pub conditions: Option<String>,
    pub icon: Option<String>,
    pub air_temp_high: Option<f64>,
    pub air_temp_low: Option<f64>,
    pub precip_probability: Option<f64>,
    pub precip_type: Option<String>,
    pub sunrise: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastOutlook {
    #[serde(default)]
    pub daily: Vec<DailyForecast>,
}

/// Full forecast response: current conditions plus the daily outlook.
///
/// `current_conditions` can be absent in an otherwise valid response; the
/// client logs that rather than failing the call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastBundle {
    #[serde(default)]
    pub current_conditions: Option<CurrentConditions>,
    #[serde(default)]
    pub forecast: ForecastOutlook,
}
