//! Open-Meteo daily forecast for the configured location.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Today's forecast, reduced to what the briefing needs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyWeather {
    pub description: String,
    pub code: i64,
    pub tmax_c: i64,
    pub tmin_c: i64,
    pub rain_mm: f64,
    pub wind_kmh: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    daily: Daily,
}

#[derive(Debug, Deserialize)]
struct Daily {
    time: Vec<String>,
    weathercode: Vec<i64>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    precipitation_sum: Vec<f64>,
    windspeed_10m_max: Option<Vec<f64>>,
}

/// WMO weather interpretation codes.
fn describe_code(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow",
        73 => "Moderate snow",
        75 => "Heavy snow",
        77 => "Snow grains",
        80 => "Slight showers",
        81 => "Moderate showers",
        82 => "Violent showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Weather",
    }
}

fn pick_today(f: &Forecast, today: NaiveDate) -> Option<DailyWeather> {
    let today_str = today.format("%Y-%m-%d").to_string();
    let idx = f.daily.time.iter().position(|d| *d == today_str)?;
    let code = *f.daily.weathercode.get(idx)?;
    Some(DailyWeather {
        description: describe_code(code).to_string(),
        code,
        tmax_c: f.daily.temperature_2m_max.get(idx)?.round() as i64,
        tmin_c: f.daily.temperature_2m_min.get(idx)?.round() as i64,
        rain_mm: (f.daily.precipitation_sum.get(idx)? * 10.0).round() / 10.0,
        wind_kmh: f
            .daily
            .windspeed_10m_max
            .as_ref()
            .and_then(|w| w.get(idx))
            .map(|v| v.round() as i64),
    })
}

/// Fetch today's forecast; any failure degrades to `None`.
///
/// The request pins `timezone=UTC`, so the daily rows are labeled with UTC
/// dates; the lookup date is derived from `now` in UTC too. Deriving it
/// from a local offset would miss the row around the local/UTC midnight
/// gap.
pub async fn fetch(
    client: &reqwest::Client,
    latitude: f64,
    longitude: f64,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<DailyWeather> {
    let today = now.date_naive();
    let url = format!(
        "https://api.open-meteo.com/v1/forecast?latitude={latitude}&longitude={longitude}\
         &daily=weathercode,temperature_2m_max,temperature_2m_min,precipitation_sum,windspeed_10m_max\
         &timezone=UTC"
    );
    let forecast: Forecast = match client.get(&url).send().await {
        Ok(resp) => match resp.error_for_status() {
            Ok(resp) => match resp.json().await {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(error = ?e, "weather body parse failed");
                    return None;
                }
            },
            Err(e) => {
                tracing::warn!(error = ?e, "weather request rejected");
                return None;
            }
        },
        Err(e) => {
            tracing::warn!(error = ?e, "weather request failed");
            return None;
        }
    };
    pick_today(&forecast, today)
}
