use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::model::{City, WeatherReading};

use super::{WeatherProvider, build_http_client, truncate_body};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m";

/// Current conditions from the Open-Meteo forecast API (no API key needed).
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(base_url: &str, user_agent: Option<&str>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: build_http_client(user_agent)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: Option<String>,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    current: Option<OmCurrent>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn current_weather(&self, city: &City) -> Result<Option<WeatherReading>> {
        let url = format!("{}/v1/forecast", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", city.latitude.to_string()),
                ("longitude", city.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("wind_speed_unit", "ms".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo (current weather)")?;

        let status = res.status();
        let body =
            res.text().await.context("Failed to read Open-Meteo current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo request for {} failed with status {}: {}",
                city.name,
                status,
                truncate_body(&body),
            ));
        }

        let parsed: OmForecastResponse =
            serde_json::from_str(&body).context("Failed to parse Open-Meteo current JSON")?;

        let Some(current) = parsed.current else {
            return Ok(None);
        };

        let (Some(temperature_c), Some(wind_speed_mps)) =
            (current.temperature_2m, current.wind_speed_10m)
        else {
            return Ok(None);
        };

        let observed_at = current.time.as_deref().and_then(parse_observation_time);

        Ok(Some(WeatherReading {
            city: city.name.clone(),
            temperature_c,
            wind_speed_mps,
            humidity_pct: current.relative_humidity_2m,
            observed_at,
        }))
    }
}

// Open-Meteo uses ISO 8601 local times without seconds, e.g. "2024-05-01T13:45".
fn parse_observation_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}
