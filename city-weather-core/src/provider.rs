use crate::{
    City, Config, Coordinates, WeatherReading,
    provider::{nominatim::NominatimGeocoder, openmeteo::OpenMeteoProvider},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod nominatim;
pub mod openmeteo;

/// Resolves a place name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `Ok(None)` means the provider answered but knows no such place.
    async fn locate(&self, name: &str) -> anyhow::Result<Option<Coordinates>>;
}

/// Fetches current conditions for a stored city.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// `Ok(None)` means the provider answered without current data.
    async fn current_weather(&self, city: &City) -> anyhow::Result<Option<WeatherReading>>;
}

/// Construct the geocoder described by `config.providers.geocoding`.
pub fn geocoder_from_config(config: &Config) -> anyhow::Result<Arc<dyn Geocoder>> {
    let provider = &config.providers.geocoding;
    let geocoder = NominatimGeocoder::new(&provider.base_url, provider.user_agent.as_deref())?;
    Ok(Arc::new(geocoder))
}

/// Construct the weather provider described by `config.providers.weather`.
pub fn weather_provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider = &config.providers.weather;
    let weather = OpenMeteoProvider::new(&provider.base_url, provider.user_agent.as_deref())?;
    Ok(Arc::new(weather))
}

pub(crate) fn build_http_client(user_agent: Option<&str>) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent);
    }
    builder.build().map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_build_from_default_config() {
        let cfg = Config::default();
        assert!(geocoder_from_config(&cfg).is_ok());
        assert!(weather_provider_from_config(&cfg).is_ok());
    }

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("oops"), "oops");
    }

    #[test]
    fn truncate_body_cuts_on_char_boundary() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }
}
