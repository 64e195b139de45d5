use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::Coordinates;

use super::{Geocoder, build_http_client, truncate_body};

/// Forward geocoding through the OpenStreetMap Nominatim search API.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: Option<&str>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: build_http_client(user_agent)?,
        })
    }
}

// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NmPlace {
    lat: String,
    lon: String,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn locate(&self, name: &str) -> Result<Option<Coordinates>> {
        let url = format!("{}/search", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("q", name), ("format", "json")])
            .send()
            .await
            .context("Failed to send request to Nominatim (search)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Nominatim search response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Nominatim search for '{}' failed with status {}: {}",
                name,
                status,
                truncate_body(&body),
            ));
        }

        let places: Vec<NmPlace> =
            serde_json::from_str(&body).context("Failed to parse Nominatim search JSON")?;

        let Some(place) = places.first() else {
            return Ok(None);
        };

        let latitude: f64 = place
            .lat
            .parse()
            .with_context(|| format!("Nominatim returned invalid latitude '{}'", place.lat))?;
        let longitude: f64 = place
            .lon
            .parse()
            .with_context(|| format!("Nominatim returned invalid longitude '{}'", place.lon))?;

        tracing::info!(city = name, latitude, longitude, "Resolved city coordinates");

        Ok(Some(Coordinates::new(latitude, longitude)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn locate_returns_first_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Lisbon"))
            .and(query_param("format", "json"))
            .and(header("user-agent", "city-weather-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "lat": "38.7077507", "lon": "-9.1365919", "display_name": "Lisboa, Portugal" },
                { "lat": "0.0", "lon": "0.0", "display_name": "Somewhere else" }
            ])))
            .mount(&mock_server)
            .await;

        let geocoder =
            NominatimGeocoder::new(&mock_server.uri(), Some("city-weather-tests")).unwrap();
        let coords = geocoder.locate("Lisbon").await.unwrap().expect("coordinates");

        assert_eq!(coords, Coordinates::new(38.7077507, -9.1365919));
    }

    #[tokio::test]
    async fn locate_returns_none_for_empty_results() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        let geocoder = NominatimGeocoder::new(&mock_server.uri(), None).unwrap();
        assert!(geocoder.locate("Atlantis").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn locate_errors_on_server_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .mount(&mock_server)
            .await;

        let geocoder = NominatimGeocoder::new(&mock_server.uri(), None).unwrap();
        let err = geocoder.locate("Paris").await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("try later"));
    }

    #[tokio::test]
    async fn locate_errors_on_unparseable_coordinates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "lat": "north", "lon": "1.0" }])),
            )
            .mount(&mock_server)
            .await;

        let geocoder = NominatimGeocoder::new(&mock_server.uri(), None).unwrap();
        let err = geocoder.locate("Oslo").await.unwrap_err();
        assert!(err.to_string().contains("invalid latitude"));
    }
}
