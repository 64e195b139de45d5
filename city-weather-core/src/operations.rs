//! Operations mediating between the HTTP layer, storage and the providers.

use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::{
    error::{ServiceError, ServiceResult},
    model::{City, WeatherReading, normalize_city_name},
    provider::{Geocoder, WeatherProvider},
    storage::{Database, UpsertOutcome},
};

/// Which stored cities a request refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitySelection {
    Names(Vec<String>),
    Quantity(usize),
    All,
}

impl CitySelection {
    /// Build a selection from the `city_names` / `cities_quantity` query
    /// parameters. The two are mutually exclusive; a quantity of zero and an
    /// empty name list count as absent.
    pub fn from_params(
        city_names: Option<&str>,
        cities_quantity: Option<usize>,
    ) -> ServiceResult<Self> {
        let names: Vec<String> = city_names
            .map(|raw| {
                raw.split(',')
                    .map(normalize_city_name)
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let quantity = cities_quantity.filter(|q| *q > 0);

        match (names.is_empty(), quantity) {
            (false, Some(_)) => Err(ServiceError::invalid_request(
                "Error: Only one of 'cities_quantity' or 'city_names' should be provided. \
                 Please choose only one.",
            )),
            (true, Some(q)) => Ok(CitySelection::Quantity(q)),
            (false, None) => Ok(CitySelection::Names(names)),
            (true, None) => Ok(CitySelection::All),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CityStatus {
    Created,
    Updated,
    /// The geocoder failed or had no match; nothing was written.
    Skipped,
}

impl From<UpsertOutcome> for CityStatus {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Created => CityStatus::Created,
            UpsertOutcome::Updated => CityStatus::Updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityResult {
    pub name: String,
    pub status: CityStatus,
}

#[derive(Debug, Clone)]
pub struct CityOperations {
    db: Database,
    geocoder: Arc<dyn Geocoder>,
}

impl CityOperations {
    pub fn new(db: Database, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { db, geocoder }
    }

    /// Geocode each name and create or update its row.
    ///
    /// Provider failures skip the city; database failures abort the request.
    pub async fn create_cities(&self, names: &[String]) -> ServiceResult<Vec<CityResult>> {
        let mut results = Vec::with_capacity(names.len());

        for raw in names {
            let name = normalize_city_name(raw);
            if name.is_empty() {
                continue;
            }

            let coords = match self.geocoder.locate(&name).await {
                Ok(Some(coords)) => coords,
                Ok(None) => {
                    tracing::warn!(city = %name, "No geocoding results found");
                    results.push(CityResult { name, status: CityStatus::Skipped });
                    continue;
                }
                Err(e) => {
                    tracing::error!(city = %name, error = ?e, "Geocoding request failed");
                    results.push(CityResult { name, status: CityStatus::Skipped });
                    continue;
                }
            };

            let outcome = self.db.upsert_city(&name, coords).map_err(|e| {
                tracing::error!(city = %name, error = %e, "Failed to store city");
                ServiceError::from(e)
            })?;

            tracing::info!(city = %name, ?outcome, "Stored city");
            results.push(CityResult { name, status: outcome.into() });
        }

        Ok(results)
    }

    /// Resolve a selection to stored cities. An empty result is `NotFound`.
    pub fn get_cities(&self, selection: &CitySelection) -> ServiceResult<Vec<City>> {
        let cities = match selection {
            CitySelection::Quantity(quantity) => self.db.list_limited(*quantity),
            CitySelection::Names(names) => self.db.list_by_names(names),
            CitySelection::All => self.db.list_all(),
        }
        .map_err(|e| {
            tracing::error!(error = %e, "Database error while fetching cities");
            ServiceError::from(e)
        })?;

        if cities.is_empty() {
            return Err(ServiceError::not_found("No cities found in the database."));
        }

        Ok(cities)
    }
}

#[derive(Debug, Clone)]
pub struct WeatherOperations {
    cities: CityOperations,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherOperations {
    pub fn new(cities: CityOperations, provider: Arc<dyn WeatherProvider>) -> Self {
        Self { cities, provider }
    }

    /// Fetch current weather for the selected cities, one concurrent request
    /// per city. Cities whose request fails or returns no data are dropped.
    /// Readings come back in completion order.
    pub async fn fetch_weather_for_cities(
        &self,
        selection: &CitySelection,
    ) -> ServiceResult<Vec<WeatherReading>> {
        let cities = self.cities.get_cities(selection)?;
        let requested = cities.len();

        let mut tasks = JoinSet::new();
        for city in cities {
            let provider = Arc::clone(&self.provider);
            tasks.spawn(async move {
                let result = provider.current_weather(&city).await;
                (city.name, result)
            });
        }

        let mut readings = Vec::with_capacity(requested);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(Some(reading)))) => readings.push(reading),
                Ok((name, Ok(None))) => {
                    tracing::warn!(city = %name, "No weather data found");
                }
                Ok((name, Err(e))) => {
                    tracing::error!(city = %name, error = ?e, "Weather request failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Weather task did not complete");
                }
            }
        }

        if readings.is_empty() {
            return Err(ServiceError::Upstream(
                "An error occurred while fetching weather data for cities.".to_string(),
            ));
        }

        tracing::debug!(requested, received = readings.len(), "Collected weather readings");
        Ok(readings)
    }
}
