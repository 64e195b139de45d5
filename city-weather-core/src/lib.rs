//! Core library for the city weather service.
//!
//! This crate defines:
//! - Configuration loading (file, environment)
//! - City storage on SQLite
//! - Geocoding and weather provider connectors
//! - The operations used by the HTTP layer
//! - Processing of readings into JSON rows, CSV and bar charts
//!
//! It is used by `city-weather-server`, but has no dependency on any HTTP framework.

pub mod chart;
pub mod config;
pub mod error;
pub mod model;
pub mod operations;
pub mod process;
pub mod provider;
pub mod storage;

pub use chart::BarChart;
pub use config::{
    Config, DatabaseConfig, GeocodingConfig, ProvidersConfig, ServerConfig, WeatherConfig,
};
pub use error::{ServiceError, ServiceResult};
pub use model::{City, Coordinates, DataField, WeatherReading, normalize_city_name};
pub use operations::{CityOperations, CityResult, CitySelection, CityStatus, WeatherOperations};
pub use process::{ProcessedReading, process_weather_data, to_csv};
pub use provider::{Geocoder, WeatherProvider};
pub use storage::{Database, PREDEFINED_CITIES, UpsertOutcome};
