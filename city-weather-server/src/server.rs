use anyhow::{Context, Result};
use axum::{Router, middleware, routing::get};
use city_weather_core::{
    CityOperations, Config, Database, PREDEFINED_CITIES, WeatherOperations,
    provider::{geocoder_from_config, weather_provider_from_config},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{auth, handlers};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub cities: CityOperations,
    pub weather: WeatherOperations,
    pub api_key: Arc<str>,
}

impl AppState {
    /// Open the database, seed it if empty, and wire up the providers.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;

        let db = Database::open(&config.database.path).with_context(|| {
            format!("Failed to open database: {}", config.database.path.display())
        })?;
        db.seed_if_empty(PREDEFINED_CITIES).context("Failed to seed database")?;

        let cities = CityOperations::new(db, geocoder_from_config(config)?);
        let weather = WeatherOperations::new(cities.clone(), weather_provider_from_config(config)?);

        Ok(Self { cities, weather, api_key: Arc::from(api_key) })
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/cities", get(handlers::get_cities).post(handlers::create_cities))
        .route("/weather", get(handlers::get_weather))
        .route("/weather/", get(handlers::get_weather))
        .route("/download-csv", get(handlers::download_csv))
        .route("/download-csv/", get(handlers::download_csv))
        .route("/weather-visualization", get(handlers::weather_visualization))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state);

    let bind = config.server.bind.as_str();
    let listener =
        TcpListener::bind(bind).await.with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(address = %bind, "Serving city weather API");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
