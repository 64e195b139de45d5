use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::header,
    response::{IntoResponse, Response},
};
use city_weather_core::{
    BarChart, CityResult, CitySelection, CityStatus, DataField, ServiceError, process_weather_data,
    to_csv,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{ApiError, ApiResult},
    server::AppState,
};

const CSV_FILE_NAME: &str = "weather_data.csv";

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city_names: Option<String>,
    pub cities_quantity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    #[serde(default)]
    pub rank_by: DataField,
    pub city_names: Option<String>,
    pub cities_quantity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct VisualizationQuery {
    pub vizualize_by: DataField,
    pub city_names: Option<String>,
    pub cities_quantity: Option<usize>,
}

pub async fn health() -> &'static str {
    "OK"
}

/// `GET /cities`
pub async fn get_cities(
    State(state): State<AppState>,
    query: Result<Query<CityQuery>, QueryRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Query(query) = query?;
    let selection =
        CitySelection::from_params(query.city_names.as_deref(), query.cities_quantity)?;
    let cities = state.cities.get_cities(&selection)?;

    Ok(Json(json!({ "cities": cities })))
}

/// `POST /cities` with a JSON array of names.
pub async fn create_cities(
    State(state): State<AppState>,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(city_names) = body?;
    if city_names.iter().all(|name| name.trim().is_empty()) {
        return Err(ServiceError::invalid_request("No city names provided.").into());
    }

    let results: Vec<CityResult> = state.cities.create_cities(&city_names).await?;

    Ok(Json(json!({
        "message": create_message(&results),
        "results": results,
    })))
}

fn create_message(results: &[CityResult]) -> String {
    let (skipped, stored): (Vec<&CityResult>, Vec<&CityResult>) =
        results.iter().partition(|r| r.status == CityStatus::Skipped);
    let stored: Vec<&str> = stored.iter().map(|r| r.name.as_str()).collect();
    let skipped: Vec<&str> = skipped.iter().map(|r| r.name.as_str()).collect();

    match (stored.is_empty(), skipped.is_empty()) {
        (false, true) => format!("Cities {stored:?} were successfully created/updated"),
        (false, false) => format!(
            "Cities {stored:?} were successfully created/updated; could not locate {skipped:?}"
        ),
        (true, _) => format!("No cities were created or updated; could not locate {skipped:?}"),
    }
}

/// `GET /weather/`
pub async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Query(query) = query?;
    let selection =
        CitySelection::from_params(query.city_names.as_deref(), query.cities_quantity)?;
    let readings = state.weather.fetch_weather_for_cities(&selection).await?;
    let rows = process_weather_data(readings, query.rank_by);

    Ok(Json(json!({ "weather_data": rows })))
}

/// `GET /download-csv/`
pub async fn download_csv(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let selection =
        CitySelection::from_params(query.city_names.as_deref(), query.cities_quantity)?;
    let readings = state.weather.fetch_weather_for_cities(&selection).await?;
    let rows = process_weather_data(readings, query.rank_by);
    let csv = to_csv(&rows)?;

    let disposition = format!("attachment; filename=\"{CSV_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// `GET /weather-visualization`
pub async fn weather_visualization(
    State(state): State<AppState>,
    query: Result<Query<VisualizationQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let selection =
        CitySelection::from_params(query.city_names.as_deref(), query.cities_quantity)?;
    let readings = state.weather.fetch_weather_for_cities(&selection).await?;
    let rows = process_weather_data(readings, DataField::default());
    let chart = BarChart::from_records(&rows, query.vizualize_by)?;

    let png = tokio::task::spawn_blocking(move || chart.render_png())
        .await
        .map_err(|e| ApiError::from(ServiceError::Render(e.to_string())))??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, status: CityStatus) -> CityResult {
        CityResult { name: name.to_string(), status }
    }

    #[test]
    fn message_lists_stored_cities() {
        let results = [result("Lisbon", CityStatus::Created), result("Paris", CityStatus::Updated)];
        assert_eq!(
            create_message(&results),
            r#"Cities ["Lisbon", "Paris"] were successfully created/updated"#
        );
    }

    #[test]
    fn message_mentions_skipped_cities() {
        let results =
            [result("Lisbon", CityStatus::Created), result("Atlantis", CityStatus::Skipped)];
        assert_eq!(
            create_message(&results),
            r#"Cities ["Lisbon"] were successfully created/updated; could not locate ["Atlantis"]"#
        );
    }

    #[test]
    fn message_when_nothing_was_stored() {
        let results = [result("Atlantis", CityStatus::Skipped)];
        assert_eq!(
            create_message(&results),
            r#"No cities were created or updated; could not locate ["Atlantis"]"#
        );
    }
}
