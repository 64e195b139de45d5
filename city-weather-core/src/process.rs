//! Unit conversion, ranking and CSV export of weather readings.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::cmp::Ordering;

use crate::{
    error::{ServiceError, ServiceResult},
    model::{DataField, WeatherReading},
};

const MPH_PER_MPS: f64 = 2.23694;

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps * MPH_PER_MPS
}

/// One row of the processed weather table. Field names double as JSON keys
/// and CSV headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedReading {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Temperature (C)")]
    pub temperature_c: f64,
    #[serde(rename = "Wind Speed (m/s)")]
    pub wind_speed_mps: f64,
    #[serde(rename = "Humidity (%)")]
    pub humidity_pct: Option<f64>,
    #[serde(rename = "Temperature (F)")]
    pub temperature_f: f64,
    #[serde(rename = "Wind Speed (mph)")]
    pub wind_speed_mph: f64,
    #[serde(rename = "Observed At")]
    pub observed_at: Option<NaiveDateTime>,
}

impl ProcessedReading {
    pub fn value(&self, field: DataField) -> Option<f64> {
        match field {
            DataField::TemperatureC => Some(self.temperature_c),
            DataField::TemperatureF => Some(self.temperature_f),
            DataField::Humidity => self.humidity_pct,
            DataField::WindSpeedMps => Some(self.wind_speed_mps),
            DataField::WindSpeedMph => Some(self.wind_speed_mph),
        }
        .filter(|v| !v.is_nan())
    }
}

impl From<WeatherReading> for ProcessedReading {
    fn from(reading: WeatherReading) -> Self {
        Self {
            temperature_f: celsius_to_fahrenheit(reading.temperature_c),
            wind_speed_mph: mps_to_mph(reading.wind_speed_mps),
            city: reading.city,
            temperature_c: reading.temperature_c,
            wind_speed_mps: reading.wind_speed_mps,
            humidity_pct: reading.humidity_pct,
            observed_at: reading.observed_at,
        }
    }
}

/// Add the derived columns and sort descending by `rank_by`.
///
/// Rows without a value for `rank_by` go last; ties keep their input order.
pub fn process_weather_data(
    readings: Vec<WeatherReading>,
    rank_by: DataField,
) -> Vec<ProcessedReading> {
    let mut rows: Vec<ProcessedReading> = readings.into_iter().map(Into::into).collect();

    rows.sort_by(|a, b| match (a.value(rank_by), b.value(rank_by)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    rows
}

/// Render rows as CSV with a header line.
pub fn to_csv(rows: &[ProcessedReading]) -> ServiceResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if rows.is_empty() {
        writer.write_record(CSV_HEADERS).map_err(csv_error)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }

    writer.into_inner().map_err(|e| ServiceError::Render(format!("Failed to flush CSV: {e}")))
}

const CSV_HEADERS: [&str; 7] = [
    "City",
    "Temperature (C)",
    "Wind Speed (m/s)",
    "Humidity (%)",
    "Temperature (F)",
    "Wind Speed (mph)",
    "Observed At",
];

fn csv_error(e: csv::Error) -> ServiceError {
    ServiceError::Render(format!("Failed to write CSV: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(city: &str, temperature_c: f64, humidity_pct: Option<f64>) -> WeatherReading {
        WeatherReading {
            city: city.to_string(),
            temperature_c,
            wind_speed_mps: 2.0,
            humidity_pct,
            observed_at: None,
        }
    }

    #[test]
    fn conversions_are_exact() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40.0);
        assert_eq!(celsius_to_fahrenheit(20.0), 68.0);
        assert_eq!(mps_to_mph(1.0), 2.23694);
        assert_eq!(mps_to_mph(0.0), 0.0);
    }

    #[test]
    fn processed_rows_carry_derived_columns() {
        let rows = process_weather_data(vec![reading("Paris", 10.0, Some(70.0))], DataField::TemperatureC);
        assert_eq!(rows[0].temperature_f, 50.0);
        assert_eq!(rows[0].wind_speed_mph, 2.0 * 2.23694);
    }

    #[test]
    fn ranking_by_temperature_is_descending() {
        let rows = process_weather_data(
            vec![reading("Oslo", 10.0, None), reading("Rome", 20.0, None)],
            DataField::TemperatureC,
        );
        let cities: Vec<&str> = rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, ["Rome", "Oslo"]);
    }

    #[test]
    fn missing_values_sort_last() {
        let rows = process_weather_data(
            vec![
                reading("A", 1.0, None),
                reading("B", 2.0, Some(40.0)),
                reading("C", 3.0, Some(90.0)),
            ],
            DataField::Humidity,
        );
        let cities: Vec<&str> = rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, ["C", "B", "A"]);
    }

    #[test]
    fn json_uses_column_names() {
        let rows = process_weather_data(vec![reading("Paris", 10.0, None)], DataField::TemperatureC);
        let value = serde_json::to_value(&rows[0]).unwrap();

        assert_eq!(value["City"], "Paris");
        assert_eq!(value["Temperature (F)"], 50.0);
        assert!(value["Humidity (%)"].is_null());
    }

    #[test]
    fn csv_has_header_and_rows_in_rank_order() {
        let rows = process_weather_data(
            vec![reading("Oslo", 10.0, Some(80.0)), reading("Rome", 20.0, None)],
            DataField::TemperatureC,
        );
        let csv = String::from_utf8(to_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], CSV_HEADERS.join(","));
        assert!(lines[1].starts_with("Rome,20.0,2.0,,68.0,"));
        assert!(lines[2].starts_with("Oslo,10.0,2.0,80.0,50.0,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn csv_of_no_rows_is_just_the_header() {
        let csv = String::from_utf8(to_csv(&[]).unwrap()).unwrap();
        assert_eq!(csv.trim_end(), CSV_HEADERS.join(","));
    }
}
