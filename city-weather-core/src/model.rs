use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// A stored city row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Current conditions for one city, as returned by a weather provider.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub city: String,
    pub temperature_c: f64,
    pub wind_speed_mps: f64,
    pub humidity_pct: Option<f64>,
    pub observed_at: Option<NaiveDateTime>,
}

/// Columns of the processed weather table that can be ranked or charted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum DataField {
    #[default]
    #[serde(rename = "Temperature (C)")]
    TemperatureC,
    #[serde(rename = "Temperature (F)")]
    TemperatureF,
    #[serde(rename = "Humidity (%)")]
    Humidity,
    #[serde(rename = "Wind Speed (m/s)")]
    WindSpeedMps,
    #[serde(rename = "Wind Speed (mph)")]
    WindSpeedMph,
}

impl DataField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataField::TemperatureC => "Temperature (C)",
            DataField::TemperatureF => "Temperature (F)",
            DataField::Humidity => "Humidity (%)",
            DataField::WindSpeedMps => "Wind Speed (m/s)",
            DataField::WindSpeedMph => "Wind Speed (mph)",
        }
    }

    pub const fn all() -> &'static [DataField] {
        &[
            DataField::TemperatureC,
            DataField::TemperatureF,
            DataField::Humidity,
            DataField::WindSpeedMps,
            DataField::WindSpeedMph,
        ]
    }
}

impl std::fmt::Display for DataField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DataField {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();

        DataField::all()
            .iter()
            .copied()
            .find(|field| field.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let supported: Vec<&str> = DataField::all().iter().map(DataField::as_str).collect();
                anyhow::anyhow!(
                    "Unknown field '{value}'. Supported fields: {}.",
                    supported.join(", ")
                )
            })
    }
}

impl TryFrom<String> for DataField {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DataField::try_from(value.as_str())
    }
}

/// Normalize a city name the way it is stored: first letter upper-cased,
/// the rest lower-cased.
pub fn normalize_city_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_field_as_str_roundtrip() {
        for field in DataField::all() {
            let parsed = DataField::try_from(field.as_str()).expect("roundtrip should succeed");
            assert_eq!(*field, parsed);
        }
    }

    #[test]
    fn data_field_parse_ignores_case() {
        let parsed = DataField::try_from("wind speed (MPH)").unwrap();
        assert_eq!(parsed, DataField::WindSpeedMph);
    }

    #[test]
    fn unknown_field_error() {
        let err = DataField::try_from("Pressure (hPa)").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Unknown field 'Pressure (hPa)'"));
        assert!(msg.contains("Temperature (C)"));
    }

    #[test]
    fn data_field_deserializes_from_column_name() {
        let field: DataField = serde_json::from_str("\"Humidity (%)\"").unwrap();
        assert_eq!(field, DataField::Humidity);

        let field: DataField = serde_json::from_str("\"temperature (f)\"").unwrap();
        assert_eq!(field, DataField::TemperatureF);

        assert!(serde_json::from_str::<DataField>("\"Pressure\"").is_err());
    }

    #[test]
    fn normalize_capitalizes_first_letter_only() {
        assert_eq!(normalize_city_name("lONDON"), "London");
        assert_eq!(normalize_city_name("  new york "), "New york");
        assert_eq!(normalize_city_name("ümeå"), "Ümeå");
        assert_eq!(normalize_city_name("   "), "");
    }
}
