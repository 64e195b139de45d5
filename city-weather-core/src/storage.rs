//! SQLite-backed city storage.
//!
//! `Database` is an explicit, cloneable handle around a single connection.
//! Every operation takes the lock for its own duration only and never across
//! an `.await`.

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::{path::Path, sync::Arc};

use crate::model::{City, Coordinates, normalize_city_name};

/// Cities inserted into an empty database on first start.
pub const PREDEFINED_CITIES: &[(&str, f64, f64)] = &[
    ("New York", 40.7128, -74.0060),
    ("Tokyo", 35.6895, 139.6917),
    ("London", 51.5074, -0.1278),
    ("Paris", 48.8566, 2.3522),
    ("Berlin", 52.5200, 13.4050),
    ("Sydney", -33.8688, 151.2093),
    ("Mumbai", 19.0760, 72.8777),
    ("Cape Town", -33.9249, 18.4241),
    ("Moscow", 55.7558, 37.6173),
    ("Rio de Janeiro", -22.9068, -43.1729),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        let conn = self.conn.lock();
        let existed: bool = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'cities'",
            [],
            |row| row.get::<_, i64>(0).map(|n| n > 0),
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cities_name ON cities(name);
            "#,
        )?;

        if existed {
            tracing::info!("Table 'cities' already exists");
        } else {
            tracing::info!("Created table 'cities'");
        }
        Ok(())
    }

    /// Insert `cities` if the table is empty. Returns how many rows were added.
    pub fn seed_if_empty(&self, cities: &[(&str, f64, f64)]) -> rusqlite::Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM cities", [], |row| row.get(0))?;
        if existing > 0 {
            tracing::info!(existing, "Database already contains cities, skipping seed");
            return Ok(0);
        }

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cities (name, latitude, longitude) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO NOTHING",
            )?;
            for (name, latitude, longitude) in cities {
                let name = normalize_city_name(name);
                inserted += stmt.execute(params![name, latitude, longitude])?;
            }
        }

        tx.commit()?;
        tracing::info!(count = inserted, "Seeded database with predefined cities");
        Ok(inserted)
    }

    /// Create the city, or move an existing one to new coordinates.
    ///
    /// `name` must already be normalized. Runs in a single transaction, which
    /// is rolled back if any statement fails.
    pub fn upsert_city(&self, name: &str, coords: Coordinates) -> rusqlite::Result<UpsertOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row("SELECT id FROM cities WHERE name = ?1", params![name], |row| row.get(0))
            .optional()?;

        let outcome = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE cities SET latitude = ?1, longitude = ?2 WHERE id = ?3",
                    params![coords.latitude, coords.longitude, id],
                )?;
                UpsertOutcome::Updated
            }
            None => {
                tx.execute(
                    "INSERT INTO cities (name, latitude, longitude) VALUES (?1, ?2, ?3)",
                    params![name, coords.latitude, coords.longitude],
                )?;
                UpsertOutcome::Created
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    pub fn count(&self) -> rusqlite::Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cities", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn list_all(&self) -> rusqlite::Result<Vec<City>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, name, latitude, longitude FROM cities ORDER BY id")?;
        let rows = stmt.query_map([], row_to_city)?;
        rows.collect()
    }

    /// The first `limit` cities by id. A limit above the row count returns every row.
    pub fn list_limited(&self, limit: usize) -> rusqlite::Result<Vec<City>> {
        let available = self.count()?;
        let limit = limit.min(available) as i64;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, name, latitude, longitude FROM cities ORDER BY id LIMIT ?1")?;
        let rows = stmt.query_map(params![limit], row_to_city)?;
        rows.collect()
    }

    /// Cities whose stored name is in `names`. Names must already be normalized.
    pub fn list_by_names(&self, names: &[String]) -> rusqlite::Result<Vec<City>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "SELECT id, name, latitude, longitude FROM cities WHERE name IN ({placeholders}) ORDER BY id"
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(names.iter()), row_to_city)?;
        rows.collect()
    }

    pub fn find_by_name(&self, name: &str) -> rusqlite::Result<Option<City>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, latitude, longitude FROM cities WHERE name = ?1",
            params![name],
            row_to_city,
        )
        .optional()
    }
}

fn row_to_city(row: &rusqlite::Row) -> rusqlite::Result<City> {
    Ok(City {
        id: row.get(0)?,
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
    })
}
