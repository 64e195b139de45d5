use anyhow::Context;
use city_weather_core::Config;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use std::path::PathBuf;

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "city-weather", version, about = "City weather service")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on, e.g. "0.0.0.0:8000".
        #[arg(long)]
        bind: Option<String>,

        /// Path of the SQLite database file.
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Interactively set the API key, database path and listen address.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { bind, database } => {
                let mut config = Config::load()?;
                config.apply_env_overrides(|key| std::env::var(key).ok());

                if let Some(bind) = bind {
                    config.server.bind = bind;
                }
                if let Some(database) = database {
                    config.database.path = database;
                }

                server::serve(&config).await
            }
            Command::Configure => configure(),
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("API key clients must send in the `access_token` header:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let current_db = config.database.path.display().to_string();
    let database = Text::new("SQLite database path:")
        .with_default(&current_db)
        .prompt()
        .context("Failed to read database path")?;
    config.database.path = PathBuf::from(database);

    let bind = Text::new("Listen address:")
        .with_default(&config.server.bind)
        .prompt()
        .context("Failed to read listen address")?;
    config.server.bind = bind;

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_overrides() {
        let cli = Cli::parse_from([
            "city-weather",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--database",
            "/tmp/cities.db",
            "--log-level",
            "debug",
        ]);

        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Serve { bind, database } => {
                assert_eq!(bind.as_deref(), Some("0.0.0.0:9000"));
                assert_eq!(database, Some(PathBuf::from("/tmp/cities.db")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_configure() {
        let cli = Cli::parse_from(["city-weather", "configure"]);
        assert!(matches!(cli.command, Command::Configure));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["city-weather"]).is_err());
    }
}
