//! Handles optional settings for the CLI. Configuration is written in
//! `settings.toml` in the working directory; every section can be omitted
//! and overridden by flags or environment variables.
use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Sqlite {
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub app: Option<App>,
    pub sqlite: Option<Sqlite>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .build()?;

        settings.try_deserialize()
    }
}
