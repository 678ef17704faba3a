use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_PASSWORD_ENV: &str = "ETL_DB_PASSWORD";
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfigFile {
    pub paths: PathsConfig,
    pub database: DatabaseSection,
    #[serde(default)]
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub cleaned_dir: PathBuf,
    pub schema_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub database: String,
    // Name of the environment variable holding the password
    pub env_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_verify_integrity")]
    pub verify_integrity: bool,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_verify_integrity() -> bool {
    true
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            verify_integrity: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    // Loaded from the environment, never from the file
    pub password: Option<String>,
    pub env_password: Option<String>,
}

impl DatabaseConfig {
    fn from_section(section: DatabaseSection) -> Self {
        Self {
            host: section.host,
            port: section.port.unwrap_or(3306),
            user: section.user,
            database: section.database,
            password: None,
            env_password: section.env_password,
        }
    }

    pub fn load_credentials(&mut self) -> Result<()> {
        let password_var = self.env_password.as_deref().unwrap_or(DEFAULT_PASSWORD_ENV);

        self.password = env::var(password_var)
            .with_context(|| format!("Missing environment variable: {}", password_var))?
            .into();

        Ok(())
    }

    /// Options for the server itself, used before the target database exists.
    pub fn server_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user);

        match self.password.as_deref() {
            Some(password) => options.password(password),
            None => options,
        }
    }

    pub fn database_options(&self) -> MySqlConnectOptions {
        self.server_options().database(&self.database)
    }

    /// `user@host:port/database`, safe to log.
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(anyhow!("Database host cannot be empty"));
        }

        if self.user.is_empty() {
            return Err(anyhow!("Database user cannot be empty"));
        }

        // The name is spliced into DROP/CREATE DATABASE, so keep it to a plain identifier
        if self.database.is_empty()
            || !self
                .database
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(anyhow!(
                "Database name must be a non-empty identifier of [A-Za-z0-9_], got '{}'",
                self.database
            ));
        }

        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            database: "ecommerce_funnel".to_string(),
            password: None,
            env_password: None,
        }
    }
}

/// Everything a stage needs; built once in `main` and passed down by reference.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub database: DatabaseConfig,
    pub load: LoadConfig,
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: PipelineConfigFile = toml::from_str(content)?;

        Ok(Self {
            paths: file.paths,
            database: DatabaseConfig::from_section(file.database),
            load: file.load,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.load.batch_size == 0 {
            return Err(anyhow!("load.batch_size must be greater than zero"));
        }

        self.database.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                raw_dir: PathBuf::from("data/raw"),
                cleaned_dir: PathBuf::from("data/cleaned"),
                schema_path: PathBuf::from("sql/schema.sql"),
            },
            database: DatabaseConfig::default(),
            load: LoadConfig::default(),
        }
    }
}
