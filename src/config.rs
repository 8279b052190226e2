use std::path::PathBuf;

use serde::Deserialize;

/// Configuration for the application, read from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    /// Request body cap for invoice uploads.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_admin_login")]
    pub admin_login: String,
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

fn default_port() -> u16 {
    3000
}

fn default_database_url() -> String {
    "sqlite://obras.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("src/front/templates")
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_admin_login() -> String {
    "admin".to_string()
}

fn default_admin_name() -> String {
    "Administrador".to_string()
}

fn default_admin_password() -> String {
    "1234".to_string()
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, Config>(vars)?)
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
