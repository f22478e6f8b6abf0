//! Service configuration

use crate::email::SmtpConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// SMTP configuration; falls back to the console sender when absent
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "sitestock.db".to_string());

        Self {
            port,
            database_path,
            smtp: SmtpConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            database_path: "sitestock.db".to_string(),
            smtp: None,
        }
    }
}
