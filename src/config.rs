use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Key material for encrypted variable values
    pub variable_secret: String,

    /// Named data sources for step SQL cross-checks (`name=url` pairs)
    pub sql_databases: Vec<(String, String)>,

    // Server
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if exists

        let mut sql_databases = Vec::new();
        // Shorthand for a single data source named "default"
        if let Ok(url) = env::var("SQL_DATABASE_URL") {
            sql_databases.push(("default".to_string(), url));
        }
        if let Ok(spec) = env::var("SQL_DATABASES") {
            sql_databases.extend(parse_sql_databases(&spec)?);
        }

        Ok(Self {
            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            // Encryption
            variable_secret: env::var("VARIABLE_SECRET")
                .map_err(|_| ConfigError::Missing("VARIABLE_SECRET"))?,

            sql_databases,

            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT"))?,
        })
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a comma-separated list of `name=url` data source entries
fn parse_sql_databases(spec: &str) -> Result<Vec<(String, String)>, ConfigError> {
    spec.split(',')
        .filter(|e| !e.trim().is_empty())
        .map(|entry| {
            let (name, url) = entry
                .split_once('=')
                .ok_or(ConfigError::Invalid("SQL_DATABASES"))?;
            Ok((name.trim().to_string(), url.trim().to_string()))
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_sql_databases() {
        let pairs =
            parse_sql_databases("default=sqlite::memory:, reporting=postgres://localhost/reports")
                .unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "default");
        assert_eq!(pairs[0].1, "sqlite::memory:");
        assert_eq!(pairs[1].0, "reporting");
        assert_eq!(pairs[1].1, "postgres://localhost/reports");
    }

    #[test]
    fn rejects_malformed_data_source_entry() {
        assert!(parse_sql_databases("default").is_err());
    }

    #[test]
    fn ignores_empty_entries() {
        let pairs = parse_sql_databases("default=sqlite::memory:,").unwrap();
        assert_eq!(pairs.len(), 1);
    }
}
