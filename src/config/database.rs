use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full PostgreSQL connection URL.
    pub url: SecretString,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> &str {
        self.url.expose_secret()
    }

    pub(super) fn validate(&self) -> Result<(), ValidationError> {
        let url = self.url.expose_secret();
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            return Err(ValidationError::invalid(
                "database.url",
                "must be a postgres:// connection url",
            ));
        }
        if self.max_connections == 0 {
            return Err(ValidationError::invalid(
                "database.max_connections",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: SecretString::new(url.to_string()),
            max_connections: default_max_connections(),
        }
    }

    #[test]
    fn postgres_url_is_accepted() {
        assert!(config("postgres://localhost/flashdeck").validate().is_ok());
        assert!(config("postgresql://localhost/flashdeck").validate().is_ok());
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(config("mysql://localhost/flashdeck").validate().is_err());
    }
}
