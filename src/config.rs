use std::{env, fmt, str::FromStr};

/// Deployment environment, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    /// Seeders that insert fake customers or known passwords only run here.
    pub fn allows_seeding(self) -> bool {
        !self.is_production()
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" | "testing" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(anyhow::anyhow!("unknown APP_ENV `{other}`")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub environment: Environment,
    pub legacy_password_migration: bool,
    pub maps_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let environment = match env::var("APP_ENV") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::Development,
        };
        let legacy_requested = env::var("ALLOW_LEGACY_PASSWORDS")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let maps_api_key = env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            environment,
            legacy_password_migration: legacy_allowed(environment, legacy_requested),
            maps_api_key,
        })
    }

    /// Configuration for integration tests against `database_url`.
    pub fn for_tests(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            environment: Environment::Test,
            legacy_password_migration: true,
            maps_api_key: None,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn legacy_allowed(environment: Environment, requested: bool) -> bool {
    if requested && environment.is_production() {
        tracing::warn!("ALLOW_LEGACY_PASSWORDS ignored in production");
        return false;
    }
    requested
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_environment_names() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("test".parse::<Environment>().unwrap(), Environment::Test);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn legacy_passwords_never_enabled_in_production() {
        assert!(!legacy_allowed(Environment::Production, true));
        assert!(legacy_allowed(Environment::Development, true));
        assert!(!legacy_allowed(Environment::Development, false));
    }

    #[test]
    fn flag_values() {
        assert!(parse_flag("Yes"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("off"));
    }
}
