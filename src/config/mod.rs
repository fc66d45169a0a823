use once_cell::sync::Lazy;
use std::env;

/// Fallback signing secret for local development only. Production startup
/// refuses to run without an explicit JWT_SECRET_KEY.
const DEV_FALLBACK_SECRET: &str = "conduit-dev-secret-do-not-use-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub default_page_size: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let jwt_secret = match env::var("JWT_SECRET_KEY") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                if environment == Environment::Production {
                    panic!("JWT_SECRET_KEY must be set when APP_ENV=production");
                }
                tracing::warn!("JWT_SECRET_KEY not set, using development fallback secret");
                DEV_FALLBACK_SECRET.to_string()
            }
        };

        let mut config = match environment {
            Environment::Production => Self::production(jwt_secret),
            Environment::Development => Self::development(jwt_secret),
        };

        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = v.parse().unwrap_or(config.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            config.database.connection_timeout_secs =
                v.parse().unwrap_or(config.database.connection_timeout_secs);
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            config.security.jwt_expiry_hours = v.parse().unwrap_or(config.security.jwt_expiry_hours);
        }

        config
    }

    fn development(jwt_secret: String) -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret,
                jwt_expiry_hours: 24 * 7,
            },
            api: ApiConfig {
                default_page_size: 20,
            },
        }
    }

    fn production(jwt_secret: String) -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt_secret,
                jwt_expiry_hours: 24,
            },
            api: ApiConfig {
                default_page_size: 20,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
