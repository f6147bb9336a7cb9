use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Clinic";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_POOL_SIZE: usize = 8;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// Accepted token lifetimes, in hours.
pub const TOKEN_TTL_HOURS_RANGE: std::ops::RangeInclusive<i64> = 1..=24 * 365;

/// Signing secret used when `CLINIC_JWT_SECRET` is unset. Development only.
pub const DEV_JWT_SECRET: &str = "clinic-dev-secret-change-in-production";

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "clinic_lib=info,clinic_server=info,tower_http=warn"
}

/// Get the application data directory
/// ~/ClinicData/ on all platforms
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ClinicData")
}

/// Default database file location
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Optional admin account created at startup when missing.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub pool_size: usize,
    pub token_ttl_hours: i64,
    pub admin: Option<AdminBootstrap>,
}

impl ServerConfig {
    /// Build the configuration from `CLINIC_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Invalid values fall back to defaults with a warning rather than
    /// aborting startup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup("CLINIC_DATABASE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let bind_addr = parse_or_default(
            "CLINIC_BIND_ADDR",
            lookup("CLINIC_BIND_ADDR"),
            default_bind_addr(),
        );

        let jwt_secret = match lookup("CLINIC_JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("CLINIC_JWT_SECRET not set, using development signing secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let pool_size = parse_or_default(
            "CLINIC_POOL_SIZE",
            lookup("CLINIC_POOL_SIZE"),
            DEFAULT_POOL_SIZE,
        )
        .max(1);

        let token_ttl_hours = match parse_or_default(
            "CLINIC_TOKEN_TTL_HOURS",
            lookup("CLINIC_TOKEN_TTL_HOURS"),
            DEFAULT_TOKEN_TTL_HOURS,
        ) {
            hours if TOKEN_TTL_HOURS_RANGE.contains(&hours) => hours,
            hours => {
                tracing::warn!(
                    key = "CLINIC_TOKEN_TTL_HOURS",
                    value = hours,
                    "Token lifetime out of range, using default"
                );
                DEFAULT_TOKEN_TTL_HOURS
            }
        };

        let admin = match (
            lookup("CLINIC_ADMIN_USERNAME"),
            lookup("CLINIC_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminBootstrap {
                    full_name: lookup("CLINIC_ADMIN_NAME").unwrap_or_else(|| username.clone()),
                    username,
                    password,
                })
            }
            _ => None,
        };

        Self {
            database_path,
            bind_addr,
            jwt_secret,
            pool_size,
            token_ttl_hours,
            admin,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    match raw {
        None => default,
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, value = %value, "Invalid configuration value, using default");
                default
            }
        },
    }
}
