use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_provision_per_min: u32,

    pub log_dir: String,
    pub log_level: String,
    pub cache_ttl_secs: u64,
    pub run_migrations: bool,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: optional("API_PREFIX", "/api".to_string())?,

            rate_protected_per_min: optional("RATE_PROTECTED_PER_MIN", 1000)?,
            rate_provision_per_min: optional("RATE_PROVISION_PER_MIN", 30)?,

            log_dir: optional("LOG_DIR", "logs".to_string())?,
            log_level: optional("LOG_LEVEL", "debug".to_string())?,
            cache_ttl_secs: optional("CACHE_TTL_SECS", 60)?,
            run_migrations: optional("RUN_MIGRATIONS", false)?,
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/test".into(),
            jwt_secret: crate::auth::jwt::testing::SECRET.into(),
            server_addr: "127.0.0.1:0".into(),
            api_prefix: "/api".into(),
            rate_protected_per_min: 1000,
            rate_provision_per_min: 30,
            log_dir: "logs".into(),
            log_level: "debug".into(),
            cache_ttl_secs: 60,
            run_migrations: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; the process environment is shared.
    #[test]
    fn optional_values_fall_back_and_parse() {
        assert_eq!(optional("HRM_TEST_UNSET_RATE", 30u32).unwrap(), 30);

        unsafe { env::set_var("HRM_TEST_RATE", " 45 ") };
        assert_eq!(optional("HRM_TEST_RATE", 30u32).unwrap(), 45);

        unsafe { env::set_var("HRM_TEST_FLAG", "true") };
        assert!(optional("HRM_TEST_FLAG", false).unwrap());
    }

    #[test]
    fn invalid_values_are_errors() {
        unsafe { env::set_var("HRM_TEST_BAD_TTL", "soon") };
        let err = optional("HRM_TEST_BAD_TTL", 60u64).unwrap_err();
        assert!(err.to_string().contains("HRM_TEST_BAD_TTL"));
        assert!(required("HRM_TEST_MISSING_SECRET").is_err());
    }
}
