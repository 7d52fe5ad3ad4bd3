use envconfig::Envconfig;

use crate::error::AppError;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL", default = "sqlite://medi_reach.db")]
    pub database_url: String,

    #[envconfig(from = "SERVER_HOST", default = "127.0.0.1")]
    pub server_host: String,

    #[envconfig(from = "SERVER_PORT", default = "8080")]
    pub server_port: u16,

    #[envconfig(from = "SESSION_TTL_HOURS", default = "24")]
    pub session_ttl_hours: i64,

    #[envconfig(from = "SEED_DB", default = "false")]
    pub seed_db: bool,

    #[envconfig(from = "ADMIN_EMAIL", default = "admin@medireach.com")]
    pub admin_email: String,

    #[envconfig(from = "ADMIN_PASSWORD", default = "admin123")]
    pub admin_password: String,
}

/// Sessions may not outlive a year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Config::init_from_env()
            .map_err(|e| AppError::Config(e.to_string()))?
            .validated()
    }

    fn validated(self) -> Result<Self, AppError> {
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
            return Err(AppError::Config(format!(
                "SESSION_TTL_HOURS must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            )));
        }
        Ok(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    #[test]
    fn defaults_apply_when_variables_are_absent() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.database_url, "sqlite://medi_reach.db");
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.session_ttl(), chrono::Duration::hours(24));
        assert!(!config.seed_db);
    }

    #[rstest]
    #[case("0")]
    #[case("-3")]
    #[case("8761")]
    #[case("9223372036854775807")]
    fn rejects_out_of_range_session_ttl(#[case] hours: &str) {
        let vars = HashMap::from([("SESSION_TTL_HOURS".to_string(), hours.to_string())]);
        let config = Config::init_from_hashmap(&vars).unwrap();
        assert!(matches!(config.validated(), Err(AppError::Config(_))));
    }

    #[test]
    fn accepts_a_year_long_session_ttl() {
        let vars = HashMap::from([("SESSION_TTL_HOURS".to_string(), "8760".to_string())]);
        let config = Config::init_from_hashmap(&vars).unwrap().validated().unwrap();
        assert_eq!(config.session_ttl(), chrono::Duration::hours(8760));
    }

    #[test]
    fn variables_override_defaults() {
        let vars = HashMap::from([
            ("SERVER_PORT".to_string(), "9090".to_string()),
            ("SEED_DB".to_string(), "true".to_string()),
        ]);
        let config = Config::init_from_hashmap(&vars).unwrap();
        assert_eq!(config.server_port, 9090);
        assert!(config.seed_db);
    }
}
