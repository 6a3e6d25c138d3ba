//! Service configuration.
//!
//! Loaded once at startup from command-line flags, falling back to
//! environment variables (a `.env` file is honoured). Immutable afterwards.

use crate::auth::{jwt::DEFAULT_TOKEN_TTL_HOURS, password::DEFAULT_BCRYPT_COST};
use anyhow::{bail, Result};
use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug, Clone)]
#[command(name = "account-service")]
#[command(about = "User account service with JWT bearer authentication")]
pub struct Config {
    /// Account store connection string (`sqlite://path`, a plain path, or `:memory:`)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Token signing secret
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// Access token lifetime in hours
    #[arg(long, env = "JWT_EXPIRATION_HOURS", default_value_t = DEFAULT_TOKEN_TTL_HOURS)]
    pub jwt_expiration_hours: i64,

    /// bcrypt work factor
    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = DEFAULT_BCRYPT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31)
    )]
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load `.env`, parse flags/environment, and validate
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            bail!("DATABASE_URL must not be empty");
        }
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        if self.jwt_expiration_hours <= 0 {
            bail!("JWT_EXPIRATION_HOURS must be positive");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", addr, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Config {
        let mut args = vec![
            "account-service",
            "--database-url",
            "sqlite://accounts.db",
            "--jwt-secret",
            "s3cret",
        ];
        args.extend_from_slice(extra);
        Config::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_explicit_flags() {
        let config = parse(&["--port", "8081", "--host", "127.0.0.1", "--bcrypt-cost", "4"]);

        assert_eq!(config.database_url, "sqlite://accounts.db");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(
            config.listen_addr().unwrap(),
            "127.0.0.1:8081".parse::<SocketAddr>().unwrap()
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bcrypt_cost_out_of_range_rejected() {
        let result = Config::try_parse_from([
            "account-service",
            "--database-url",
            ":memory:",
            "--jwt-secret",
            "s3cret",
            "--bcrypt-cost",
            "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_secret_fails_validation() {
        let mut config = parse(&[]);
        config.jwt_secret = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_ttl_fails_validation() {
        let mut config = parse(&[]);
        config.jwt_expiration_hours = 0;
        assert!(config.validate().is_err());
    }
}
