use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub admin_username: String,
    pub admin_password: String,
    pub upload_max_bytes: usize,
    pub seed_demo_users: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let admin_username = env_or("ADMIN_USERNAME", "admin");
        if admin_username.trim().is_empty() {
            return Err(anyhow!("invalid ADMIN_USERNAME: must not be empty"));
        }

        Ok(Self {
            http_addr,
            admin_username,
            admin_password: env_or("ADMIN_PASSWORD", "password"),
            upload_max_bytes: env_or_parse("UPLOAD_MAX_BYTES", "104857600")?,
            seed_demo_users: env_or_parse("SEED_DEMO_USERS", "true")?,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "password".to_string(),
            upload_max_bytes: 104_857_600,
            seed_demo_users: true,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
