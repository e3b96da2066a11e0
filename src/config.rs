use serde::Deserialize;

use crate::license;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    /// Key board clients present in `X-Api-Key` / `Authorization: Bearer`.
    pub api_key: String,
    /// Hex-encoded Ed25519 verifying key for license tokens. Defaults to
    /// the key compiled into the binary.
    pub license_public_key: String,
    /// Seconds a license verdict stays cached before re-verification.
    /// Set via TASKDECK_LICENSE_TTL. Default: 300.
    pub license_cache_ttl: u64,
    /// Max license-install attempts per client per window. 0 = disabled.
    /// Set via TASKDECK_LICENSE_RPM. Default: 10.
    pub license_rate_limit: u64,
    /// Window in seconds for the license-install rate limit.
    /// Set via TASKDECK_LICENSE_RPM_WINDOW. Default: 60.
    pub license_rate_limit_window: u64,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let api_key =
        std::env::var("TASKDECK_API_KEY").unwrap_or_else(|_| "CHANGE_ME_API_KEY".into());

    if api_key == "CHANGE_ME_API_KEY" {
        let env_mode = std::env::var("TASKDECK_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "TASKDECK_API_KEY is still the insecure placeholder. \
                 Set a proper key before running in production."
            );
        }
        eprintln!("⚠️  TASKDECK_API_KEY is not set — using insecure placeholder. Set a real key for production.");
    }

    Ok(Config {
        port: std::env::var("TASKDECK_PORT")
            .unwrap_or_else(|_| "8090".into())
            .parse()
            .unwrap_or(8090),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/taskdeck".into()),
        redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        api_key,
        license_public_key: std::env::var("TASKDECK_LICENSE_PUBLIC_KEY")
            .unwrap_or_else(|_| license::EMBEDDED_PUBLIC_KEY_HEX.into()),
        license_cache_ttl: std::env::var("TASKDECK_LICENSE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300),
        license_rate_limit: std::env::var("TASKDECK_LICENSE_RPM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        license_rate_limit_window: std::env::var("TASKDECK_LICENSE_RPM_WINDOW")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60),
    })
}
