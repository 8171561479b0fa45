use anyhow::Context;
use serde::Deserialize;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:8080,http://127.0.0.1:3000";

/// Token lifetime bounds, in minutes. Out-of-range settings are clamped.
pub const MIN_TTL_MINUTES: i64 = 1;
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres URL; `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    /// Require the authenticated user to own the sessions and scores it writes.
    pub enforce_ownership: bool,
    /// Allowed CORS origins. Empty means permissive.
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "snakegame".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "snakegame-players".into()),
            ttl_minutes: parse_ttl_minutes(std::env::var("JWT_TTL_MINUTES").ok().as_deref()),
        };
        let enforce_ownership = std::env::var("ENFORCE_OWNERSHIP")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.into()),
        );
        Ok(Self {
            database_url,
            max_connections,
            jwt,
            enforce_ownership,
            cors_origins,
        })
    }

    /// Config used by unit and router tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            enforce_ownership: false,
            cors_origins: Vec::new(),
        }
    }
}

fn parse_ttl_minutes(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(60)
        .clamp(MIN_TTL_MINUTES, MAX_TTL_MINUTES)
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_origins(raw: &str) -> Vec<String> {
    if raw.trim() == "*" {
        return Vec::new();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
