use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Knobs of the client-side capture/classify loop.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// `None` keeps every entry.
    pub history_cap: Option<usize>,
    pub frame_interval: Duration,
    pub classify_timeout: Option<Duration>,
    pub models_dir: PathBuf,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            history_cap: Some(DEFAULT_HISTORY_CAP),
            frame_interval: Duration::from_millis(16),
            classify_timeout: None,
            models_dir: PathBuf::from("public/models"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub cookie_secure: bool,
    /// Served to anyone as the fallback.
    pub public_dir: PathBuf,
    /// Session-guarded pages; never reachable through `public_dir`.
    pub pages_dir: PathBuf,
    pub detection: DetectionConfig,
}

pub const DEFAULT_HISTORY_CAP: usize = 20;
pub const DEFAULT_TTL_MINUTES: i64 = 7 * 24 * 60;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "moodcam".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "moodcam-users".into()),
            ttl_minutes: parse_var("JWT_TTL_MINUTES")?.unwrap_or(DEFAULT_TTL_MINUTES),
        };
        let public_dir =
            PathBuf::from(std::env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".into()));
        let pages_dir =
            PathBuf::from(std::env::var("PAGES_DIR").unwrap_or_else(|_| "pages".into()));

        let detection = DetectionConfig {
            history_cap: match std::env::var("HISTORY_CAP") {
                Ok(raw) => parse_history_cap(&raw)?,
                Err(_) => Some(DEFAULT_HISTORY_CAP),
            },
            frame_interval: Duration::from_millis(parse_var("DETECTION_FRAME_MS")?.unwrap_or(16)),
            classify_timeout: parse_var("DETECTION_TIMEOUT_MS")?.map(Duration::from_millis),
            models_dir: public_dir.join("models"),
        };

        Ok(Self {
            database_url,
            jwt,
            cookie_secure: parse_var("COOKIE_SECURE")?.unwrap_or(false),
            public_dir,
            pages_dir,
            detection,
        })
    }

    pub fn session_max_age_secs(&self) -> i64 {
        self.jwt.ttl_minutes * 60
    }
}

fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(None),
    }
}

/// `0`, `none` and `unbounded` turn the cap off.
pub fn parse_history_cap(raw: &str) -> anyhow::Result<Option<usize>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("unbounded") {
        return Ok(None);
    }
    let cap: usize = raw
        .parse()
        .with_context(|| format!("invalid value for HISTORY_CAP: {raw:?}"))?;
    Ok((cap > 0).then_some(cap))
}
