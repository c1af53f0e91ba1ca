// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration, read from `KURS_*` environment variables with CLI
//! flags taking precedence.

use kurs_core::{KursError, KursResult, RateBand};
use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Central bank's JSON archive of official rates.
pub const DEFAULT_CBU_URL: &str = "https://cbu.uz/uz/arkhiv-kursov-valyut/json/";

/// Resource profile: a developer machine or a small server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Desktop,
    Constrained,
}

impl Profile {
    pub fn fetch_timeout(self) -> Duration {
        match self {
            Self::Desktop => Duration::from_secs(13),
            Self::Constrained => Duration::from_secs(20),
        }
    }

    pub fn nav_timeout(self) -> Duration {
        match self {
            Self::Desktop => Duration::from_secs(22),
            Self::Constrained => Duration::from_secs(35),
        }
    }

    /// Scales every source's settle delay.
    pub fn settle_multiplier(self) -> f64 {
        match self {
            Self::Desktop => 1.0,
            Self::Constrained => 1.5,
        }
    }

    pub fn batch_size(self) -> usize {
        match self {
            Self::Desktop => 5,
            Self::Constrained => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Constrained => "constrained",
        }
    }
}

impl FromStr for Profile {
    type Err = KursError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "constrained" | "server" => Ok(Self::Constrained),
            other => Err(KursError::Config(format!("unknown profile: {other}"))),
        }
    }
}

/// Everything the runtime needs to run cycles and serve the API.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub band: RateBand,
    pub profile: Profile,
    /// Rendered sources processed concurrently per batch.
    pub batch_size: usize,
    pub fetch_timeout: Duration,
    pub nav_timeout: Duration,
    pub settle_multiplier: f64,
    pub chrome_path: Option<PathBuf>,
    pub data_file: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub interval: Duration,
    /// Resolved sources needed before a cycle replaces the snapshot.
    pub min_success: usize,
    pub channel_url: Option<String>,
    pub cbu_url: String,
}

impl RuntimeConfig {
    /// Desktop defaults around a given band.
    pub fn new(band: RateBand) -> Self {
        let profile = Profile::Desktop;
        Self {
            band,
            profile,
            batch_size: profile.batch_size(),
            fetch_timeout: profile.fetch_timeout(),
            nav_timeout: profile.nav_timeout(),
            settle_multiplier: profile.settle_multiplier(),
            chrome_path: None,
            data_file: PathBuf::from("data.json"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            interval: Duration::from_secs(3 * 60 * 60),
            min_success: 3,
            channel_url: None,
            cbu_url: DEFAULT_CBU_URL.to_string(),
        }
    }

    /// Read from the process environment, with `overrides` (from CLI flags)
    /// consulted first.
    pub fn load(overrides: &HashMap<&'static str, String>) -> KursResult<Self> {
        Self::from_lookup(|key| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
        })
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> KursResult<Self> {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let min = required::<i64>(&get, "KURS_RATE_MIN")?;
        let max = required::<i64>(&get, "KURS_RATE_MAX")?;
        let mut config = Self::new(RateBand::new(min, max)?);

        let profile = match get("KURS_PROFILE") {
            Some(p) => p.parse()?,
            None if get("SERVER").is_some() => Profile::Constrained,
            None if get("NODE_ENV").as_deref() == Some("production") => Profile::Constrained,
            None => Profile::Desktop,
        };
        config.profile = profile;
        config.batch_size = profile.batch_size();
        config.fetch_timeout = profile.fetch_timeout();
        config.nav_timeout = profile.nav_timeout();
        config.settle_multiplier = profile.settle_multiplier();

        if let Some(n) = optional::<usize>(&get, "KURS_BATCH_SIZE")? {
            if n == 0 {
                return Err(KursError::Config("KURS_BATCH_SIZE must be at least 1".into()));
            }
            config.batch_size = n;
        }
        config.chrome_path = get("KURS_CHROME_PATH").map(PathBuf::from);
        if let Some(path) = get("KURS_DATA_FILE") {
            config.data_file = PathBuf::from(path);
        }
        if let Some(host) = optional::<IpAddr>(&get, "KURS_HOST")? {
            config.host = host;
        }
        let port = match optional::<u16>(&get, "KURS_PORT")? {
            Some(port) => Some(port),
            None => optional::<u16>(&get, "PORT")?,
        };
        if let Some(port) = port {
            config.port = port;
        }
        if let Some(minutes) = optional::<u64>(&get, "KURS_INTERVAL_MINUTES")? {
            if minutes == 0 {
                return Err(KursError::Config("KURS_INTERVAL_MINUTES must be positive".into()));
            }
            let secs = minutes.checked_mul(60).ok_or_else(|| {
                KursError::Config(format!("KURS_INTERVAL_MINUTES: {minutes} is out of range"))
            })?;
            config.interval = Duration::from_secs(secs);
        }
        if let Some(n) = optional::<usize>(&get, "KURS_MIN_SUCCESS")? {
            config.min_success = n;
        }
        config.channel_url = get("KURS_CHANNEL_URL");
        if let Some(url) = get("KURS_CBU_URL") {
            config.cbu_url = url;
        }
        Ok(config)
    }

    /// Settle delay for a source after scaling by the profile.
    pub fn scaled_settle(&self, settle: Duration) -> Duration {
        settle.mul_f64(self.settle_multiplier)
    }
}

fn optional<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> KursResult<Option<T>> {
    match get(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| KursError::Config(format!("{key}: invalid value {raw:?}"))),
        None => Ok(None),
    }
}

fn required<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> KursResult<T> {
    optional(get, key)?.ok_or_else(|| KursError::Config(format!("{key} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_band_is_required() {
        let err = assert_err!(RuntimeConfig::from_lookup(lookup(&[("KURS_RATE_MIN", "12000")])));
        assert!(err.to_string().contains("KURS_RATE_MAX"));
    }

    #[test]
    fn test_desktop_defaults() {
        let c = assert_ok!(RuntimeConfig::from_lookup(lookup(&[
            ("KURS_RATE_MIN", "12000"),
            ("KURS_RATE_MAX", "13200"),
        ])));
        assert_eq!(c.profile, Profile::Desktop);
        assert_eq!(c.batch_size, 5);
        assert_eq!(c.fetch_timeout, Duration::from_secs(13));
        assert_eq!(c.min_success, 3);
        assert_eq!(c.interval, Duration::from_secs(10800));
        assert_eq!(c.data_file, PathBuf::from("data.json"));
        assert!(c.channel_url.is_none());
    }

    #[test]
    fn test_server_env_selects_constrained() {
        let c = assert_ok!(RuntimeConfig::from_lookup(lookup(&[
            ("KURS_RATE_MIN", "12000"),
            ("KURS_RATE_MAX", "13200"),
            ("NODE_ENV", "production"),
            ("PORT", "8080"),
        ])));
        assert_eq!(c.profile, Profile::Constrained);
        assert_eq!(c.batch_size, 2);
        assert_eq!(c.nav_timeout, Duration::from_secs(35));
        assert_eq!(c.scaled_settle(Duration::from_millis(8000)), Duration::from_millis(12000));
        assert_eq!(c.port, 8080);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for pairs in [
            &[("KURS_RATE_MIN", "13200"), ("KURS_RATE_MAX", "12000")][..],
            &[("KURS_RATE_MIN", "12000"), ("KURS_RATE_MAX", "13200"), ("KURS_BATCH_SIZE", "0")][..],
            &[("KURS_RATE_MIN", "12000"), ("KURS_RATE_MAX", "13200"), ("KURS_PROFILE", "huge")][..],
            &[("KURS_RATE_MIN", "abc"), ("KURS_RATE_MAX", "13200")][..],
            &[
                ("KURS_RATE_MIN", "12000"),
                ("KURS_RATE_MAX", "13200"),
                ("KURS_INTERVAL_MINUTES", "18446744073709551615"),
            ][..],
        ] {
            let err = assert_err!(RuntimeConfig::from_lookup(lookup(pairs)));
            assert!(matches!(err, KursError::Config(_)), "{err}");
        }
    }

    #[test]
    fn test_kurs_port_wins_over_malformed_port() {
        let c = assert_ok!(RuntimeConfig::from_lookup(lookup(&[
            ("KURS_RATE_MIN", "12000"),
            ("KURS_RATE_MAX", "13200"),
            ("KURS_PORT", "9000"),
            ("PORT", "not-a-port"),
        ])));
        assert_eq!(c.port, 9000);
    }
}
