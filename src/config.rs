//! Environment-driven configuration.
//!
//! All knobs come from environment variables (a `.env` file is loaded by
//! `main` before anything reads them). Numeric values are clamped to sane
//! bounds so a bad deployment cannot hammer the origin or hang forever.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use tracing::warn;

/// Default scrape target.
pub const DEFAULT_BASE_URL: &str = "https://op.gg/valorant/statistics";

/// Timezone the cron schedule is evaluated in.
const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Madrid;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Minimum courtesy delay between requests to the origin.
const MIN_REQUEST_DELAY_MS: u64 = 1000;

/// Request timeout bounds.
const MIN_TIMEOUT_MS: u64 = 10_000;
const MAX_TIMEOUT_MS: u64 = 60_000;

/// Retry attempt bounds.
const MIN_RETRY_ATTEMPTS: u32 = 1;
const MAX_RETRY_ATTEMPTS: u32 = 5;

/// Concurrent outbound request bounds.
const MIN_CONCURRENT: usize = 1;
const MAX_CONCURRENT: usize = 10;

/// Runtime settings for the scraper, store, and API server.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Origin page holding the statistics tables.
    pub base_url: String,
    pub user_agent: String,
    /// Courtesy delay between requests; also the backoff base.
    pub request_delay: Duration,
    pub retry_attempts: u32,
    pub request_timeout: Duration,
    pub max_concurrent: usize,
    /// Reject response bodies above this many bytes.
    pub max_response_bytes: usize,
    pub database_path: PathBuf,
    /// Six-field cron expression (seconds first) for scheduled scrapes.
    pub cron_schedule: String,
    /// Timezone the cron expression fires in.
    pub timezone: Tz,
    pub api_host: String,
    pub api_port: u16,
    pub leaderboard_api_url: String,
    pub leaderboard_api_key: String,
}

impl Settings {
    /// Build settings from the environment, applying defaults and clamps.
    pub fn from_env() -> Self {
        Self {
            base_url: env_string("STATS_BASE_URL", DEFAULT_BASE_URL),
            user_agent: env_string("SCRAPER_USER_AGENT", DEFAULT_USER_AGENT),
            request_delay: Duration::from_millis(
                env_u64("REQUEST_DELAY_MS", 2000).max(MIN_REQUEST_DELAY_MS),
            ),
            retry_attempts: (env_u64("RETRY_ATTEMPTS", 3) as u32)
                .clamp(MIN_RETRY_ATTEMPTS, MAX_RETRY_ATTEMPTS),
            request_timeout: Duration::from_millis(
                env_u64("REQUEST_TIMEOUT_MS", 30_000).clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS),
            ),
            max_concurrent: (env_u64("MAX_CONCURRENT_REQUESTS", 2) as usize)
                .clamp(MIN_CONCURRENT, MAX_CONCURRENT),
            max_response_bytes: env_u64("MAX_RESPONSE_BYTES", 5 * 1024 * 1024) as usize,
            database_path: PathBuf::from(env_string("DATABASE_PATH", "valstats.db")),
            // Monday 03:00 by default, matching the weekly stats rollover.
            cron_schedule: env_string("CRON_SCHEDULE", "0 0 3 * * Mon"),
            timezone: env_timezone("TIMEZONE"),
            api_host: env_string("API_HOST", "0.0.0.0"),
            api_port: env_u64("API_PORT", 3001) as u16,
            leaderboard_api_url: env_string(
                "LEADERBOARD_API_URL",
                "https://api.henrikdev.xyz/valorant",
            ),
            leaderboard_api_key: env_string("LEADERBOARD_API_KEY", ""),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// IANA timezone name, falling back to the default when unset or unknown.
fn env_timezone(name: &str) -> Tz {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().unwrap_or_else(|_| {
            warn!("unknown timezone {raw:?}, using {DEFAULT_TIMEZONE}");
            DEFAULT_TIMEZONE
        }),
        _ => DEFAULT_TIMEZONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var mutation is process-global, so clamp behavior is covered in a
    // single test to avoid races between parallel test threads.
    #[test]
    fn clamps_apply_to_out_of_range_values() {
        std::env::set_var("REQUEST_DELAY_MS", "5");
        std::env::set_var("RETRY_ATTEMPTS", "50");
        std::env::set_var("REQUEST_TIMEOUT_MS", "1");
        std::env::set_var("MAX_CONCURRENT_REQUESTS", "0");

        let settings = Settings::from_env();
        assert_eq!(settings.request_delay, Duration::from_millis(1000));
        assert_eq!(settings.retry_attempts, 5);
        assert_eq!(settings.request_timeout, Duration::from_millis(10_000));
        assert_eq!(settings.max_concurrent, 1);

        std::env::remove_var("REQUEST_DELAY_MS");
        std::env::remove_var("RETRY_ATTEMPTS");
        std::env::remove_var("REQUEST_TIMEOUT_MS");
        std::env::remove_var("MAX_CONCURRENT_REQUESTS");
    }

    #[test]
    fn timezone_parses_iana_names_and_falls_back() {
        std::env::set_var("TIMEZONE", "America/New_York");
        assert_eq!(Settings::from_env().timezone, chrono_tz::America::New_York);

        std::env::set_var("TIMEZONE", "Mars/Olympus_Mons");
        assert_eq!(Settings::from_env().timezone, DEFAULT_TIMEZONE);

        std::env::remove_var("TIMEZONE");
        assert_eq!(Settings::from_env().timezone, chrono_tz::Europe::Madrid);
    }
}
