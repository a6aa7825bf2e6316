//! Environment-driven configuration.

use std::env;
use std::time::Duration;

/// Hard ceiling on the per-execution deadline, regardless of what the
/// request asks for.
pub const MAX_TIMEOUT_SECS: u64 = 30;

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Prefix prepended to every catalog image name (e.g. a registry
    /// namespace like `crucible/`).
    pub image_prefix: String,
    /// Global cap on simultaneously active sandboxes.
    pub concurrent_limit: usize,
    /// Default execution deadline in seconds when the request omits one.
    pub default_timeout: u64,
    /// Per-client sustained request rate.
    pub rate_limit_per_minute: u32,
    /// Per-client burst allowance.
    pub rate_limit_burst: u32,
    /// Screener size cap on submitted source, in bytes.
    pub max_code_len: usize,
    /// Per-stream cap on captured output, in bytes.
    pub max_output_bytes: usize,
    /// Permit the synthetic fallback executor when the container runtime is
    /// unreachable. Development only; production startup fails instead.
    pub allow_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            image_prefix: String::new(),
            concurrent_limit: 10,
            default_timeout: 10,
            rate_limit_per_minute: 100,
            rate_limit_burst: 10,
            max_code_len: 10_000,
            max_output_bytes: 65_536,
            allow_fallback: false,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            image_prefix: env::var("IMAGE_PREFIX").unwrap_or_default(),
            concurrent_limit: parsed("CONCURRENT_LIMIT")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.concurrent_limit),
            default_timeout: parsed("DEFAULT_TIMEOUT")
                .filter(|&t: &u64| t > 0)
                .unwrap_or(defaults.default_timeout)
                .min(MAX_TIMEOUT_SECS),
            rate_limit_per_minute: parsed("RATE_LIMIT_PER_MINUTE")
                .filter(|&n: &u32| n > 0)
                .unwrap_or(defaults.rate_limit_per_minute),
            rate_limit_burst: parsed("RATE_LIMIT_BURST")
                .filter(|&n: &u32| n > 0)
                .unwrap_or(defaults.rate_limit_burst),
            max_code_len: parsed("MAX_CODE_LEN")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_code_len),
            max_output_bytes: parsed("MAX_OUTPUT_BYTES")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_output_bytes),
            allow_fallback: env::var("CRUCIBLE_ALLOW_FALLBACK").map(|v| v == "1").unwrap_or(false),
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Resolve the effective execution deadline for a request.
///
/// Absent or zero timeouts take the configured default; anything above
/// [`MAX_TIMEOUT_SECS`] is capped there.
pub fn clamp_timeout(requested: Option<u64>, default_secs: u64) -> Duration {
    match requested {
        None | Some(0) => Duration::from_secs(default_secs),
        Some(t) => Duration::from_secs(t.min(MAX_TIMEOUT_SECS)),
    }
}
