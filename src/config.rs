// ⚙️ Configuration - environment variables (optionally from .env)
//
// Every value has a default, so an empty environment gives the stock demo:
// 24 slots, 10 SDG/minute, ~30% pre-occupied, admin/1234.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

use crate::access::AdminCredentials;
use crate::analysis::{GeminiAnalyst, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::lot::DEFAULT_MINUTE_RATE;

/// Upper bound for the starting lot size
pub const MAX_TOTAL_SLOTS: u32 = 1000;
use crate::seed::SeedOptions;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub total_slots: u32,
    /// SDG per minute
    pub minute_rate: u64,
    /// Share of slots occupied at startup (0.0 - 1.0)
    pub occupancy: f64,
    /// Fixed seed for the starting lot
    pub seed: Option<u64>,
    /// HTTP listen address (server mode)
    pub bind_addr: String,
    pub admin: AdminCredentials,
    /// Where exports (and TUI logs) are written
    pub export_dir: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            total_slots: 24,
            minute_rate: DEFAULT_MINUTE_RATE,
            occupancy: 0.3,
            seed: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            admin: AdminCredentials::default(),
            export_dir: PathBuf::from("."),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) then read the process environment
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup (the environment, or a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = AppConfig {
            total_slots: parse_or(&get, "SMARTPARK_TOTAL_SLOTS", defaults.total_slots)?,
            minute_rate: parse_or(&get, "SMARTPARK_MINUTE_RATE", defaults.minute_rate)?,
            occupancy: parse_or(&get, "SMARTPARK_OCCUPANCY", defaults.occupancy)?,
            seed: get("SMARTPARK_SEED")
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .context("Invalid SMARTPARK_SEED")?,
            bind_addr: get("SMARTPARK_BIND").unwrap_or(defaults.bind_addr),
            admin: AdminCredentials {
                username: get("SMARTPARK_ADMIN_USER").unwrap_or(defaults.admin.username),
                password: get("SMARTPARK_ADMIN_PASSWORD").unwrap_or(defaults.admin.password),
            },
            export_dir: get("SMARTPARK_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_slots > MAX_TOTAL_SLOTS {
            bail!(
                "SMARTPARK_TOTAL_SLOTS must be at most {}, got {}",
                MAX_TOTAL_SLOTS,
                self.total_slots
            );
        }
        if self.minute_rate == 0 {
            bail!("SMARTPARK_MINUTE_RATE must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.occupancy) {
            bail!("SMARTPARK_OCCUPANCY must be between 0.0 and 1.0, got {}", self.occupancy);
        }
        Ok(())
    }

    pub fn seed_options(&self) -> SeedOptions {
        SeedOptions {
            total_slots: self.total_slots,
            occupancy: self.occupancy,
            seed: self.seed,
        }
    }

    pub fn analyst(&self) -> GeminiAnalyst {
        GeminiAnalyst::with_base_url(
            self.gemini_api_key.clone(),
            self.gemini_model.clone(),
            self.gemini_base_url.clone(),
        )
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid {}: {:?}", name, raw)),
        None => Ok(default),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.total_slots, 24);
        assert_eq!(config.minute_rate, 10);
        assert_eq!(config.occupancy, 0.3);
        assert!(config.seed.is_none());
        assert_eq!(config.admin.username, "admin");
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("SMARTPARK_TOTAL_SLOTS", "40"),
            ("SMARTPARK_MINUTE_RATE", "15"),
            ("SMARTPARK_SEED", "99"),
            ("SMARTPARK_ADMIN_PASSWORD", "s3cret"),
            ("API_KEY", "abc"),
        ])
        .unwrap();

        assert_eq!(config.total_slots, 40);
        assert_eq!(config.minute_rate, 15);
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.admin.password, "s3cret");
        assert_eq!(config.gemini_api_key.as_deref(), Some("abc"));
        assert_eq!(config.seed_options().total_slots, 40);
    }

    #[test]
    fn test_gemini_key_takes_precedence() {
        let config = config_from(&[("GEMINI_API_KEY", "g"), ("API_KEY", "a")]).unwrap();
        assert_eq!(config.gemini_api_key.as_deref(), Some("g"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("SMARTPARK_TOTAL_SLOTS", "many")]).is_err());
        assert!(config_from(&[("SMARTPARK_MINUTE_RATE", "0")]).is_err());
        assert!(config_from(&[("SMARTPARK_OCCUPANCY", "1.5")]).is_err());
        assert!(config_from(&[("SMARTPARK_SEED", "-1")]).is_err());
    }

    #[test]
    fn test_slot_count_is_bounded() {
        assert!(config_from(&[("SMARTPARK_TOTAL_SLOTS", "1000")]).is_ok());
        assert!(config_from(&[("SMARTPARK_TOTAL_SLOTS", "9001")]).is_err());

        let mut config = AppConfig::default();
        config.total_slots = MAX_TOTAL_SLOTS + 1;
        assert!(config.validate().is_err());
    }
}
