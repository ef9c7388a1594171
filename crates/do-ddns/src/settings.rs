//! Environment configuration for the `do-ddns` binary
//!
//! Every variable is read through a lookup function so the loader can be
//! exercised without touching the process environment.

use anyhow::{Context, Result};
use ddns_core::DdnsConfig;
use std::path::PathBuf;
use tracing::Level;

/// Everything the binary needs to start a run
#[derive(Debug)]
pub struct Settings {
    /// Validated run configuration
    pub ddns: DdnsConfig,
    /// Maximum log level
    pub log_level: Level,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`
    ///
    /// Empty values count as unset. Unparseable values and anything
    /// `DdnsConfig::validate` rejects are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let token = var("DO_DDNS_TOKEN")
            .or_else(|| var("DIGITALOCEAN_TOKEN"))
            .context(
                "DO_DDNS_TOKEN is required. \
                Set it via: export DO_DDNS_TOKEN=your_token",
            )?;
        check_not_placeholder(&token)?;

        let domain = var("DO_DDNS_DOMAIN").context(
            "DO_DDNS_DOMAIN is required. \
            Set it via: export DO_DDNS_DOMAIN=example.com",
        )?;
        let name = var("DO_DDNS_NAME").context(
            "DO_DDNS_NAME is required. \
            Set it via: export DO_DDNS_NAME=home (or @ for the apex)",
        )?;

        let mut ddns = DdnsConfig::new(token, domain, name);

        if let Some(record_type) = var("DO_DDNS_TYPE") {
            ddns.record.record_type = record_type;
        }
        if let Some(ttl) = parse_var(&var, "DO_DDNS_TTL")? {
            ddns.record.ttl = ttl;
        }
        if let Some(url) = var("DO_DDNS_IP_SOURCE") {
            ddns.ip_source.url = url;
        }
        if let Some(dir) = var("DO_DDNS_STATE_DIR") {
            ddns.state.dir = PathBuf::from(dir);
        }
        if let Some(base) = var("DO_DDNS_API_BASE") {
            ddns.provider.api_base = base;
        }

        let engine = &mut ddns.engine;
        if let Some(per_page) = parse_var(&var, "DO_DDNS_PER_PAGE")? {
            engine.per_page = per_page;
        }
        if let Some(max_pages) = parse_var(&var, "DO_DDNS_MAX_PAGES")? {
            engine.max_pages = max_pages;
        }
        if let Some(max_retries) = parse_var(&var, "DO_DDNS_MAX_RETRIES")? {
            engine.max_retries = max_retries;
        }
        if let Some(secs) = parse_var(&var, "DO_DDNS_TIMEOUT_SECS")? {
            engine.run_timeout_secs = secs;
        }
        if let Some(cleanup) = bool_var(&var, "DO_DDNS_CLEANUP_DUPLICATES")? {
            engine.cleanup_duplicates = cleanup;
        }
        if let Some(use_cache) = bool_var(&var, "DO_DDNS_USE_CACHE")? {
            engine.use_cache = use_cache;
        }
        engine.dry_run = match bool_var(&var, "DO_DDNS_DRY_RUN")? {
            Some(dry_run) => dry_run,
            None => var("DDNS_MODE").is_some_and(|mode| mode.eq_ignore_ascii_case("dry-run")),
        };

        ddns.validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        let verbose = bool_var(&var, "DO_DDNS_VERBOSE")?.unwrap_or(false);
        let log_level = if verbose {
            Level::DEBUG
        } else {
            parse_log_level(var("DO_DDNS_LOG_LEVEL").as_deref().unwrap_or("info"))?
        };

        Ok(Self { ddns, log_level })
    }
}

/// Reject obvious placeholder tokens (common copy-paste mistake)
fn check_not_placeholder(token: &str) -> Result<()> {
    let token_lower = token.to_lowercase();
    if token_lower.contains("your_token")
        || token_lower.contains("replace_me")
        || token_lower == "token"
    {
        anyhow::bail!(
            "DO_DDNS_TOKEN appears to be a placeholder. \
            Use a personal access token with DNS read/write scope."
        );
    }
    Ok(())
}

fn parse_var<T, F>(var: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", name, raw, e))
        })
        .transpose()
}

fn bool_var<F>(var: &F, name: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|raw| match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!(
                "{} must be a boolean (true/false, yes/no, 1/0). Got: {}",
                name,
                raw
            ),
        })
        .transpose()
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DO_DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DO_DDNS_TOKEN", "dop_v1_abc123"),
        ("DO_DDNS_DOMAIN", "example.com"),
        ("DO_DDNS_NAME", "home"),
    ];

    #[test]
    fn required_only_uses_defaults() {
        let settings = load(&REQUIRED).unwrap();

        assert_eq!(settings.ddns.provider.domain, "example.com");
        assert_eq!(settings.ddns.record.name, "home");
        assert_eq!(settings.ddns.record.ttl, 300);
        assert_eq!(settings.ddns.engine.per_page, 200);
        assert_eq!(settings.ddns.engine.max_retries, 5);
        assert!(!settings.ddns.engine.cleanup_duplicates);
        assert!(!settings.ddns.engine.use_cache);
        assert!(!settings.ddns.engine.dry_run);
        assert_eq!(settings.log_level, Level::INFO);
    }

    #[test]
    fn missing_required_values_fail() {
        for skip in 0..REQUIRED.len() {
            let vars: Vec<_> = REQUIRED
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, kv)| *kv)
                .collect();
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains(REQUIRED[skip].0), "{}", err);
        }
    }

    #[test]
    fn empty_values_count_as_missing() {
        let err = load(&[
            ("DO_DDNS_TOKEN", "  "),
            ("DO_DDNS_DOMAIN", "example.com"),
            ("DO_DDNS_NAME", "home"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("DO_DDNS_TOKEN"));
    }

    #[test]
    fn falls_back_to_digitalocean_token() {
        let settings = load(&[
            ("DIGITALOCEAN_TOKEN", "dop_v1_fallback"),
            ("DO_DDNS_DOMAIN", "example.com"),
            ("DO_DDNS_NAME", "home"),
        ])
        .unwrap();
        assert_eq!(settings.ddns.provider.api_token, "dop_v1_fallback");
    }

    #[test]
    fn tunables_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("DO_DDNS_TTL", "600"),
            ("DO_DDNS_PER_PAGE", "50"),
            ("DO_DDNS_MAX_PAGES", "4"),
            ("DO_DDNS_MAX_RETRIES", "3"),
            ("DO_DDNS_TIMEOUT_SECS", "20"),
            ("DO_DDNS_CLEANUP_DUPLICATES", "yes"),
            ("DO_DDNS_USE_CACHE", "TRUE"),
            ("DO_DDNS_STATE_DIR", "/run/do-ddns"),
            ("DO_DDNS_IP_SOURCE", "https://ifconfig.me/ip"),
            ("DO_DDNS_LOG_LEVEL", "warn"),
        ]);
        let settings = load(&vars).unwrap();
        let engine = &settings.ddns.engine;

        assert_eq!(settings.ddns.record.ttl, 600);
        assert_eq!(engine.per_page, 50);
        assert_eq!(engine.max_pages, 4);
        assert_eq!(engine.max_retries, 3);
        assert_eq!(engine.run_timeout_secs, 20);
        assert!(engine.cleanup_duplicates);
        assert!(engine.use_cache);
        assert_eq!(settings.ddns.state.dir, PathBuf::from("/run/do-ddns"));
        assert_eq!(settings.ddns.ip_source.url, "https://ifconfig.me/ip");
        assert_eq!(settings.log_level, Level::WARN);
    }

    #[test]
    fn unparseable_values_fail() {
        for (name, value) in [
            ("DO_DDNS_TTL", "five minutes"),
            ("DO_DDNS_PER_PAGE", "-1"),
            ("DO_DDNS_USE_CACHE", "maybe"),
            ("DO_DDNS_LOG_LEVEL", "loud"),
        ] {
            let mut vars = REQUIRED.to_vec();
            vars.push((name, value));
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains(name), "{}", err);
        }
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("DO_DDNS_PER_PAGE", "500"));
        assert!(load(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("DO_DDNS_TYPE", "AAAA"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn dry_run_via_mode_or_flag() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("DDNS_MODE", "dry-run"));
        assert!(load(&vars).unwrap().ddns.engine.dry_run);

        let mut vars = REQUIRED.to_vec();
        vars.push(("DO_DDNS_DRY_RUN", "1"));
        assert!(load(&vars).unwrap().ddns.engine.dry_run);

        // The explicit flag wins over the mode
        let mut vars = REQUIRED.to_vec();
        vars.push(("DDNS_MODE", "dry-run"));
        vars.push(("DO_DDNS_DRY_RUN", "false"));
        assert!(!load(&vars).unwrap().ddns.engine.dry_run);
    }

    #[test]
    fn verbose_forces_debug() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("DO_DDNS_LOG_LEVEL", "error"));
        vars.push(("DO_DDNS_VERBOSE", "true"));
        assert_eq!(load(&vars).unwrap().log_level, Level::DEBUG);
    }

    #[test]
    fn placeholder_token_is_rejected() {
        let err = load(&[
            ("DO_DDNS_TOKEN", "your_token"),
            ("DO_DDNS_DOMAIN", "example.com"),
            ("DO_DDNS_NAME", "home"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn debug_output_hides_token() {
        let settings = load(&REQUIRED).unwrap();
        assert!(!format!("{:?}", settings).contains("dop_v1_abc123"));
    }
}
