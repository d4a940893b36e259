//! Configuration loading
//!
//! Values come from an optional TOML file, then environment variables
//! override them. The result is validated before anything else starts.
//!
//! ```toml
//! [credentials]
//! api_token = "..."
//! zone_id = "023e105f4ecef8ad9ca31a8372d0c353"
//!
//! [engine]
//! interval_secs = 1800
//! record_filter = "address"
//!
//! [log]
//! path = "/var/log/dns_updater.log"
//! ```

use anyhow::{Context, Result, bail};
use dns_updater_core::UpdaterConfig;
use std::path::{Path, PathBuf};

/// Path of the configuration file
pub const CONFIG_PATH_VAR: &str = "DNS_UPDATER_CONFIG";

/// File read when `DNS_UPDATER_CONFIG` is unset; may be absent
pub const DEFAULT_CONFIG_FILE: &str = "dns-updater.toml";

pub const API_TOKEN_VAR: &str = "CLOUDFLARE_API_TOKEN";
pub const ZONE_ID_VAR: &str = "CLOUDFLARE_ZONE_ID";
pub const INTERVAL_VAR: &str = "DNS_UPDATER_INTERVAL_SECS";
pub const IP_URL_VAR: &str = "DNS_UPDATER_IP_URL";
pub const IP_VERSION_VAR: &str = "DNS_UPDATER_IP_VERSION";
pub const API_BASE_VAR: &str = "DNS_UPDATER_API_BASE";
pub const RECORD_FILTER_VAR: &str = "DNS_UPDATER_RECORD_FILTER";
pub const MODE_VAR: &str = "DNS_UPDATER_MODE";
pub const LOG_FILE_VAR: &str = "DNS_UPDATER_LOG_FILE";
pub const LOG_LEVEL_VAR: &str = "DNS_UPDATER_LOG_LEVEL";
pub const LOG_CONSOLE_VAR: &str = "DNS_UPDATER_LOG_CONSOLE";

/// Load configuration from the process environment
pub fn load() -> Result<UpdaterConfig> {
    load_with(|key| std::env::var(key).ok())
}

/// Load configuration using `lookup` in place of the process environment
pub fn load_with<F>(lookup: F) -> Result<UpdaterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let mut config = match var(CONFIG_PATH_VAR) {
        Some(path) => read_file(Path::new(&path))?,
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                read_file(&default)?
            } else {
                UpdaterConfig::default()
            }
        }
    };

    apply_env(&mut config, &var)?;

    config.validate()?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<UpdaterConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn apply_env<F>(config: &mut UpdaterConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(API_TOKEN_VAR) {
        config.credentials.api_token = token.trim().to_string();
    }
    if let Some(zone) = lookup(ZONE_ID_VAR) {
        config.credentials.zone_id = zone.trim().to_string();
    }

    if let Some(interval) = lookup(INTERVAL_VAR) {
        config.engine.interval_secs = interval.trim().parse().with_context(|| {
            format!("{} must be a whole number of seconds. Got: {}", INTERVAL_VAR, interval)
        })?;
    }
    if let Some(filter) = lookup(RECORD_FILTER_VAR) {
        config.engine.record_filter = filter.parse()?;
    }

    if let Some(url) = lookup(IP_URL_VAR) {
        config.ip_source.url = url.trim().to_string();
    }
    if let Some(version) = lookup(IP_VERSION_VAR) {
        config.ip_source.version = version.parse()?;
    }

    if let Some(api_base) = lookup(API_BASE_VAR) {
        config.provider.api_base = api_base.trim().to_string();
    }
    if let Some(mode) = lookup(MODE_VAR) {
        config.provider.dry_run = match mode.trim().to_lowercase().as_str() {
            "live" => false,
            "dry-run" | "dry_run" | "dryrun" => true,
            other => bail!("{} '{}' is not valid. Valid modes: live, dry-run", MODE_VAR, other),
        };
    }

    if let Some(path) = lookup(LOG_FILE_VAR) {
        config.log.path = PathBuf::from(path.trim());
    }
    if let Some(level) = lookup(LOG_LEVEL_VAR) {
        config.log.level = level.trim().to_lowercase();
    }
    if let Some(console) = lookup(LOG_CONSOLE_VAR) {
        config.log.console = parse_flag(LOG_CONSOLE_VAR, &console)?;
    }

    Ok(())
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{} must be true or false. Got: {}", name, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_updater_core::config::{IpVersion, RecordFilter};
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_env_only() {
        let config = load_with(env(&[
            (API_TOKEN_VAR, "cf-live-token-0123456789"),
            (ZONE_ID_VAR, "023e105f4ecef8ad9ca31a8372d0c353"),
        ]))
        .unwrap();

        assert_eq!(config.credentials.zone_id, "023e105f4ecef8ad9ca31a8372d0c353");
        assert_eq!(config.engine.interval_secs, 1800);
        assert_eq!(config.engine.record_filter, RecordFilter::Address);
        assert_eq!(config.log.path, PathBuf::from("dns_updater.log"));
        assert!(!config.provider.dry_run);
    }

    #[test]
    fn test_missing_token_fails() {
        let err = load_with(env(&[(ZONE_ID_VAR, "zone-1")])).unwrap_err();
        assert!(err.to_string().contains("CLOUDFLARE_API_TOKEN"));
    }

    #[test]
    fn test_missing_zone_fails() {
        let err = load_with(env(&[(API_TOKEN_VAR, "cf-live-token-0123456789")])).unwrap_err();
        assert!(err.to_string().contains("CLOUDFLARE_ZONE_ID"));
    }

    #[test]
    fn test_empty_env_value_treated_as_unset() {
        let result = load_with(env(&[(API_TOKEN_VAR, "  "), (ZONE_ID_VAR, "zone-1")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_file_then_env_override() {
        let file = config_file(
            r#"
            [credentials]
            api_token = "file-token-abcdef123456"
            zone_id = "zone-from-file"

            [engine]
            interval_secs = 600
            record_filter = "all"

            [ip_source]
            version = "any"

            [log]
            path = "/tmp/updater.log"
            console = false
            "#,
        );
        let path = file.path().to_string_lossy().to_string();

        let config = load_with(env(&[
            (CONFIG_PATH_VAR, path.as_str()),
            (ZONE_ID_VAR, "zone-from-env"),
            (INTERVAL_VAR, "120"),
        ]))
        .unwrap();

        assert_eq!(config.credentials.api_token, "file-token-abcdef123456");
        assert_eq!(config.credentials.zone_id, "zone-from-env");
        assert_eq!(config.engine.interval_secs, 120);
        assert_eq!(config.engine.record_filter, RecordFilter::All);
        assert_eq!(config.ip_source.version, IpVersion::Any);
        assert_eq!(config.log.path, PathBuf::from("/tmp/updater.log"));
        assert!(!config.log.console);
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        let err = load_with(env(&[
            (CONFIG_PATH_VAR, missing.to_str().unwrap()),
            (API_TOKEN_VAR, "cf-live-token-0123456789"),
            (ZONE_ID_VAR, "zone-1"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_malformed_file_fails() {
        let file = config_file("[engine\ninterval_secs = ");
        let path = file.path().to_string_lossy().to_string();

        let err = load_with(env(&[(CONFIG_PATH_VAR, path.as_str())])).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_dry_run_mode() {
        let base = [
            (API_TOKEN_VAR, "cf-live-token-0123456789"),
            (ZONE_ID_VAR, "zone-1"),
        ];

        let mut pairs = base.to_vec();
        pairs.push((MODE_VAR, "dry-run"));
        assert!(load_with(env(&pairs)).unwrap().provider.dry_run);

        let mut pairs = base.to_vec();
        pairs.push((MODE_VAR, "LIVE"));
        assert!(!load_with(env(&pairs)).unwrap().provider.dry_run);

        let mut pairs = base.to_vec();
        pairs.push((MODE_VAR, "maybe"));
        assert!(load_with(env(&pairs)).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = [
            (API_TOKEN_VAR, "cf-live-token-0123456789"),
            (ZONE_ID_VAR, "zone-1"),
        ];

        for (key, value) in [
            (INTERVAL_VAR, "soon"),
            (INTERVAL_VAR, "5"),
            (INTERVAL_VAR, "100000"),
            (IP_VERSION_VAR, "v5"),
            (RECORD_FILTER_VAR, "some"),
            (IP_URL_VAR, "ftp://example.com/ip"),
            (API_BASE_VAR, "http://api.example.com/client/v4"),
            (LOG_LEVEL_VAR, "verbose"),
            (LOG_CONSOLE_VAR, "sometimes"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push((key, value));
            assert!(
                load_with(env(&pairs)).is_err(),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_loopback_api_base_allowed_over_http() {
        let config = load_with(env(&[
            (API_TOKEN_VAR, "cf-live-token-0123456789"),
            (ZONE_ID_VAR, "zone-1"),
            (API_BASE_VAR, "http://127.0.0.1:8080/client/v4"),
            (LOG_CONSOLE_VAR, "off"),
        ]))
        .unwrap();

        assert_eq!(config.provider.api_base, "http://127.0.0.1:8080/client/v4");
        assert!(!config.log.console);
    }
}
