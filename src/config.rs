// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "LIBROVIBE_CONFIG_PATH";
const ENV_BIND: &str = "LIBROVIBE_BIND";
const ENV_CACHE_PATH: &str = "LIBROVIBE_CACHE_PATH";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout. Clamped to 1..=60.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.clamp(1, 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    pub cache_path: PathBuf,
    pub http: HttpConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            cache_path: PathBuf::from("state/cache.json"),
            http: HttpConfig::default(),
        }
    }
}

/// Load config from an explicit path. TOML or JSON, chosen by extension.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = match ext.as_str() {
        "json" => serde_json::from_str(&content).context("parsing json config")?,
        _ => toml::from_str(&content).context("parsing toml config")?,
    };
    Ok(cfg)
}

/// Resolve config using env var + fallbacks, then apply env overrides:
/// 1) $LIBROVIBE_CONFIG_PATH
/// 2) config/librovibe.toml
/// 3) config/librovibe.json
/// 4) defaults
pub fn load_default() -> Result<AppConfig> {
    let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        load_from(&pb)?
    } else {
        let toml_p = PathBuf::from("config/librovibe.toml");
        let json_p = PathBuf::from("config/librovibe.json");
        if toml_p.exists() {
            load_from(&toml_p)?
        } else if json_p.exists() {
            load_from(&json_p)?
        } else {
            AppConfig::default()
        }
    };

    if let Ok(bind) = std::env::var(ENV_BIND) {
        if !bind.trim().is_empty() {
            cfg.bind = bind.trim().to_string();
        }
    }
    if let Ok(p) = std::env::var(ENV_CACHE_PATH) {
        if !p.trim().is_empty() {
            cfg.cache_path = PathBuf::from(p.trim());
        }
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str("bind = \"0.0.0.0:9000\"\n[http]\ntimeout_secs = 300\n").unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:9000");
        assert_eq!(cfg.cache_path, PathBuf::from("state/cache.json"));
        assert_eq!(cfg.http.timeout_secs(), 60);
        assert_eq!(cfg.http.accept_language, DEFAULT_ACCEPT_LANGUAGE);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_BIND);
        env::remove_var(ENV_CACHE_PATH);

        assert_eq!(load_default().unwrap(), AppConfig::default());

        let p_json = tmp.path().join("cfg.json");
        fs::write(&p_json, r#"{"cache_path":"/tmp/x.json"}"#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p_json.display().to_string());
        env::set_var(ENV_BIND, "0.0.0.0:1234");
        let cfg = load_default().unwrap();
        assert_eq!(cfg.cache_path, PathBuf::from("/tmp/x.json"));
        assert_eq!(cfg.bind, "0.0.0.0:1234");

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_BIND);
        env::set_current_dir(&old).unwrap();
    }
}
