//! Runtime configuration.
//!
//! Layers, lowest precedence first:
//!
//! | Layer        | Source                                  |
//! |--------------|-----------------------------------------|
//! | built-in     | `DEFAULT_*` constants below             |
//! | file         | TOML passed with `--config`             |
//! | environment  | `MONDAY_*` / `DOCFILL_*` variables      |
//! | CLI flags    | applied by the binary after loading     |

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use docgen::{BatchPolicy, DEFAULT_ORDER_GROUP, DEFAULT_TEMPLATE_BOARD};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://api.monday.com/v2";
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_STORE_PATH: &str = ".docfill/storage.json";
pub const DEFAULT_OUTPUT_DIR: &str = "filled";
/// Hosts the relay fetches from; subdomains are included.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &["files-monday-com.s3.amazonaws.com", "monday.com"];

pub const ENV_API_URL: &str = "MONDAY_API_URL";
pub const ENV_API_TOKEN: &str = "MONDAY_API_TOKEN";
pub const ENV_API_VERSION: &str = "MONDAY_API_VERSION";
pub const ENV_RELAY_URL: &str = "DOCFILL_RELAY_URL";
pub const ENV_BIND_ADDR: &str = "DOCFILL_BIND_ADDR";
pub const ENV_ALLOWED_HOSTS: &str = "DOCFILL_ALLOWED_HOSTS";
pub const ENV_STORE_PATH: &str = "DOCFILL_STORE_PATH";
pub const ENV_OUTPUT_DIR: &str = "DOCFILL_OUTPUT_DIR";
pub const ENV_TEMPLATE_BOARD: &str = "DOCFILL_TEMPLATE_BOARD";
pub const ENV_TEMPLATE_GROUP: &str = "DOCFILL_TEMPLATE_GROUP";
pub const ENV_CACHE_TTL_SECS: &str = "DOCFILL_CACHE_TTL_SECS";
pub const ENV_BATCH_POLICY: &str = "DOCFILL_BATCH_POLICY";
pub const ENV_LINEBREAKS: &str = "DOCFILL_LINEBREAKS";

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DocfillConfig {
    /// Graph API endpoint.
    pub api_url: String,
    /// Value of the `Authorization` header, if any.
    pub api_token: Option<String>,
    /// Value of the `API-Version` header, if any.
    pub api_version: Option<String>,
    /// Base URL of the file relay, as seen by the client.
    pub relay_url: String,
    /// Listen address of `serve`.
    pub bind_addr: String,
    /// Hosts the relay may fetch from.
    pub allowed_hosts: Vec<String>,
    /// JSON file backing the key-value store.
    pub store_path: PathBuf,
    /// Where filled documents are written.
    pub output_dir: PathBuf,
    pub template_board: String,
    pub template_group: String,
    /// Order-type cache lifetime; `None` keeps entries until cleared.
    pub cache_ttl: Option<Duration>,
    pub batch_policy: BatchPolicy,
    /// Render `\n` in field values as line breaks.
    pub linebreaks: bool,
}

/// Shape of the optional TOML file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub api_version: Option<String>,
    pub relay_url: Option<String>,
    pub bind_addr: Option<String>,
    pub allowed_hosts: Option<Vec<String>>,
    pub store_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub template_board: Option<String>,
    pub template_group: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub batch_policy: Option<String>,
    pub linebreaks: Option<bool>,
}

/// Split a comma list of hosts, normalized to lowercase.
pub fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}

impl DocfillConfig {
    /// Built-in defaults only, ignoring the environment.
    pub fn builtin() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            api_version: None,
            relay_url: DEFAULT_RELAY_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            template_board: DEFAULT_TEMPLATE_BOARD.to_string(),
            template_group: DEFAULT_ORDER_GROUP.to_string(),
            cache_ttl: None,
            batch_policy: BatchPolicy::default(),
            linebreaks: true,
        }
    }

    /// Built-in defaults, then `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::builtin();
        if let Some(path) = path {
            config.apply_file(FileConfig::from_file(path)?)?;
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay the keys present in a config file.
    pub fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(v) = file.api_url {
            self.api_url = v;
        }
        if file.api_token.is_some() {
            self.api_token = file.api_token;
        }
        if file.api_version.is_some() {
            self.api_version = file.api_version;
        }
        if let Some(v) = file.relay_url {
            self.relay_url = v;
        }
        if let Some(v) = file.bind_addr {
            self.bind_addr = v;
        }
        if let Some(hosts) = file.allowed_hosts {
            self.allowed_hosts = parse_host_list(&hosts.join(","));
        }
        if let Some(v) = file.store_path {
            self.store_path = v;
        }
        if let Some(v) = file.output_dir {
            self.output_dir = v;
        }
        if let Some(v) = file.template_board {
            self.template_board = v;
        }
        if let Some(v) = file.template_group {
            self.template_group = v;
        }
        if let Some(secs) = file.cache_ttl_secs {
            self.cache_ttl = Some(Duration::from_secs(secs));
        }
        if let Some(policy) = file.batch_policy {
            self.batch_policy = policy
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid batch_policy in config file: {e}"))?;
        }
        if let Some(v) = file.linebreaks {
            self.linebreaks = v;
        }
        Ok(())
    }

    /// Overlay environment variables read through `lookup`.
    ///
    /// Unparseable numeric or policy values are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_API_URL) {
            self.api_url = v;
        }
        if let Some(v) = get(ENV_API_TOKEN) {
            self.api_token = Some(v);
        }
        if let Some(v) = get(ENV_API_VERSION) {
            self.api_version = Some(v);
        }
        if let Some(v) = get(ENV_RELAY_URL) {
            self.relay_url = v;
        }
        if let Some(v) = get(ENV_BIND_ADDR) {
            self.bind_addr = v;
        }
        if let Some(v) = get(ENV_ALLOWED_HOSTS) {
            self.allowed_hosts = parse_host_list(&v);
        }
        if let Some(v) = get(ENV_STORE_PATH) {
            self.store_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_TEMPLATE_BOARD) {
            self.template_board = v;
        }
        if let Some(v) = get(ENV_TEMPLATE_GROUP) {
            self.template_group = v;
        }
        if let Some(v) = get(ENV_CACHE_TTL_SECS) {
            match v.trim().parse::<u64>() {
                Ok(secs) => self.cache_ttl = Some(Duration::from_secs(secs)),
                Err(e) => warn!(value = %v, error = %e, "ignoring {ENV_CACHE_TTL_SECS}"),
            }
        }
        if let Some(v) = get(ENV_BATCH_POLICY) {
            match v.parse::<BatchPolicy>() {
                Ok(policy) => self.batch_policy = policy,
                Err(e) => warn!(error = %e, "ignoring {ENV_BATCH_POLICY}"),
            }
        }
        if let Some(v) = get(ENV_LINEBREAKS) {
            match v.trim().to_ascii_lowercase().parse::<bool>() {
                Ok(on) => self.linebreaks = on,
                Err(e) => warn!(value = %v, error = %e, "ignoring {ENV_LINEBREAKS}"),
            }
        }
    }
}

impl FileConfig {
    /// Load a config file from TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_builtin_defaults() {
        let config = DocfillConfig::builtin();
        assert_eq!(config.api_url, "https://api.monday.com/v2");
        assert_eq!(config.relay_url, "http://127.0.0.1:3000");
        assert_eq!(config.template_board, "TRA Templates");
        assert_eq!(config.template_group, "Orders");
        assert_eq!(
            config.allowed_hosts,
            vec!["files-monday-com.s3.amazonaws.com", "monday.com"]
        );
        assert_eq!(config.cache_ttl, None);
        assert_eq!(config.batch_policy, BatchPolicy::AbortOnError);
        assert!(config.linebreaks);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DocfillConfig::builtin();
        config.apply_env(env(&[
            (ENV_API_TOKEN, "secret"),
            (ENV_ALLOWED_HOSTS, " Files.Example , ,cdn.example"),
            (ENV_CACHE_TTL_SECS, "3600"),
            (ENV_BATCH_POLICY, "continue"),
            (ENV_LINEBREAKS, "FALSE"),
            (ENV_OUTPUT_DIR, ""),
        ]));
        assert!(!config.linebreaks);
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.allowed_hosts, vec!["files.example", "cdn.example"]);
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.batch_policy, BatchPolicy::ContinueOnError);
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = DocfillConfig::builtin();
        config.apply_env(env(&[
            (ENV_CACHE_TTL_SECS, "soon"),
            (ENV_BATCH_POLICY, "retry"),
            (ENV_LINEBREAKS, "sometimes"),
        ]));
        assert_eq!(config.cache_ttl, None);
        assert!(config.linebreaks);
        assert_eq!(config.batch_policy, BatchPolicy::AbortOnError);
    }

    #[test]
    fn test_file_layer_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docfill.toml");
        std::fs::write(
            &path,
            r#"
api_url = "http://graph.local/v2"
template_board = "Templates"
cache_ttl_secs = 60
batch_policy = "continue"
linebreaks = false
"#,
        )
        .unwrap();

        let mut config = DocfillConfig::builtin();
        config
            .apply_file(FileConfig::from_file(&path).unwrap())
            .unwrap();
        config.apply_env(env(&[(ENV_TEMPLATE_BOARD, "From Env")]));

        assert_eq!(config.api_url, "http://graph.local/v2");
        assert_eq!(config.template_board, "From Env");
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.batch_policy, BatchPolicy::ContinueOnError);
        assert!(!config.linebreaks);
    }

    #[test]
    fn test_file_rejects_unknown_keys_and_bad_policy() {
        assert!(toml::from_str::<FileConfig>("api_urll = \"x\"").is_err());

        let mut config = DocfillConfig::builtin();
        let file = FileConfig {
            batch_policy: Some("sometimes".into()),
            ..Default::default()
        };
        assert!(config.apply_file(file).is_err());
    }
}
