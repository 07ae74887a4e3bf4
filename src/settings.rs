use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    /// Applied to every outbound provider call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("marketfeed/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Optional provider credentials. A missing key puts that provider in its
/// public (rate-limited) mode.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ApiKeys {
    #[serde(default)]
    pub coinglass: Option<String>,
    #[serde(default)]
    pub messari: Option<String>,
    #[serde(default)]
    pub cryptocompare: Option<String>,
}

impl ApiKeys {
    fn fill_from_env(&mut self) {
        fn lookup(slot: &mut Option<String>, var: &str) {
            if slot.as_deref().map_or(true, str::is_empty) {
                *slot = env::var(var).ok().filter(|v| !v.is_empty());
            }
        }
        lookup(&mut self.coinglass, "COINGLASS_API_KEY");
        lookup(&mut self.messari, "MESSARI_API_KEY");
        lookup(&mut self.cryptocompare, "CRYPTOCOMPARE_API_KEY");
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregateSettings {
    #[serde(default = "default_assets_ttl_secs")]
    pub assets_ttl_secs: u64,
    #[serde(default = "default_global_ttl_secs")]
    pub global_ttl_secs: u64,
    #[serde(default = "default_exchanges_ttl_secs")]
    pub exchanges_ttl_secs: u64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_assets_ttl_secs() -> u64 {
    60
}

fn default_global_ttl_secs() -> u64 {
    300
}

fn default_exchanges_ttl_secs() -> u64 {
    300
}

fn default_limit() -> usize {
    100
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            assets_ttl_secs: default_assets_ttl_secs(),
            global_ttl_secs: default_global_ttl_secs(),
            exchanges_ttl_secs: default_exchanges_ttl_secs(),
            default_limit: default_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub keys: ApiKeys,
    #[serde(default)]
    pub aggregate: AggregateSettings,
}

impl Settings {
    /// Defaults, then `marketfeed.{toml,json}` (or `$MARKETFEED_CONFIG`) if
    /// present, then `MARKETFEED_<SECTION>__<KEY>` variables, then the plain
    /// `<PROVIDER>_API_KEY` variables for any key still unset.
    pub fn load() -> Result<Self> {
        let path = env::var("MARKETFEED_CONFIG").unwrap_or_else(|_| "marketfeed".to_owned());
        let mut cfg = Config::default();
        cfg.merge(File::with_name(&path).required(false))
            .with_context(|| format!("Reading config file {}", path))?;
        cfg.merge(Environment::with_prefix("MARKETFEED").separator("__"))
            .context("Reading MARKETFEED_* environment")?;
        let mut settings: Settings = cfg.try_into().context("Parsing settings")?;
        settings.keys.fill_from_env();
        Ok(settings)
    }
}
