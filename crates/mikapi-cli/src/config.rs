// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use mikapi_app::Page;
use mikapi_db::TableNames;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_CURRENCY: &str = "¥";
const DEFAULT_LOG_LEVEL: &str = "info";

pub const URL_ENV: &str = "SUPABASE_URL";
pub const KEY_ENV: &str = "SUPABASE_SERVICE_ROLE_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            store: StoreSection::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSection {
    pub url: Option<String>,
    pub key: Option<String>,
    pub customers_table: Option<String>,
    pub orders_table: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub start_page: Option<String>,
    pub currency: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            start_page: Some(Page::Open.as_str().to_owned()),
            currency: Some(DEFAULT_CURRENCY.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

/// Connection settings after env overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub key: String,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("MIKAPI_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set MIKAPI_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(mikapi_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` at the top and keep values under [store], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        self.table_names()
            .validate()
            .with_context(|| format!("invalid [store] tables in {}", path.display()))?;

        if let Some(url) = &self.store.url {
            validate_url(url)
                .with_context(|| format!("invalid store.url in {}", path.display()))?;
        }

        if let Some(timeout) = &self.store.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "store.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(start_page) = &self.ui.start_page
            && !Page::LISTS
                .iter()
                .any(|page| page.as_str() == start_page.as_str())
        {
            bail!(
                "ui.start_page in {} must be \"open\" or \"settled\", got {:?}",
                path.display(),
                start_page
            );
        }

        if let Some(currency) = &self.ui.currency
            && currency.chars().count() > 4
        {
            bail!(
                "ui.currency in {} should be a short symbol like \"¥\", got {:?}",
                path.display(),
                currency
            );
        }

        Ok(())
    }

    /// Resolves the backend URL and key, preferring the environment over the
    /// file. Either one missing is an error.
    pub fn credentials(&self) -> Result<Credentials> {
        let url = env_or(URL_ENV, self.store.url.as_deref()).ok_or_else(|| {
            anyhow!("no store URL configured -- set {URL_ENV} or [store] url in the config file")
        })?;
        validate_url(&url).with_context(|| format!("invalid store URL {url:?}"))?;

        let key = env_or(KEY_ENV, self.store.key.as_deref()).ok_or_else(|| {
            anyhow!("no store key configured -- set {KEY_ENV} or [store] key in the config file")
        })?;

        Ok(Credentials { url, key })
    }

    pub fn table_names(&self) -> TableNames {
        let defaults = TableNames::default();
        TableNames {
            customers: self
                .store
                .customers_table
                .clone()
                .unwrap_or(defaults.customers),
            orders: self.store.orders_table.clone().unwrap_or(defaults.orders),
        }
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.store.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn start_page(&self) -> Page {
        self.ui
            .start_page
            .as_deref()
            .and_then(Page::parse)
            .filter(|page| Page::LISTS.contains(page))
            .unwrap_or(Page::Open)
    }

    pub fn currency(&self) -> &str {
        self.ui.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log] path in the config file")
        })?;
        Ok(data_root
            .join(mikapi_db::APP_NAME)
            .join(format!("{}.log", mikapi_db::APP_NAME)))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# mikapi config\n# Place this file at: {}\n\nversion = 1\n\n[store]\n# Both tables need an integer `id` key (bigint identity); uuid keys are not supported.\n# {} and {} override these two when set.\n# url = \"https://your-project.supabase.co\"\n# key = \"service-role-key\"\ncustomers_table = \"{}\"\norders_table = \"{}\"\ntimeout = \"{}\"\n\n[ui]\n# \"open\" or \"settled\"\nstart_page = \"open\"\ncurrency = \"{}\"\n\n[log]\n# MIKAPI_LOG overrides this with a full filter, for example mikapi_db=debug\nlevel = \"{}\"\n# path = \"/absolute/path/to/mikapi.log\"\n",
            path.display(),
            URL_ENV,
            KEY_ENV,
            mikapi_db::DEFAULT_CUSTOMERS_TABLE,
            mikapi_db::DEFAULT_ORDERS_TABLE,
            DEFAULT_TIMEOUT,
            DEFAULT_CURRENCY,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn env_or(name: &str, fallback: Option<&str>) -> Option<String> {
    env::var(name)
        .ok()
        .or_else(|| fallback.map(str::to_owned))
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn validate_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw.trim()).context("parse URL")?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => bail!("URL scheme must be http or https, got {other:?}"),
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("timeout {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
