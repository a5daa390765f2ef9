// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use orderdesk_app::{OrderStatus, SessionConfig};
use orderdesk_tui::{ORDER_SECTIONS, OrderRow};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000/admin/orders/order";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";
pub const CONFIG_PATH_ENV: &str = "ORDERDESK_CONFIG_PATH";
pub const PAGE_TOKEN_ENV: &str = "ORDERDESK_TOKEN";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub page: Page,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub update_path: Option<String>,
    pub lookup_path: Option<String>,
    pub lookup_param: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fields {
    pub status: Option<String>,
    pub identity: Option<String>,
    pub product: Option<String>,
    pub price: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

/// The change-list page the console renders when not in demo mode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    /// Form token copied from the admin page.
    pub token: Option<String>,
    pub time_zone: Option<String>,
    #[serde(default)]
    pub orders: Vec<PageOrder>,
    #[serde(default)]
    pub products: Vec<PageProduct>,
    #[serde(default)]
    pub sections: Vec<PageSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageOrder {
    pub id: i64,
    pub customer: String,
    pub status: String,
    pub product: Option<i64>,
    pub price: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageProduct {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageSection {
    pub key: Option<String>,
    pub title: String,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(orderdesk_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                version: CONFIG_VERSION,
                ..Self::default()
            });
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
                    "config file {} is not versioned. Add `version = 1` and put values under [server], [storage], [fields], and [log]",
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
        if let Some(db_path) = &self.storage.db_path {
            orderdesk_db::validate_db_path(db_path)?;
        }

        if let Some(timeout) = &self.server.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "server.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        for (name, value) in [
            ("fields.status", &self.fields.status),
            ("fields.identity", &self.fields.identity),
            ("fields.product", &self.fields.product),
            ("fields.price", &self.fields.price),
            ("fields.token", &self.fields.token),
            ("server.lookup_param", &self.server.lookup_param),
        ] {
            if let Some(value) = value
                && value.trim().is_empty()
            {
                bail!("{name} in {} must not be empty", path.display());
            }
        }

        let mut ids = BTreeSet::new();
        for order in &self.page.orders {
            if !ids.insert(order.id) {
                bail!(
                    "page.orders in {} lists order {} twice",
                    path.display(),
                    order.id
                );
            }
            order_status(order)?;
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => orderdesk_db::default_db_path(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn update_path(&self) -> &str {
        self.server
            .update_path
            .as_deref()
            .unwrap_or(orderdesk_http::DEFAULT_UPDATE_PATH)
    }

    pub fn lookup_path(&self) -> &str {
        self.server
            .lookup_path
            .as_deref()
            .unwrap_or(orderdesk_http::DEFAULT_LOOKUP_PATH)
    }

    pub fn lookup_param(&self) -> &str {
        self.server
            .lookup_param
            .as_deref()
            .unwrap_or(orderdesk_http::DEFAULT_LOOKUP_PARAM)
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        let pick = |value: &Option<String>, fallback: String| {
            value
                .as_deref()
                .map(|value| value.trim().to_owned())
                .unwrap_or(fallback)
        };
        SessionConfig {
            status_field: pick(&self.fields.status, defaults.status_field),
            identity_field: pick(&self.fields.identity, defaults.identity_field),
            product_field: pick(&self.fields.product, defaults.product_field),
            price_field: pick(&self.fields.price, defaults.price_field),
            token_field: pick(&self.fields.token, defaults.token_field),
        }
    }

    /// `ORDERDESK_TOKEN` wins over `[page].token`.
    pub fn page_token(&self) -> Result<String> {
        self.resolve_token(env::var(PAGE_TOKEN_ENV).ok())
    }

    fn resolve_token(&self, from_env: Option<String>) -> Result<String> {
        from_env
            .filter(|token| !token.trim().is_empty())
            .or_else(|| self.page.token.clone())
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| anyhow!("no form token; set [page].token or {PAGE_TOKEN_ENV}"))
    }

    pub fn page_rows(&self) -> Result<Vec<OrderRow>> {
        if self.page.orders.is_empty() {
            bail!("[page] lists no orders; add [[page.orders]] entries or run with --demo");
        }
        self.page
            .orders
            .iter()
            .map(|order| {
                Ok(OrderRow {
                    id: order.id,
                    customer: order.customer.clone(),
                    status: order_status(order)?,
                    product: order.product,
                    price: order.price.clone(),
                })
            })
            .collect()
    }

    pub fn catalog(&self) -> Vec<(i64, String)> {
        self.page
            .products
            .iter()
            .map(|product| (product.id, product.name.clone()))
            .collect()
    }

    /// Configured sections, or the stock order form sections.
    pub fn page_sections(&self) -> Vec<(Option<&str>, &str)> {
        if self.page.sections.is_empty() {
            return ORDER_SECTIONS.to_vec();
        }
        self.page
            .sections
            .iter()
            .map(|section| (section.key.as_deref(), section.title.as_str()))
            .collect()
    }

    pub fn time_zone(&self) -> Option<&str> {
        self.page.time_zone.as_deref()
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file to a writable path")
        })?;
        let app_dir = data_root.join(orderdesk_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create data directory {}", app_dir.display()))?;
        Ok(app_dir.join("orderdesk.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# orderdesk config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\nupdate_path = \"{}\"\nlookup_path = \"{}\"\nlookup_param = \"{}\"\ntimeout = \"{}\"\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/orderdesk/orderdesk.db)\n# db_path = \"/absolute/path/to/orderdesk.db\"\n\n[fields]\nstatus = \"status\"\nidentity = \"id\"\nproduct = \"product\"\nprice = \"price\"\ntoken = \"csrfmiddlewaretoken\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/orderdesk.log\"\n\n[page]\n# Or set {PAGE_TOKEN_ENV}.\ntoken = \"paste-csrfmiddlewaretoken-here\"\ntime_zone = \"Europe/Moscow\"\n\n[[page.products]]\nid = 11\nname = \"Spring Tulips\"\n\n[[page.orders]]\nid = 1041\ncustomer = \"Avery\"\nstatus = \"created\"\nproduct = 11\nprice = \"1450,00\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            orderdesk_http::DEFAULT_UPDATE_PATH,
            orderdesk_http::DEFAULT_LOOKUP_PATH,
            orderdesk_http::DEFAULT_LOOKUP_PARAM,
            DEFAULT_TIMEOUT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn order_status(order: &PageOrder) -> Result<OrderStatus> {
    OrderStatus::parse(order.status.trim()).ok_or_else(|| {
        anyhow!(
            "page.orders: order {} has unknown status {:?}",
            order.id,
            order.status
        )
    })
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
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
