use crate::errors::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_STORE_PATH: &str = "nodelog.db";
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 60;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_HOST_CONCURRENCY: usize = 4;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;
pub const DEFAULT_REFRESH_INTERVAL: u64 = 3600;

pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<ConfigFile> {
    let mut config = ConfigFile::default();

    if let Some(c) = load_from("/etc/nodelog.conf")? {
        config.update(c);
    }

    if let Ok(path) = config_path() {
        if let Some(c) = load_from(path)? {
            config.update(c);
        }
    }

    if let Some(path) = path {
        let c = load_from(path)?.ok_or_else(|| format_err!("Failed to read config file"))?;
        config.update(c);
    }

    if config.jenkins.url.is_none() {
        if let Some(url) = legacy_endpoint()? {
            debug!("Using jenkins url from ~/.jenkins");
            config.jenkins.url = Some(url);
        }
    }

    Ok(config)
}

fn config_path() -> Result<PathBuf> {
    let config_dir =
        dirs_next::config_dir().ok_or_else(|| format_err!("Failed to find config dir"))?;
    Ok(config_dir.join("nodelog.conf"))
}

fn load_from<P: AsRef<Path>>(path: P) -> Result<Option<ConfigFile>> {
    if let Ok(buf) = fs::read_to_string(path.as_ref()) {
        debug!("loading config file {:?}", path.as_ref());
        let config = toml::from_str(&buf).context("Failed to load config")?;
        Ok(Some(config))
    } else {
        Ok(None)
    }
}

/// Older setups kept the jenkins url on the first line of `~/.jenkins`.
fn legacy_endpoint() -> Result<Option<String>> {
    let Some(home) = dirs_next::home_dir() else {
        return Ok(None);
    };
    read_legacy_endpoint(home.join(".jenkins"))
}

fn read_legacy_endpoint<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    let Ok(buf) = fs::read_to_string(path.as_ref()) else {
        return Ok(None);
    };
    let line = buf.lines().next().map(str::trim).unwrap_or_default();
    if line.is_empty() {
        bail!("Legacy config {:?} has no url on its first line", path.as_ref());
    }
    Ok(Some(line.to_string()))
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub jenkins: JenkinsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl ConfigFile {
    pub fn update(&mut self, c: ConfigFile) {
        self.jenkins.update(c.jenkins);
        self.store.update(c.store);
        self.refresh.update(c.refresh);
    }
}

#[derive(Default, Clone, Deserialize)]
pub struct JenkinsConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<u64>,
}

fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("redacted"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

impl fmt::Debug for JenkinsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JenkinsConfig")
            .field("url", &self.url.as_deref().map(redact_url))
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl JenkinsConfig {
    pub fn update(&mut self, c: JenkinsConfig) {
        if c.url.is_some() {
            self.url = c.url;
        }
        if c.user.is_some() {
            self.user = c.user;
        }
        if c.password.is_some() {
            self.password = c.password;
        }
        if c.timeout.is_some() {
            self.timeout = c.timeout;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn update(&mut self, c: StoreConfig) {
        if c.path.is_some() {
            self.path = c.path;
        }
    }

    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RefreshConfig {
    concurrency: Option<usize>,
    host_concurrency: Option<usize>,
    channel_capacity: Option<usize>,
    update: Option<bool>,
    interval: Option<u64>,
}

impl RefreshConfig {
    pub fn update(&mut self, c: RefreshConfig) {
        if c.concurrency.is_some() {
            self.concurrency = c.concurrency;
        }
        if c.host_concurrency.is_some() {
            self.host_concurrency = c.host_concurrency;
        }
        if c.channel_capacity.is_some() {
            self.channel_capacity = c.channel_capacity;
        }
        if c.update.is_some() {
            self.update = c.update;
        }
        if c.interval.is_some() {
            self.interval = c.interval;
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1)
    }

    pub fn host_concurrency(&self) -> usize {
        self.host_concurrency
            .unwrap_or(DEFAULT_HOST_CONCURRENCY)
            .max(1)
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY)
            .max(1)
    }

    pub fn force_update(&mut self) {
        self.update = Some(true);
    }

    pub fn update_existing(&self) -> bool {
        self.update.unwrap_or(false)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.unwrap_or(DEFAULT_REFRESH_INTERVAL))
    }
}
