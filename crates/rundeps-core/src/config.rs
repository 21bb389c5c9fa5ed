//! Session and installer configuration.
//!
//! Values come from `Default`, the `RUNDEPS_*` environment variables or the
//! `with_*` builders, and are checked by `validate()` before a session opens.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable for the primary package index.
pub const INDEX_URL_ENV: &str = "RUNDEPS_INDEX_URL";

/// Environment variable for extra indexes (whitespace or comma separated).
pub const EXTRA_INDEX_URLS_ENV: &str = "RUNDEPS_EXTRA_INDEX_URLS";

/// Environment variable for hosts trusted without TLS verification.
pub const TRUSTED_HOSTS_ENV: &str = "RUNDEPS_TRUSTED_HOSTS";

/// Environment variable for the Python interpreter path.
pub const PYTHON_ENV: &str = "RUNDEPS_PYTHON";

/// How missing requirements are handed to the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InstallStrategy {
    /// One installer run per requirement, each followed by its version check.
    #[default]
    PerPackage,
    /// A single installer run for all requirements, then a version-check pass.
    Batch,
}

impl InstallStrategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerPackage => "per-package",
            Self::Batch => "batch",
        }
    }
}

/// Installer invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Installer argv prefix; `install` and the package arguments follow it.
    pub program: Vec<String>,

    /// Primary index (`--index-url`).
    pub index_url: Option<String>,

    /// Additional indexes (`--extra-index-url`, one per entry).
    pub extra_index_urls: Vec<String>,

    /// Hosts passed as `--trusted-host`.
    pub trusted_hosts: Vec<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self::for_python("python3")
    }
}

impl InstallerConfig {
    /// Installer that runs `<python> -m pip`.
    #[must_use]
    pub fn for_python(python: &str) -> Self {
        Self {
            program: vec![python.to_string(), "-m".to_string(), "pip".to_string()],
            index_url: None,
            extra_index_urls: Vec::new(),
            trusted_hosts: Vec::new(),
        }
    }

    /// Build from the `RUNDEPS_*` environment variables.
    ///
    /// Unset or blank variables leave the default in place.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = match env_value(PYTHON_ENV) {
            Some(python) => Self::for_python(&python),
            None => Self::default(),
        };

        config.index_url = env_value(INDEX_URL_ENV);
        if let Some(urls) = env_value(EXTRA_INDEX_URLS_ENV) {
            config.extra_index_urls = split_list(&urls);
        }
        if let Some(hosts) = env_value(TRUSTED_HOSTS_ENV) {
            config.trusted_hosts = split_list(&hosts);
        }

        config
    }

    #[must_use]
    pub fn with_program(mut self, program: Vec<String>) -> Self {
        self.program = program;
        self
    }

    #[must_use]
    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_extra_index_url(mut self, url: impl Into<String>) -> Self {
        self.extra_index_urls.push(url.into());
        self
    }

    #[must_use]
    pub fn with_trusted_host(mut self, host: impl Into<String>) -> Self {
        self.trusted_hosts.push(host.into());
        self
    }

    /// Index/mirror/trust options in installer argument order.
    #[must_use]
    pub fn index_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(url) = &self.index_url {
            args.push("--index-url".to_string());
            args.push(url.clone());
        }
        for url in &self.extra_index_urls {
            args.push("--extra-index-url".to_string());
            args.push(url.clone());
        }
        for host in &self.trusted_hosts {
            args.push("--trusted-host".to_string());
            args.push(host.clone());
        }
        args
    }

    /// Check that the program is set and every index is an absolute URL.
    pub fn validate(&self) -> Result<()> {
        if self.program.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(Error::InvalidConfig {
                field: "program",
                reason: "installer program cannot be empty".to_string(),
            });
        }

        if let Some(url) = &self.index_url {
            check_url("index_url", url)?;
        }
        for url in &self.extra_index_urls {
            check_url("extra_index_urls", url)?;
        }

        if let Some(host) = self.trusted_hosts.iter().find(|h| h.trim().is_empty()) {
            return Err(Error::InvalidConfig {
                field: "trusted_hosts",
                reason: format!("invalid host '{host}'"),
            });
        }

        Ok(())
    }
}

/// Session settings for a dependency manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Install missing required packages on close instead of failing fast.
    pub install_if_missing: bool,

    pub strategy: InstallStrategy,

    pub installer: InstallerConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            install_if_missing: true,
            strategy: InstallStrategy::default(),
            installer: InstallerConfig::default(),
        }
    }
}

impl ManagerConfig {
    #[must_use]
    pub fn new(installer: InstallerConfig) -> Self {
        Self {
            installer,
            ..Default::default()
        }
    }

    /// Defaults with installer settings taken from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(InstallerConfig::from_env())
    }

    #[must_use]
    pub fn with_install_if_missing(mut self, install: bool) -> Self {
        self.install_if_missing = install;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: InstallStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_installer(mut self, installer: InstallerConfig) -> Self {
        self.installer = installer;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.installer.validate()
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_url(field: &'static str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| Error::InvalidConfig {
        field,
        reason: format!("'{value}': {e}"),
    })?;

    if !matches!(url.scheme(), "http" | "https" | "file") {
        return Err(Error::InvalidConfig {
            field,
            reason: format!("'{value}': unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(())
}
