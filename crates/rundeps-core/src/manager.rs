//! The dependency-management session.
//!
//! A [`DependencyManager`] collects [`PackageRequirement`]s, then on
//! [`close`](DependencyManager::close) probes which are missing, installs
//! them (or fails fast), verifies versions and binds every declared import
//! into the caller's namespace.
//!
//! ```text
//! Declaring --missing_packages--> Resolving --install--> Installing
//!     ^                               |                      |
//!     +------------ package ----------+                      v
//!                                     +----------------> Binding --> Closed
//! ```

use crate::binder::{bind, BindReport};
use crate::config::ManagerConfig;
use crate::error::{Error, Result};
use crate::host::{ModuleResolver, SymbolRegistry, VersionQuery};
use crate::installer::Installer;
use crate::probe::{find_missing, MissingSet};
use crate::process::{CommandLine, CommandRunner, SystemRunner};
use crate::requirement::PackageRequirement;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Declaring,
    Resolving,
    Installing,
    Binding,
    Closed,
}

impl SessionState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Declaring => "declaring",
            Self::Resolving => "resolving",
            Self::Installing => "installing",
            Self::Binding => "binding",
            Self::Closed => "closed",
        }
    }
}

/// What a completed install/bind pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Requirement strings handed to the installer, in order.
    pub installed: Vec<String>,
    /// Optional requirements that were unavailable and not installed.
    pub skipped_optional: Vec<String>,
    pub bind: BindReport,
}

/// Declares runtime requirements and makes them importable.
pub struct DependencyManager<H> {
    config: ManagerConfig,
    host: H,
    runner: Box<dyn CommandRunner>,
    requirements: Vec<PackageRequirement>,
    state: SessionState,
    missing: Option<MissingSet>,
}

impl<H: ModuleResolver + VersionQuery> DependencyManager<H> {
    /// Create a session without validating `config`.
    #[must_use]
    pub fn new(config: ManagerConfig, host: H) -> Self {
        Self {
            config,
            host,
            runner: Box::new(SystemRunner),
            requirements: Vec::new(),
            state: SessionState::Declaring,
            missing: None,
        }
    }

    /// Validate `config` and start a session.
    pub fn open(config: ManagerConfig, host: H) -> Result<Self> {
        config.validate()?;
        debug!(
            install_if_missing = config.install_if_missing,
            strategy = config.strategy.as_str(),
            "opening dependency session"
        );
        Ok(Self::new(config, host))
    }

    /// Replace the runner used for installer invocations.
    #[must_use]
    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Open a session, let `declare` add requirements, then close it.
    pub fn scope<N, F>(
        config: ManagerConfig,
        host: H,
        namespace: &mut N,
        declare: F,
    ) -> Result<SessionReport>
    where
        N: SymbolRegistry<H::Value> + ?Sized,
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let mut manager = Self::open(config, host)?;
        declare(&mut manager)?;
        manager.close(namespace)
    }

    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Declared requirements in declaration order.
    #[must_use]
    pub fn requirements(&self) -> &[PackageRequirement] {
        &self.requirements
    }

    /// Declare a requirement and return it for adding imports.
    pub fn package(
        &mut self,
        name: &str,
        constraint: &str,
        optional: bool,
    ) -> Result<&mut PackageRequirement> {
        let requirement = PackageRequirement::new(name, constraint, optional)?;
        debug!(requirement = %requirement, optional, "declared");

        self.state = SessionState::Declaring;
        self.missing = None;
        self.requirements.push(requirement);

        let last = self.requirements.len() - 1;
        Ok(&mut self.requirements[last])
    }

    /// Required requirements whose imports do not currently resolve.
    ///
    /// Computed on first use and remembered until a requirement is declared
    /// or an installation succeeds.
    pub fn missing_packages(&mut self) -> Result<Vec<&PackageRequirement>> {
        let missing = self.missing_set()?;
        Ok(missing
            .required
            .iter()
            .map(|&i| &self.requirements[i])
            .collect())
    }

    /// Installer invocations [`install`](Self::install) would run now.
    pub fn planned_commands(&mut self) -> Result<Vec<CommandLine>> {
        let missing = self.missing_set()?;
        let pending = self.select(&missing.required);
        self.installer().planned_commands(&pending)
    }

    /// Install missing required packages, verify versions, then bind every
    /// declared import into `namespace`.
    ///
    /// Installation and version errors abort before anything is bound.
    pub fn install<N>(&mut self, namespace: &mut N) -> Result<SessionReport>
    where
        N: SymbolRegistry<H::Value> + ?Sized,
    {
        let missing = self.missing_set()?;
        let mut report = SessionReport {
            skipped_optional: self.names(&missing.optional),
            ..SessionReport::default()
        };

        if !missing.is_empty() {
            self.state = SessionState::Installing;
            let pending = self.select(&missing.required);
            self.installer().install(&pending, &self.host)?;
            report.installed = pending.iter().map(|r| r.requirement_string()).collect();

            self.host.invalidate_caches();
            self.missing = None;
        }

        report.bind = self.bind_all(namespace);
        Ok(report)
    }

    /// Finish the session.
    ///
    /// With `install_if_missing` this is [`install`](Self::install). Otherwise
    /// any missing required package is reported and `MissingRequired` is
    /// returned without installing or binding anything.
    pub fn close<N>(&mut self, namespace: &mut N) -> Result<SessionReport>
    where
        N: SymbolRegistry<H::Value> + ?Sized,
    {
        let report = if self.config.install_if_missing {
            self.install(namespace)?
        } else {
            let missing = self.missing_set()?;
            if !missing.is_empty() {
                let names: Vec<String> = missing
                    .required
                    .iter()
                    .map(|&i| self.requirements[i].requirement_string())
                    .collect();
                for name in &names {
                    warn!("Missing required runtime module: {name}");
                }
                return Err(Error::MissingRequired { missing: names });
            }

            SessionReport {
                skipped_optional: self.names(&missing.optional),
                bind: self.bind_all(namespace),
                ..SessionReport::default()
            }
        };

        self.state = SessionState::Closed;
        Ok(report)
    }

    /// Like [`close`](Self::close), but exits the process with status 1 when
    /// required packages are missing.
    pub fn close_or_exit<N>(&mut self, namespace: &mut N) -> Result<SessionReport>
    where
        N: SymbolRegistry<H::Value> + ?Sized,
    {
        match self.close(namespace) {
            Err(e @ Error::MissingRequired { .. }) => std::process::exit(e.exit_code()),
            other => other,
        }
    }

    /// Declare one requirement (optionally importing `module`) and run the
    /// full install pipeline for the whole session right away.
    pub fn immediately_install_package<N>(
        &mut self,
        name: &str,
        constraint: &str,
        optional: bool,
        module: Option<&str>,
        namespace: &mut N,
    ) -> Result<SessionReport>
    where
        N: SymbolRegistry<H::Value> + ?Sized,
    {
        let outcome = self.declare_and_install(name, constraint, optional, module, namespace);

        if let Err(e) = &outcome {
            error!("Unable to install package: `{name}' due to: {e}");
        }
        outcome
    }

    fn declare_and_install<N>(
        &mut self,
        name: &str,
        constraint: &str,
        optional: bool,
        module: Option<&str>,
        namespace: &mut N,
    ) -> Result<SessionReport>
    where
        N: SymbolRegistry<H::Value> + ?Sized,
    {
        let requirement = self.package(name, constraint, optional)?;
        if let Some(module) = module {
            requirement.import_module(module);
        }
        self.install(namespace)
    }

    fn missing_set(&mut self) -> Result<MissingSet> {
        if let Some(missing) = &self.missing {
            return Ok(missing.clone());
        }

        self.state = SessionState::Resolving;
        let missing = find_missing(&self.host, &self.requirements)?;
        if !missing.is_empty() {
            info!(
                count = missing.required.len(),
                "missing required runtime dependencies"
            );
        }
        self.missing = Some(missing.clone());
        Ok(missing)
    }

    fn select(&self, indices: &[usize]) -> Vec<&PackageRequirement> {
        indices.iter().map(|&i| &self.requirements[i]).collect()
    }

    fn names(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .map(|&i| self.requirements[i].name().to_string())
            .collect()
    }

    fn installer(&self) -> Installer<'_> {
        Installer::new(&self.config.installer, self.config.strategy, &*self.runner)
    }

    fn bind_all<N>(&mut self, namespace: &mut N) -> BindReport
    where
        N: SymbolRegistry<H::Value> + ?Sized,
    {
        self.state = SessionState::Binding;
        let mut report = BindReport::default();
        for requirement in &self.requirements {
            report.merge(bind(&self.host, requirement, namespace));
        }
        report
    }
}
