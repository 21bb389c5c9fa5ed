//! Host package installer invocation.

use crate::checker::check_version;
use crate::config::{InstallStrategy, InstallerConfig};
use crate::error::{Error, Result};
use crate::host::VersionQuery;
use crate::process::{CommandLine, CommandOutput, CommandRunner};
use crate::registry::canonical_name;
use crate::requirement::PackageRequirement;
use tracing::{debug, error, info};

/// Installer stderr marker for "the index has nothing that matches".
const NO_MATCHING_DISTRIBUTION: &str = "No matching distribution";

/// Runs the configured installer for missing requirements.
pub struct Installer<'a> {
    config: &'a InstallerConfig,
    strategy: InstallStrategy,
    runner: &'a dyn CommandRunner,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(
        config: &'a InstallerConfig,
        strategy: InstallStrategy,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            config,
            strategy,
            runner,
        }
    }

    /// Render the invocation that installs `requirements` in one run.
    pub fn command_for(&self, requirements: &[&PackageRequirement]) -> Result<CommandLine> {
        let base = CommandLine::from_argv(&self.config.program).ok_or_else(|| Error::InvalidConfig {
            field: "program",
            reason: "installer program cannot be empty".to_string(),
        })?;

        Ok(base
            .arg("install")
            .args(self.config.index_args())
            .args(requirements.iter().map(|r| r.requirement_string())))
    }

    /// Every invocation [`install`](Self::install) would run, in order.
    pub fn planned_commands(&self, requirements: &[&PackageRequirement]) -> Result<Vec<CommandLine>> {
        if requirements.is_empty() {
            return Ok(Vec::new());
        }

        match self.strategy {
            InstallStrategy::PerPackage => requirements
                .iter()
                .map(|r| self.command_for(std::slice::from_ref(r)))
                .collect(),
            InstallStrategy::Batch => Ok(vec![self.command_for(requirements)?]),
        }
    }

    /// Install `requirements` and verify each declared constraint.
    ///
    /// # Errors
    /// `PackageNotFound` when the index has no matching distribution,
    /// `InstallationFailed` for any other installer failure, `Spawn` if the
    /// installer cannot be started, plus any version-check failure.
    pub fn install<Q: VersionQuery + ?Sized>(
        &self,
        requirements: &[&PackageRequirement],
        versions: &Q,
    ) -> Result<()> {
        match self.strategy {
            InstallStrategy::PerPackage => {
                for requirement in requirements {
                    info!(package = %requirement.name(), "Installing runtime dependency");
                    let command = self.command_for(std::slice::from_ref(requirement))?;
                    self.run(&command, std::slice::from_ref(requirement))?;
                    check_version(requirement, versions)?;
                }
            }
            InstallStrategy::Batch => {
                if requirements.is_empty() {
                    return Ok(());
                }
                for requirement in requirements {
                    info!(package = %requirement.name(), "Installing runtime dependency");
                }
                let command = self.command_for(requirements)?;
                self.run(&command, requirements)?;
                for requirement in requirements {
                    check_version(requirement, versions)?;
                }
            }
        }

        Ok(())
    }

    fn run(&self, command: &CommandLine, requirements: &[&PackageRequirement]) -> Result<()> {
        debug!(command = %command, "running installer");

        let output = self.runner.run(command).map_err(|source| {
            error!(command = %command, "Failed to start installer: {source}");
            Error::Spawn {
                program: command.program.clone(),
                source,
            }
        })?;

        if output.success() {
            return Ok(());
        }

        let packages: Vec<&str> = requirements.iter().map(|r| r.name()).collect();
        let packages = packages.join(", ");

        error!("Error installing package {packages}");
        error!("{}", output.stderr.trim_end());
        error!("Command: {command}");
        error!("{}", output.stdout.trim_end());

        Err(classify_failure(command, output, requirements, packages))
    }
}

fn classify_failure(
    command: &CommandLine,
    output: CommandOutput,
    requirements: &[&PackageRequirement],
    packages: String,
) -> Error {
    if output.stderr.contains(NO_MATCHING_DISTRIBUTION) {
        let name = unmatched_package(&output.stderr, requirements)
            .or_else(|| requirements.first().map(|r| r.name()))
            .unwrap_or(packages.as_str())
            .to_string();
        return Error::PackageNotFound { name };
    }

    Error::InstallationFailed {
        packages,
        command: command.to_string(),
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    }
}

/// Find which requirement `No matching distribution found for <req>` names.
fn unmatched_package<'r>(stderr: &str, requirements: &[&'r PackageRequirement]) -> Option<&'r str> {
    const MARKER: &str = "No matching distribution found for ";

    stderr.lines().find_map(|line| {
        let (_, rest) = line.split_once(MARKER)?;
        let token = rest.split_whitespace().next()?;
        let name: String = token
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();
        let wanted = canonical_name(&name);
        requirements
            .iter()
            .find(|r| canonical_name(r.name()) == wanted)
            .map(|r| r.name())
    })
}
