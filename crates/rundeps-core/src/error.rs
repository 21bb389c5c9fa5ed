//! Error types for the dependency engine.

use crate::host::ResolveError;
use thiserror::Error;

/// Stable error codes, one per [`Error`] variant.
pub mod codes {
    pub const RDM_PACKAGE_NOT_FOUND: &str = "RDM_PACKAGE_NOT_FOUND";
    pub const RDM_VERSION_INCOMPATIBLE: &str = "RDM_VERSION_INCOMPATIBLE";
    pub const RDM_INSTALL_FAILED: &str = "RDM_INSTALL_FAILED";
    pub const RDM_MISSING_REQUIRED: &str = "RDM_MISSING_REQUIRED";
    pub const RDM_SPECIFIER_INVALID: &str = "RDM_SPECIFIER_INVALID";
    pub const RDM_REQUIREMENT_INVALID: &str = "RDM_REQUIREMENT_INVALID";
    pub const RDM_CONFIG_INVALID: &str = "RDM_CONFIG_INVALID";
    pub const RDM_PROBE_FAILED: &str = "RDM_PROBE_FAILED";
    pub const RDM_SPAWN_FAILED: &str = "RDM_SPAWN_FAILED";
    pub const RDM_HOST_PROTOCOL: &str = "RDM_HOST_PROTOCOL";
}

/// Errors raised by a dependency-management session.
#[derive(Error, Debug)]
pub enum Error {
    /// The package is absent after an install attempt or when its version is checked.
    #[error("Package {name} not found after installation")]
    PackageNotFound { name: String },

    #[error("Installed version {installed} of {name} does not satisfy {constraint}")]
    VersionCompatibility {
        name: String,
        installed: String,
        constraint: String,
    },

    /// The installer exited non-zero for a reason other than "no matching distribution".
    #[error("Error installing package {packages}: installer exited with status {exit_code}")]
    InstallationFailed {
        packages: String,
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// Required packages are missing and automatic installation is disabled.
    #[error("Missing required runtime modules: {}", .missing.join(", "))]
    MissingRequired { missing: Vec<String> },

    #[error("Invalid version specifier '{input}': {reason}")]
    InvalidSpecifier { input: String, reason: String },

    #[error("Invalid requirement '{name}': {reason}")]
    InvalidRequirement { name: String, reason: String },

    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The resolver failed while probing for something other than a missing name.
    #[error("Probe failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected output from {program}: {output}")]
    HostProtocol { program: String, output: String },
}

impl Error {
    /// Get the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PackageNotFound { .. } => codes::RDM_PACKAGE_NOT_FOUND,
            Self::VersionCompatibility { .. } => codes::RDM_VERSION_INCOMPATIBLE,
            Self::InstallationFailed { .. } => codes::RDM_INSTALL_FAILED,
            Self::MissingRequired { .. } => codes::RDM_MISSING_REQUIRED,
            Self::InvalidSpecifier { .. } => codes::RDM_SPECIFIER_INVALID,
            Self::InvalidRequirement { .. } => codes::RDM_REQUIREMENT_INVALID,
            Self::InvalidConfig { .. } => codes::RDM_CONFIG_INVALID,
            Self::Resolve(_) => codes::RDM_PROBE_FAILED,
            Self::Spawn { .. } => codes::RDM_SPAWN_FAILED,
            Self::HostProtocol { .. } => codes::RDM_HOST_PROTOCOL,
        }
    }

    /// Process exit status for this error.
    ///
    /// Fail-fast on missing required packages exits with 1; every other
    /// fatal error exits with 2.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingRequired { .. } => 1,
            _ => 2,
        }
    }

    pub(crate) fn invalid_specifier(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSpecifier {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
