#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Runtime dependency management.
//!
//! Declare the packages a program needs and the symbols it imports from
//! them; the session probes what is missing, installs it through the host
//! package installer, checks installed versions against PEP 440 constraints
//! and binds the imports into a caller-supplied namespace.

pub mod binder;
pub mod checker;
pub mod config;
pub mod error;
pub mod host;
pub mod installer;
pub mod manager;
pub mod pep440;
pub mod probe;
pub mod process;
pub mod python;
pub mod registry;
pub mod requirement;
pub mod version;

pub use binder::{bind, BindFailure, BindReport, BoundSymbol};
pub use checker::check_version;
pub use config::{InstallStrategy, InstallerConfig, ManagerConfig};
pub use error::{codes, Error, Result};
pub use host::{ModuleResolver, ResolveError, SymbolRegistry, VersionQuery};
pub use installer::Installer;
pub use manager::{DependencyManager, SessionReport, SessionState};
pub use pep440::{Version, VersionConstraint};
pub use probe::{find_missing, is_available, MissingSet};
pub use process::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
pub use python::{PythonHost, PythonObject};
pub use registry::{StaticRegistry, StaticValue};
pub use requirement::{FromImport, ImportKind, ImportSpec, PackageRequirement};
pub use version::VERSION;
