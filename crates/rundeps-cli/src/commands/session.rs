//! `rundeps check` and `rundeps install` command implementations.

use crate::declare::Declaration;
use crate::SessionArgs;
use miette::{IntoDiagnostic, Result};
use rundeps_core::{
    BindFailure, BoundSymbol, DependencyManager, Error, InstallStrategy, InstallerConfig,
    ManagerConfig, PythonHost, PythonObject, SessionReport,
};
use serde::Serialize;
use std::collections::BTreeMap;

type Namespace = BTreeMap<String, PythonObject>;

/// Result of a check or install, for JSON output.
#[derive(Debug, Serialize)]
struct SessionResult {
    ok: bool,
    command: &'static str,
    installed: Vec<String>,
    skipped_optional: Vec<String>,
    bound: Vec<BoundSymbol>,
    failures: Vec<BindFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SessionResult {
    fn success(command: &'static str, report: SessionReport) -> Self {
        Self {
            ok: true,
            command,
            installed: report.installed,
            skipped_optional: report.skipped_optional,
            bound: report.bind.bound,
            failures: report.bind.failures,
            missing: Vec::new(),
            code: None,
            error: None,
        }
    }

    fn failure(command: &'static str, e: &Error) -> Self {
        let missing = match e {
            Error::MissingRequired { missing } => missing.clone(),
            _ => Vec::new(),
        };
        Self {
            ok: false,
            command,
            installed: Vec::new(),
            skipped_optional: Vec::new(),
            bound: Vec::new(),
            failures: Vec::new(),
            missing,
            code: Some(e.code()),
            error: Some(e.to_string()),
        }
    }
}

/// Build a session over the configured interpreter and declare `args.requirements`.
pub fn open(
    args: &SessionArgs,
    install_if_missing: bool,
) -> Result<DependencyManager<PythonHost>, Error> {
    let host = PythonHost::discover(args.python.as_deref())?;

    let mut installer = InstallerConfig::from_env();
    installer.program = InstallerConfig::for_python(host.python()).program;
    if let Some(url) = &args.index_url {
        installer.index_url = Some(url.clone());
    }
    if !args.extra_index_urls.is_empty() {
        installer.extra_index_urls.clone_from(&args.extra_index_urls);
    }
    if !args.trusted_hosts.is_empty() {
        installer.trusted_hosts.clone_from(&args.trusted_hosts);
    }

    let strategy = if args.batch {
        InstallStrategy::Batch
    } else {
        InstallStrategy::PerPackage
    };
    let config = ManagerConfig::new(installer)
        .with_install_if_missing(install_if_missing)
        .with_strategy(strategy);

    let mut manager = DependencyManager::open(config, host)?;
    for input in &args.requirements {
        Declaration::parse(input)?.apply(&mut manager)?;
    }
    Ok(manager)
}

/// Fail fast: report missing required packages and exit 1 if there are any.
pub fn check(args: &SessionArgs, json: bool) -> Result<()> {
    run("check", args, false, json)
}

/// Install whatever is missing, verify versions and resolve every import.
pub fn install(args: &SessionArgs, json: bool) -> Result<()> {
    run("install", args, true, json)
}

fn run(
    command: &'static str,
    args: &SessionArgs,
    install_if_missing: bool,
    json: bool,
) -> Result<()> {
    let mut namespace = Namespace::new();
    let outcome = open(args, install_if_missing).and_then(|mut manager| {
        if json {
            manager.close(&mut namespace)
        } else {
            // exits 1 itself when required packages are missing
            manager.close_or_exit(&mut namespace)
        }
    });

    match outcome {
        Ok(report) => {
            if json {
                let result = SessionResult::success(command, report);
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else {
                print_human(&report, &namespace);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let result = SessionResult::failure(command, &e);
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(e.exit_code());
        }
    }
}

fn print_human(report: &SessionReport, namespace: &Namespace) {
    for requirement in &report.installed {
        println!("+ {requirement}");
    }
    for name in &report.skipped_optional {
        println!("? {name} (optional, not installed)");
    }
    for symbol in &report.bind.bound {
        match namespace.get(&symbol.name) {
            Some(object) => println!(
                "{} = {} ({})",
                symbol.name,
                object.path(),
                object.type_name()
            ),
            None => println!("{}", symbol.name),
        }
    }
    for failure in &report.bind.failures {
        eprintln!("! {}: {} {}", failure.package, failure.statement, failure.reason);
    }

    if report.installed.is_empty()
        && report.bind.bound.is_empty()
        && report.bind.failures.is_empty()
    {
        println!("All runtime dependencies available");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_result_lists_missing() {
        let err = Error::MissingRequired {
            missing: vec!["IPy>=1.1".to_string()],
        };
        let value = serde_json::to_value(SessionResult::failure("check", &err)).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["code"], "RDM_MISSING_REQUIRED");
        assert_eq!(value["missing"][0], "IPy>=1.1");
    }

    #[test]
    fn test_success_result_omits_error_fields() {
        let value =
            serde_json::to_value(SessionResult::success("install", SessionReport::default()))
                .unwrap();
        assert_eq!(value["ok"], true);
        assert!(value.get("error").is_none());
        assert!(value.get("code").is_none());
        assert!(value.get("missing").is_none());
    }
}
