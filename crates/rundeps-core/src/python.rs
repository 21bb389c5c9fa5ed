//! Host adapter that drives a Python interpreter as a subprocess.
//!
//! Each lookup runs a short inline script (`python -c ...`) that prints a
//! single JSON object on stdout. Module and attribute lookups are cached
//! until [`ModuleResolver::invalidate_caches`] is called.

use crate::config::PYTHON_ENV;
use crate::error::{Error, Result};
use crate::host::{ModuleResolver, ResolveError, VersionQuery};
use crate::process::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::{debug, trace};

/// `python -c PROBE_SCRIPT <module> [<attr>]`
const PROBE_SCRIPT: &str = r#"
import importlib, json, sys
mod = sys.argv[1]
attr = sys.argv[2] if len(sys.argv) > 2 else None
def reply(**kw):
    print(json.dumps(kw))
    sys.exit(0)
try:
    obj = importlib.import_module(mod)
except ImportError as e:
    reply(status="module_not_found", detail=str(e))
except Exception as e:
    reply(status="error", detail="%s: %s" % (type(e).__name__, e))
if attr is not None:
    if hasattr(obj, attr):
        obj = getattr(obj, attr)
    else:
        try:
            obj = importlib.import_module(mod + "." + attr)
        except ImportError:
            reply(status="attribute_not_found")
        except Exception as e:
            reply(status="error", detail="%s: %s" % (type(e).__name__, e))
reply(status="ok", type=type(obj).__name__)
"#;

/// `python -c VERSION_SCRIPT <distribution>`
const VERSION_SCRIPT: &str = r#"
import json, sys
from importlib import metadata
try:
    version = metadata.version(sys.argv[1])
except metadata.PackageNotFoundError:
    version = None
print(json.dumps({"version": version}))
"#;

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ProbeReply {
    Ok {
        #[serde(rename = "type")]
        type_name: String,
    },
    ModuleNotFound {
        #[serde(default)]
        detail: String,
    },
    AttributeNotFound,
    Error {
        detail: String,
    },
}

#[derive(Debug, Deserialize)]
struct VersionReply {
    version: Option<String>,
}

/// A module or attribute that exists in the interpreter.
///
/// The object itself lives in the child process; this is a handle naming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonObject {
    module: String,
    attr: Option<String>,
    type_name: String,
}

impl PythonObject {
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn attr(&self) -> Option<&str> {
        self.attr.as_deref()
    }

    /// Python type name, e.g. `module` or `type`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Dotted path, e.g. `bson.ObjectId`.
    #[must_use]
    pub fn path(&self) -> String {
        match &self.attr {
            Some(attr) => format!("{}.{attr}", self.module),
            None => self.module.clone(),
        }
    }
}

type LookupKey = (String, Option<String>);

/// Resolves imports and installed versions through a Python interpreter.
pub struct PythonHost<R = SystemRunner> {
    python: String,
    runner: R,
    lookups: RefCell<HashMap<LookupKey, std::result::Result<PythonObject, ResolveError>>>,
}

impl PythonHost<SystemRunner> {
    #[must_use]
    pub fn new(python: impl Into<String>) -> Self {
        Self::with_runner(python, SystemRunner)
    }

    /// Use `explicit` if given, else `RUNDEPS_PYTHON`, else the first of
    /// `python3`/`python` on `PATH`.
    pub fn discover(explicit: Option<&str>) -> Result<Self> {
        Ok(Self::new(locate_python(explicit)?))
    }
}

impl<R: CommandRunner> PythonHost<R> {
    #[must_use]
    pub fn with_runner(python: impl Into<String>, runner: R) -> Self {
        Self {
            python: python.into(),
            runner,
            lookups: RefCell::new(HashMap::new()),
        }
    }

    /// Interpreter path or command name.
    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn script(&self, script: &str) -> CommandLine {
        CommandLine::new(self.python.as_str()).arg("-c").arg(script)
    }

    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.runner.run(command).map_err(|source| Error::Spawn {
            program: self.python.clone(),
            source,
        })
    }

    fn lookup(&self, module: &str, attr: Option<&str>) -> std::result::Result<PythonObject, ResolveError> {
        let key = (module.to_string(), attr.map(str::to_string));
        if let Some(cached) = self.lookups.borrow().get(&key) {
            trace!(module, attr, "lookup cache hit");
            return cached.clone();
        }

        let outcome = self.probe(module, attr);
        // host failures are retried on the next lookup
        if !matches!(outcome, Err(ResolveError::Host(_))) {
            self.lookups.borrow_mut().insert(key, outcome.clone());
        }
        outcome
    }

    fn probe(&self, module: &str, attr: Option<&str>) -> std::result::Result<PythonObject, ResolveError> {
        let mut command = self.script(PROBE_SCRIPT).arg(module);
        if let Some(attr) = attr {
            command = command.arg(attr);
        }

        debug!(module, attr, python = %self.python, "probing import");
        let output = self
            .run(&command)
            .map_err(|e| ResolveError::Host(e.to_string()))?;
        let reply: ProbeReply = parse_reply(&output)
            .ok_or_else(|| ResolveError::Host(protocol_message(&output)))?;

        match reply {
            ProbeReply::Ok { type_name } => Ok(PythonObject {
                module: module.to_string(),
                attr: attr.map(str::to_string),
                type_name,
            }),
            ProbeReply::ModuleNotFound { detail } => {
                trace!(module, detail = %detail, "module not found");
                Err(ResolveError::ModuleNotFound {
                    module: module.to_string(),
                })
            }
            ProbeReply::AttributeNotFound => Err(ResolveError::AttributeNotFound {
                module: module.to_string(),
                attr: attr.unwrap_or_default().to_string(),
            }),
            ProbeReply::Error { detail } => Err(ResolveError::Host(detail)),
        }
    }
}

impl<R: CommandRunner> ModuleResolver for PythonHost<R> {
    type Value = PythonObject;

    fn resolve_module(&self, path: &str) -> std::result::Result<PythonObject, ResolveError> {
        self.lookup(path, None)
    }

    fn resolve_attr(
        &self,
        module: &PythonObject,
        attr: &str,
    ) -> std::result::Result<PythonObject, ResolveError> {
        self.lookup(&module.path(), Some(attr))
    }

    fn invalidate_caches(&self) {
        self.lookups.borrow_mut().clear();
    }
}

impl<R: CommandRunner> VersionQuery for PythonHost<R> {
    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        let output = self.run(&self.script(VERSION_SCRIPT).arg(name))?;
        let reply: VersionReply = parse_reply(&output).ok_or_else(|| Error::HostProtocol {
            program: self.python.clone(),
            output: protocol_message(&output),
        })?;
        debug!(package = name, version = ?reply.version, "installed version");
        Ok(reply.version)
    }
}

/// The reply is the last non-blank stdout line of a successful run.
fn parse_reply<T: DeserializeOwned>(output: &CommandOutput) -> Option<T> {
    if !output.success() {
        return None;
    }
    let line = output.stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(line).ok()
}

fn protocol_message(output: &CommandOutput) -> String {
    let stderr = output.stderr.trim();
    let stdout = output.stdout.trim();
    format!(
        "exit status {}: {}",
        output.exit_code,
        if stderr.is_empty() { stdout } else { stderr }
    )
}

fn locate_python(explicit: Option<&str>) -> Result<String> {
    if let Some(python) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(python.to_string());
    }

    if let Some(python) = std::env::var(PYTHON_ENV)
        .ok()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
    {
        return Ok(python);
    }

    ["python3", "python"]
        .iter()
        .find_map(|name| which::which(name).ok())
        .map(|path| path.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidConfig {
            field: "python",
            reason: format!("no python3 or python on PATH; set {PYTHON_ENV} or pass --python"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::cell::Cell;
    use std::io;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Script {
        Probe,
        Version,
    }

    /// Answers inline scripts from a fixed table keyed by script kind and
    /// the trailing args.
    struct TableRunner {
        replies: HashMap<(Script, Vec<String>), CommandOutput>,
        calls: Cell<usize>,
    }

    impl TableRunner {
        fn new(entries: &[(Script, &[&str], i32, &str)]) -> Self {
            let replies = entries
                .iter()
                .map(|(script, args, code, stdout)| {
                    (
                        (*script, args.iter().map(ToString::to_string).collect()),
                        CommandOutput {
                            exit_code: *code,
                            stdout: (*stdout).to_string(),
                            stderr: String::new(),
                        },
                    )
                })
                .collect();
            Self {
                replies,
                calls: Cell::new(0),
            }
        }
    }

    impl CommandRunner for TableRunner {
        fn run(&self, command: &CommandLine) -> io::Result<CommandOutput> {
            self.calls.set(self.calls.get() + 1);
            // args: -c <script> <rest...>
            let script = if command.args[1] == VERSION_SCRIPT {
                Script::Version
            } else {
                Script::Probe
            };
            let fallback = match script {
                Script::Probe => r#"{"status": "module_not_found", "detail": "No module"}"#,
                Script::Version => r#"{"version": null}"#,
            };
            let key = (script, command.args[2..].to_vec());
            Ok(self.replies.get(&key).cloned().unwrap_or(CommandOutput {
                exit_code: 0,
                stdout: fallback.to_string(),
                stderr: String::new(),
            }))
        }
    }

    fn host() -> PythonHost<TableRunner> {
        use Script::{Probe, Version};
        PythonHost::with_runner(
            "python3",
            TableRunner::new(&[
                (Probe, &["bson"], 0, r#"{"status": "ok", "type": "module"}"#),
                (Probe, &["bson", "ObjectId"], 0, r#"{"status": "ok", "type": "type"}"#),
                (Probe, &["bson", "Binary"], 0, r#"{"status": "attribute_not_found"}"#),
                (Probe, &["broken"], 0, r#"{"status": "error", "detail": "SyntaxError: bad"}"#),
                (Probe, &["crashy"], 139, ""),
                (Version, &["crashy"], 139, ""),
                (Version, &["pymongo"], 0, "warning noise\n{\"version\": \"4.6.1\"}\n"),
                (Version, &["IPy"], 0, r#"{"version": null}"#),
            ]),
        )
    }

    #[test]
    fn test_resolves_module_and_attr() {
        let host = host();
        let bson = host.resolve_module("bson").unwrap();
        assert_eq!(bson.type_name(), "module");
        assert_eq!(bson.path(), "bson");

        let oid = host.resolve_attr(&bson, "ObjectId").unwrap();
        assert_eq!(oid.path(), "bson.ObjectId");
        assert_eq!(oid.attr(), Some("ObjectId"));
        assert_eq!(oid.module(), "bson");
    }

    #[test]
    fn test_not_found_replies() {
        let host = host();
        assert_eq!(
            host.resolve_module("IPy").unwrap_err(),
            ResolveError::ModuleNotFound {
                module: "IPy".to_string()
            }
        );

        let bson = host.resolve_module("bson").unwrap();
        assert!(host
            .resolve_attr(&bson, "Binary")
            .unwrap_err()
            .is_unresolvable());
    }

    #[test]
    fn test_host_errors() {
        let host = host();
        let err = host.resolve_module("broken").unwrap_err();
        assert_eq!(err, ResolveError::Host("SyntaxError: bad".to_string()));

        let err = host.resolve_module("crashy").unwrap_err();
        assert!(!err.is_unresolvable());
        assert!(err.to_string().contains("exit status 139"));
    }

    #[test]
    fn test_lookups_cached_until_invalidated() {
        let host = host();
        let err = host.resolve_module("IPy").unwrap_err();
        assert_eq!(
            err,
            ResolveError::ModuleNotFound {
                module: "IPy".to_string()
            }
        );
        host.resolve_module("IPy").unwrap_err();
        assert_eq!(host.runner().calls.get(), 1);

        host.invalidate_caches();
        host.resolve_module("IPy").unwrap_err();
        assert_eq!(host.runner().calls.get(), 2);
    }

    #[test]
    fn test_host_errors_are_not_cached() {
        let host = host();
        host.resolve_module("broken").unwrap_err();
        host.resolve_module("broken").unwrap_err();
        assert_eq!(host.runner().calls.get(), 2);

        host.resolve_module("bson").unwrap();
        host.resolve_module("bson").unwrap();
        assert_eq!(host.runner().calls.get(), 3);
    }

    #[test]
    fn test_installed_version() {
        let host = host();
        assert_eq!(
            host.installed_version("pymongo").unwrap(),
            Some("4.6.1".to_string())
        );
        assert_eq!(host.installed_version("IPy").unwrap(), None);

        let err = host.installed_version("crashy").unwrap_err();
        assert!(matches!(err, Error::HostProtocol { .. }));
    }

    #[test]
    #[serial]
    fn test_locate_python_prefers_explicit_then_env() {
        std::env::set_var(PYTHON_ENV, "/env/python");
        assert_eq!(locate_python(Some("/explicit/python")).unwrap(), "/explicit/python");
        assert_eq!(locate_python(None).unwrap(), "/env/python");
        assert_eq!(locate_python(Some("  ")).unwrap(), "/env/python");
        std::env::remove_var(PYTHON_ENV);
    }
}
