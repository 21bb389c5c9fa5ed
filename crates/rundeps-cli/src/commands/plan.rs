//! `rundeps plan` command implementation.

use super::session::open;
use crate::SessionArgs;
use miette::{IntoDiagnostic, Result};
use rundeps_core::CommandLine;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PlannedCommand {
    program: String,
    args: Vec<String>,
    /// Shell-quoted rendering.
    command: String,
}

#[derive(Debug, Serialize)]
struct PlanResult {
    ok: bool,
    missing: Vec<String>,
    commands: Vec<PlannedCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<CommandLine> for PlannedCommand {
    fn from(line: CommandLine) -> Self {
        Self {
            command: line.to_string(),
            program: line.program,
            args: line.args,
        }
    }
}

pub fn run(args: &SessionArgs, json: bool) -> Result<()> {
    let outcome = open(args, true).and_then(|mut manager| {
        let missing = manager
            .missing_packages()?
            .iter()
            .map(|r| r.requirement_string())
            .collect::<Vec<_>>();
        let commands = manager.planned_commands()?;
        Ok((missing, commands))
    });

    match outcome {
        Ok((missing, commands)) => {
            if json {
                let result = PlanResult {
                    ok: true,
                    missing,
                    commands: commands.into_iter().map(PlannedCommand::from).collect(),
                    code: None,
                    error: None,
                };
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else if commands.is_empty() {
                println!("Nothing to install");
            } else {
                for command in &commands {
                    println!("{command}");
                }
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let result = PlanResult {
                    ok: false,
                    missing: Vec::new(),
                    commands: Vec::new(),
                    code: Some(e.code()),
                    error: Some(e.to_string()),
                };
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(e.exit_code());
        }
    }
}
