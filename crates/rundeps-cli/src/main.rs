#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod declare;
mod logging;

use clap::Parser;
use miette::Result;

#[derive(Parser, Debug)]
#[command(name = "rundeps")]
#[command(author, version, about = "Check, install and bind runtime Python dependencies", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Report missing required packages without installing (exit 1 if any)
    Check(SessionArgs),

    /// Install missing packages, verify versions and resolve every import
    Install(SessionArgs),

    /// Print the installer commands `install` would run
    Plan(SessionArgs),
}

/// Requirements and installer settings shared by session commands.
#[derive(clap::Args, Debug)]
pub struct SessionArgs {
    /// Requirement declarations: `[?]NAME[CONSTRAINT][;IMPORT]...`
    ///
    /// Example: "pymongo>=3.11.4,<4.0.0;import pymongo;from bson import ObjectId"
    #[arg(value_name = "REQ", required = true)]
    pub requirements: Vec<String>,

    /// Python interpreter used for probing and installing
    #[arg(long, env = "RUNDEPS_PYTHON", value_name = "PATH")]
    pub python: Option<String>,

    /// Primary package index URL
    #[arg(long, env = "RUNDEPS_INDEX_URL", value_name = "URL")]
    pub index_url: Option<String>,

    /// Additional package index URL (repeatable)
    #[arg(long = "extra-index-url", value_name = "URL")]
    pub extra_index_urls: Vec<String>,

    /// Host to trust without HTTPS verification (repeatable)
    #[arg(long = "trusted-host", value_name = "HOST")]
    pub trusted_hosts: Vec<String>,

    /// Install all missing packages with a single installer invocation
    #[arg(long)]
    pub batch: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => commands::version::run(),
        Some(Commands::Check(args)) => {
            logging::init(cli.verbose, cli.json);
            commands::session::check(&args, cli.json)
        }
        Some(Commands::Install(args)) => {
            logging::init(cli.verbose, cli.json);
            commands::session::install(&args, cli.json)
        }
        Some(Commands::Plan(args)) => {
            logging::init(cli.verbose, cli.json);
            commands::plan::run(&args, cli.json)
        }
        None => {
            println!("rundeps - runtime dependency manager");
            println!();
            println!("Run 'rundeps --help' for usage information.");
            Ok(())
        }
    }
}
