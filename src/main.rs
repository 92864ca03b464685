//! ts-refactor - one-shot refactoring and code intelligence for TypeScript projects
//!
//! Each invocation loads the project, runs one command and prints one JSON object
//! on stdout. Logs go to stderr.

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use ts_refactor::api::{self, Command};

#[derive(Parser)]
#[command(name = "ts-refactor", version)]
#[command(about = "Rename, extract and query symbols in a TypeScript project")]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log filter directives (`debug`, `ts_refactor=trace`); overrides -v
    #[arg(long, env = "TS_REFACTOR_LOG", global = true, hide_env_values = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args)]
struct ProjectArg {
    /// Project root directory
    #[arg(long)]
    project: PathBuf,
}

#[derive(Args)]
struct Location {
    #[command(flatten)]
    project: ProjectArg,

    /// Source file, absolute or relative to the project
    #[arg(long)]
    file: String,

    /// 0-based UTF-16 offset of the symbol
    #[arg(long)]
    offset: usize,
}

#[derive(Args)]
struct Extraction {
    #[command(flatten)]
    project: ProjectArg,

    #[arg(long)]
    file: String,

    /// Start of the selected range (0-based UTF-16 offset)
    #[arg(long = "start-offset")]
    start: usize,

    /// End of the selected range, exclusive
    #[arg(long = "end-offset")]
    end: usize,

    /// Name of the new function or variable
    #[arg(long = "new-name")]
    new_name: String,

    /// Return the changes without writing them
    #[arg(long)]
    preview: bool,
}

#[derive(Subcommand)]
enum Cmd {
    /// Rename the symbol at an offset everywhere it is used
    Rename {
        #[command(flatten)]
        location: Location,

        #[arg(long = "new-name")]
        new_name: String,

        /// Return the changes without writing them
        #[arg(long)]
        preview: bool,
    },
    /// Move a range into a new top-level function
    ExtractFunction(Extraction),
    /// Move an expression into a new `const`
    ExtractVariable(Extraction),
    /// Every occurrence of the symbol at an offset
    FindReferences(Location),
    /// Where the symbol at an offset is declared
    FindDefinition(Location),
    /// Functions and methods that reference the symbol at an offset
    FindCallers(Location),
    /// Implementations of an interface, abstract class or member
    FindImplementations(Location),
    /// Describe a class, interface, enum or type alias
    InspectType {
        #[command(flatten)]
        project: ProjectArg,

        #[arg(long = "type-name")]
        type_name: String,

        /// Only search this file
        #[arg(long)]
        file: Option<String>,
    },
    /// List the type declarations in the project
    ListTypes {
        #[command(flatten)]
        project: ProjectArg,

        /// Case-insensitive name substring
        #[arg(long = "name-filter")]
        name_filter: Option<String>,
    },
    /// Report syntax and semantic errors for the whole project
    Check {
        #[command(flatten)]
        project: ProjectArg,
    },
}

impl Cmd {
    fn into_command(self) -> (PathBuf, Command) {
        match self {
            Cmd::Rename {
                location,
                new_name,
                preview,
            } => (
                location.project.project,
                Command::Rename {
                    file: location.file,
                    offset: location.offset,
                    new_name,
                    preview,
                },
            ),
            Cmd::ExtractFunction(e) => (
                e.project.project,
                Command::ExtractFunction {
                    file: e.file,
                    start: e.start,
                    end: e.end,
                    new_name: e.new_name,
                    preview: e.preview,
                },
            ),
            Cmd::ExtractVariable(e) => (
                e.project.project,
                Command::ExtractVariable {
                    file: e.file,
                    start: e.start,
                    end: e.end,
                    new_name: e.new_name,
                    preview: e.preview,
                },
            ),
            Cmd::FindReferences(l) => (
                l.project.project,
                Command::FindReferences {
                    file: l.file,
                    offset: l.offset,
                },
            ),
            Cmd::FindDefinition(l) => (
                l.project.project,
                Command::FindDefinition {
                    file: l.file,
                    offset: l.offset,
                },
            ),
            Cmd::FindCallers(l) => (
                l.project.project,
                Command::FindCallers {
                    file: l.file,
                    offset: l.offset,
                },
            ),
            Cmd::FindImplementations(l) => (
                l.project.project,
                Command::FindImplementations {
                    file: l.file,
                    offset: l.offset,
                },
            ),
            Cmd::InspectType {
                project,
                type_name,
                file,
            } => (project.project, Command::InspectType { type_name, file }),
            Cmd::ListTypes {
                project,
                name_filter,
            } => (project.project, Command::ListTypes { name_filter }),
            Cmd::Check { project } => (project.project, Command::Check),
        }
    }
}

fn log_filter(verbose: u8, directives: Option<&str>) -> EnvFilter {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

fn init_logging(filter: EnvFilter) {
    // Only fails if a subscriber is already installed
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => println!("{}", api::error_json("Error", &e.to_string())),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print!("{}", e.render());
                return ExitCode::from(1);
            }
            ErrorKind::MissingSubcommand => {
                let _ = Cli::command().print_help();
                return ExitCode::from(1);
            }
            ErrorKind::DisplayVersion => {
                print!("{}", e);
                return ExitCode::SUCCESS;
            }
            _ => {
                let message = e.render().to_string();
                print_json(&api::error_json("ArgumentError", message.trim()));
                return ExitCode::SUCCESS;
            }
        },
    };

    init_logging(log_filter(cli.verbose, cli.log_level.as_deref()));
    let (root, command) = cli.command.into_command();
    let result = api::execute(&root, command);
    print_json(&result);
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_prefers_directives() {
        assert_eq!(log_filter(0, None).to_string(), "warn");
        assert_eq!(log_filter(2, None).to_string(), "debug");
        assert_eq!(log_filter(5, None).to_string(), "trace");
        assert_eq!(
            log_filter(0, Some("ts_refactor=trace")).to_string(),
            "ts_refactor=trace"
        );
        assert_eq!(log_filter(1, Some("  ")).to_string(), "info");
    }

    #[test]
    fn test_cli_parses_extraction() {
        let cli = Cli::try_parse_from([
            "ts-refactor",
            "extract-variable",
            "--project",
            "/p",
            "--file",
            "a.ts",
            "--start-offset",
            "3",
            "--end-offset",
            "9",
            "--new-name",
            "sum",
            "--preview",
        ])
        .unwrap();
        let (root, command) = cli.command.into_command();
        assert_eq!(root, PathBuf::from("/p"));
        assert_eq!(
            command,
            Command::ExtractVariable {
                file: "a.ts".to_string(),
                start: 3,
                end: 9,
                new_name: "sum".to_string(),
                preview: true,
            }
        );
    }
}
