//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - list: list discovered tools
//! - run: dispatch a tool with forwarded arguments
//! - install: install a tool's missing dependencies
//! - new: scaffold a new tool
//! - deps: show a tool's dependency status
//! - check: run the configured linters over the tools root
//! - doctor: check interpreters and the package manager

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Toolbox - discover, check and run local utility tools
#[derive(Parser, Debug)]
#[command(name = "toolbox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // Top-level flags are not global: after `run <name>` every token,
    // including `-v` and `--help`, belongs to the tool.

    /// Optional config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tools root directory (overrides config and TOOLBOX_ROOT)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all discovered tools
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a tool, forwarding every argument after its name
    #[command(disable_help_flag = true)]
    Run {
        /// Tool name
        name: String,

        /// Arguments passed to the tool unchanged
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Install the missing dependencies of a tool
    Install {
        /// Tool name
        name: String,
    },

    /// Create a new tool from the template
    New {
        /// Name of the new tool
        name: String,
    },

    /// Show the dependency status of a tool
    Deps {
        /// Tool name
        name: String,
    },

    /// Run the configured linters and formatters over the tools root
    Check {
        /// Let the linters fix what they can
        #[arg(long)]
        fix: bool,
    },

    /// Check the host OS, interpreters and package manager
    Doctor,
}

impl Commands {
    /// Tool name the command targets, if any
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Commands::Run { name, .. }
            | Commands::Install { name }
            | Commands::New { name }
            | Commands::Deps { name } => Some(name),
            Commands::List { .. } | Commands::Check { .. } | Commands::Doctor => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_list_command() {
        let cli = Cli::try_parse_from(["toolbox", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List { json: false }));

        let cli = Cli::try_parse_from(["toolbox", "list", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::List { json: true }));
    }

    #[test]
    fn test_run_without_args() {
        let cli = Cli::try_parse_from(["toolbox", "run", "alpha"]).unwrap();
        match cli.command {
            Commands::Run { name, args } => {
                assert_eq!(name, "alpha");
                assert!(args.is_empty());
            }
            _ => panic!("Expected run command"),
        }
    }

    fn run_args(argv: &[&str]) -> Vec<OsString> {
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run { args, .. } => args,
            other => panic!("Expected run command, got {:?}", other),
        }
    }

    fn os(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_run_forwards_args_after_separator() {
        let cli = Cli::try_parse_from(["toolbox", "run", "alpha", "--", "--x", "-v", "a b"]).unwrap();
        match cli.command {
            Commands::Run { ref name, ref args } => {
                assert_eq!(name, "alpha");
                assert_eq!(args, &os(&["--x", "-v", "a b"]));
            }
            _ => panic!("Expected run command"),
        }
        // -v after the tool name belongs to the tool, not to toolbox
        assert!(!cli.verbose);
    }

    #[test]
    fn test_run_keeps_inner_separator() {
        assert_eq!(run_args(&["toolbox", "run", "alpha", "--", "a", "--", "b"]), os(&["a", "--", "b"]));
    }

    #[test]
    fn test_run_forwards_hyphen_args_without_separator() {
        assert_eq!(
            run_args(&["toolbox", "run", "alpha", "--input", "file.txt"]),
            os(&["--input", "file.txt"])
        );
    }

    #[test]
    fn test_run_forwards_toolbox_flag_names() {
        let cli = Cli::try_parse_from(["toolbox", "run", "alpha", "-v"]).unwrap();
        assert!(!cli.is_verbose());
        assert!(matches!(cli.command, Commands::Run { ref args, .. } if args == &os(&["-v"])));

        let cli = Cli::try_parse_from(["toolbox", "run", "alpha", "--root", "x", "-c", "y"]).unwrap();
        assert_eq!(cli.root, None);
        assert_eq!(cli.config, None);
        assert!(matches!(cli.command, Commands::Run { ref args, .. } if args == &os(&["--root", "x", "-c", "y"])));
    }

    #[test]
    fn test_run_forwards_help_flag() {
        assert_eq!(run_args(&["toolbox", "run", "alpha", "--help"]), os(&["--help"]));
        assert_eq!(run_args(&["toolbox", "run", "alpha", "-h"]), os(&["-h"]));
    }

    #[test]
    fn test_run_requires_name() {
        assert!(Cli::try_parse_from(["toolbox", "run"]).is_err());
    }

    #[test]
    fn test_install_command() {
        let cli = Cli::try_parse_from(["toolbox", "install", "beta"]).unwrap();
        assert_eq!(cli.command.tool_name(), Some("beta"));
        assert!(matches!(cli.command, Commands::Install { .. }));
    }

    #[test]
    fn test_new_command() {
        let cli = Cli::try_parse_from(["toolbox", "new", "gamma"]).unwrap();
        assert!(matches!(cli.command, Commands::New { ref name } if name == "gamma"));
    }

    #[test]
    fn test_deps_and_doctor() {
        let cli = Cli::try_parse_from(["toolbox", "deps", "beta"]).unwrap();
        assert_eq!(cli.command.tool_name(), Some("beta"));

        let cli = Cli::try_parse_from(["toolbox", "doctor"]).unwrap();
        assert!(matches!(cli.command, Commands::Doctor));
        assert_eq!(cli.command.tool_name(), None);
    }

    #[test]
    fn test_check_command() {
        let cli = Cli::try_parse_from(["toolbox", "check"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { fix: false }));
        assert_eq!(cli.command.tool_name(), None);

        let cli = Cli::try_parse_from(["toolbox", "check", "--fix"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { fix: true }));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["toolbox", "-v", "--root", "/opt/tools", "-c", "t.yml", "list"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.root, Some(PathBuf::from("/opt/tools")));
        assert_eq!(cli.config, Some(PathBuf::from("t.yml")));
    }

    #[test]
    fn test_global_flags_precede_subcommand() {
        assert!(Cli::try_parse_from(["toolbox", "list", "-v"]).is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["toolbox"]).is_err());
    }

    #[test]
    fn test_help_works() {
        // Verify help doesn't panic
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["toolbox", "--version"]);
        // Version flag causes early exit with error (expected)
        assert!(result.is_err());
    }
}
