//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Load a website into an asset graph and inspect it
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: assetgraph.toml, searched upward from cwd)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Site root directory, overrides `[graph] root`
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load and populate the graph, then report errors and warnings
    #[command(visible_alias = "c")]
    Check {
        #[command(flatten)]
        args: InputArgs,
    },

    /// Print every asset and relation in graph order
    #[command(visible_alias = "d")]
    Dump {
        #[command(flatten)]
        args: InputArgs,
    },
}

impl Commands {
    pub fn inputs(&self) -> &InputArgs {
        match self {
            Self::Check { args } | Self::Dump { args } => args,
        }
    }
}

/// Shared arguments for commands that build a graph
#[derive(clap::Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Input files, globs or urls (default: `[load] inputs`).
    /// Relative paths are resolved against the current directory.
    #[arg(value_name = "INPUTS")]
    pub inputs: Vec<String>,

    /// Follow relations from the inputs
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub populate: Option<bool>,

    /// Pretty-print Css, JavaScript and Json assets after loading
    #[arg(short = 'P', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub pretty: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::parse_from(["assetgraph", "check", "index.html", "css/*.css", "--populate", "false", "-v"]);
        assert!(cli.verbose);
        let Commands::Check { args } = &cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.inputs, ["index.html", "css/*.css"]);
        assert_eq!(args.populate, Some(false));
        assert_eq!(args.pretty, None);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["assetgraph", "dump", "--root", "public", "-C", "x.toml", "--pretty"]);
        assert_eq!(cli.root, Some(PathBuf::from("public")));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert_eq!(cli.command.inputs().pretty, Some(true));
        assert!(cli.command.inputs().inputs.is_empty());
    }
}
