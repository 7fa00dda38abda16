//! CLI argument definitions using clap derive

use clap::Parser;

/// Per-version entry point of boot
///
/// Only `-V` and `-u` are interpreted here; everything else is handed to the
/// tool's main entry point untouched.
#[derive(Parser, Debug, Default)]
#[command(name = "boot")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct AppCli {
    /// Print the resolved version pins and exit
    #[arg(short = 'V', long)]
    pub version: bool,

    /// Update the version pins and dependency cache, then exit
    #[arg(short = 'u', long)]
    pub update: bool,

    /// Arguments for the tool
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppCli {
        AppCli::try_parse_from(std::iter::once("boot").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn version_and_update_flags() {
        assert!(parse(&["-V"]).version);
        assert!(parse(&["--version"]).version);
        assert!(parse(&["-u"]).update);
        assert!(parse(&["--update"]).update);
    }

    #[test]
    fn everything_else_is_forwarded() {
        let cli = parse(&["build", "-V", "--target", "out"]);
        assert!(!cli.version);
        assert_eq!(cli.args, vec!["build", "-V", "--target", "out"]);
    }

    #[test]
    fn leading_unknown_flags_are_forwarded() {
        let cli = parse(&["-h"]);
        assert_eq!(cli.args, vec!["-h"]);

        let cli = parse(&["--help", "watch"]);
        assert_eq!(cli.args, vec!["--help", "watch"]);
    }

    #[test]
    fn no_arguments() {
        let cli = parse(&[]);
        assert!(!cli.version && !cli.update);
        assert!(cli.args.is_empty());
    }
}
