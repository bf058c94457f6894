use clap::{Parser, Subcommand, ValueEnum};
use decree_config::ColorMode;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "decree")]
#[command(version)]
#[command(about = "Compile command manifests into command-line interfaces")]
#[command(long_about = "
decree reads a manifest of typed command signatures and compiles it into a
command-line interface. Arguments are parsed and validated against the
declared types, and the validated call is printed as JSON.

Example usage:
  decree run tools.yaml -- add 1 2          # Run the 'add' command
  decree run tools.yaml -- --help           # Show the compiled help
  decree inspect tools.yaml                 # Show how each parameter compiles
  decree --config decree.toml run tools.yaml -- add 1 2
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file applied beneath every manifest
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a manifest and run it with the given arguments
    #[command(long_about = "
Compile a manifest and run it with the given arguments. Everything after the
manifest path is handed to the compiled interface, so use '--' before flags
meant for it.

The validated call is printed to stdout as JSON. Usage errors exit with
status 2, failures in the command body with status 1.
")]
    Run {
        /// Manifest file (.yaml, .yml, .json or .toml)
        manifest: PathBuf,

        /// When to color help and error output
        #[arg(long, value_enum)]
        color: Option<ColorArg>,

        /// Arguments for the compiled interface
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// Show how every command and parameter in a manifest compiles
    Inspect {
        /// Manifest file (.yaml, .yml, .json or .toml)
        manifest: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}

impl From<ColorArg> for ColorMode {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => ColorMode::Auto,
            ColorArg::Always => ColorMode::Always,
            ColorArg::Never => ColorMode::Never,
        }
    }
}
