//! Command-line front end for decree
//!
//! Loads a manifest of typed command signatures, compiles it with
//! [`decree`], and either runs it with the remaining arguments or prints how
//! it compiled.

pub mod cli;
pub mod error;
pub mod inspect;
pub mod logging;
pub mod manifest;

use std::ffi::OsString;
use std::path::Path;

use decree::{run::report, DecreeError, RunOptions};
use decree_common::{Pretty, Severity};
use decree_config::{Config, ConfigProvider, Styling};
use tracing::{debug, error, warn};

use cli::{Cli, ColorArg, Commands};
use manifest::Manifest;

/// Exit code for failures outside the compiled interface
pub const EXIT_FAILURE: i32 = 1;

/// Run a parsed command line, returning the process exit code
pub fn execute(cli: Cli) -> i32 {
    let base = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(code) => return code,
    };
    match cli.command {
        Commands::Run {
            manifest,
            color,
            args,
        } => run_manifest(&manifest, &base, color, args),
        Commands::Inspect { manifest } => inspect_manifest(&manifest, &base),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<Config, i32> {
    let provider = match explicit {
        Some(path) => ConfigProvider::new().with_file(path),
        None => ConfigProvider::new(),
    };
    match provider.load() {
        Ok(config) => {
            debug!("Loaded configuration: {}", Pretty(config.effective()));
            Ok(config)
        }
        Err(err) if explicit.is_some() => {
            error!(severity = ?err.severity(), "{err}");
            eprintln!("Error: {err}");
            Err(EXIT_FAILURE)
        }
        Err(err) => {
            warn!("ignoring configuration: {err}");
            Ok(Config::default())
        }
    }
}

fn compile(path: &Path, base: &Config) -> Result<manifest::Compiled, i32> {
    Manifest::load(path)
        .and_then(|manifest| manifest.compile(base))
        .map_err(|err| {
            error!(severity = ?err.severity(), manifest = %path.display(), "{err}");
            report(&DecreeError::from(err));
            EXIT_FAILURE
        })
}

/// Compile and run a manifest, printing the result as JSON
pub fn run_manifest(path: &Path, base: &Config, color: Option<ColorArg>, args: Vec<OsString>) -> i32 {
    let compiled = match compile(path, base) {
        Ok(compiled) => compiled,
        Err(code) => return code,
    };
    let mut options = RunOptions::new().config(base.clone());
    if let Some(color) = color {
        options = options.styling(Styling {
            color: color.into(),
            ..base.styling()
        });
    }
    match decree::run_with(compiled, args, &options) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => {
                println!("{text}");
                0
            }
            Err(err) => {
                eprintln!("Error: {err}");
                EXIT_FAILURE
            }
        },
        Err(err) => {
            debug!(exit_code = err.exit_code(), "command failed: {err}");
            report(&err);
            err.exit_code()
        }
    }
}

/// Print how a manifest compiled as YAML
pub fn inspect_manifest(path: &Path, base: &Config) -> i32 {
    let compiled = match compile(path, base) {
        Ok(compiled) => compiled,
        Err(code) => return code,
    };
    match inspect::render(&compiled) {
        Ok(text) => {
            print!("{text}");
            0
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            EXIT_FAILURE
        }
    }
}
