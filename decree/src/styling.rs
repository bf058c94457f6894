//! Help and error presentation
//!
//! A command renders with its own [`Styling`] unless a top-level run has
//! installed an override. The override is process-global and lives only for
//! the duration of that run; [`override_styling`] hands back a guard that
//! restores whatever was installed before.

use clap::ColorChoice;
use once_cell::sync::Lazy;
use scopeguard::ScopeGuard;
use std::sync::RwLock;
use tracing::trace;

use decree_config::{ColorMode, Styling};

static OVERRIDE: Lazy<RwLock<Option<Styling>>> = Lazy::new(|| RwLock::new(None));

/// The installed override, if any
pub fn current_override() -> Option<Styling> {
    match OVERRIDE.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn install(styling: Option<Styling>) -> Option<Styling> {
    let mut slot = match OVERRIDE.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    std::mem::replace(&mut *slot, styling)
}

/// Install `styling` until the returned guard drops
pub fn override_styling(styling: Styling) -> ScopeGuard<Option<Styling>, impl FnOnce(Option<Styling>)> {
    trace!(?styling, "installing styling override");
    let previous = install(Some(styling));
    scopeguard::guard(previous, |previous| {
        install(previous);
    })
}

/// Styling a command should render with
pub fn effective(own: Styling) -> Styling {
    current_override().unwrap_or(own)
}

pub fn color_choice(mode: ColorMode) -> ColorChoice {
    match mode {
        ColorMode::Auto => ColorChoice::Auto,
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
    }
}

/// Apply color and width settings to a clap command and its subcommands
pub fn apply(cmd: clap::Command, styling: &Styling) -> clap::Command {
    let mut cmd = cmd.color(color_choice(styling.color));
    if let Some(width) = styling.max_width {
        cmd = cmd.max_term_width(width);
    }
    cmd
}
