//! Name inflection for command and flag names

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static UNWANTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[^a-z0-9\-_]+").unwrap());
static REPEATED_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Decompose accented letters and drop whatever is left outside ASCII
pub fn transliterate(name: &str) -> String {
    name.nfkd().filter(char::is_ascii).collect()
}

/// Make a lowercase, hyphen-separated token usable on the command line
///
/// ```
/// use decree::inflect::sanitize;
///
/// assert_eq!(sanitize("---a@b_c--"), "a-b_c");
/// assert_eq!(sanitize("Donald E. Knuth"), "donald-e-knuth");
/// ```
pub fn sanitize(name: &str) -> String {
    let ascii = transliterate(name);
    let replaced = UNWANTED.replace_all(&ascii, "-");
    let collapsed = REPEATED_SEPARATOR.replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_lowercase()
}

/// Turn a parameter name into a long flag
///
/// ```
/// use decree::inflect::optionize;
///
/// assert_eq!(optionize("opt_name"), "--opt-name");
/// ```
pub fn optionize(name: &str) -> String {
    let kebab = sanitize(name).replace('_', "-");
    format!("--{}", kebab.trim_matches('-'))
}

/// `--opt` becomes `--no-opt`
pub fn negate_option(option: &str) -> String {
    format!("--no{}", option.strip_prefix('-').unwrap_or(option))
}

/// `-a` becomes `--no-a`
pub fn negate_alias(alias: &str) -> String {
    format!("--no{alias}")
}
