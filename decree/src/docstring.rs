//! Structured docstring parsing
//!
//! Only two projections are read by the compiler: the description (short
//! summary plus long body) and the per-parameter descriptions. Both numpydoc
//! (`Parameters` underlined by dashes) and Google (`Args:`) layouts are
//! understood.

use once_cell::sync::Lazy;
use regex::Regex;

/// Section titles that end the description in numpydoc layout
const NUMPY_SECTIONS: &[&str] = &[
    "Parameters",
    "Other Parameters",
    "Returns",
    "Yields",
    "Receives",
    "Raises",
    "Warns",
    "Warnings",
    "See Also",
    "Notes",
    "References",
    "Examples",
    "Attributes",
    "Methods",
];

/// Section titles that end the description in Google layout
const GOOGLE_SECTIONS: &[&str] = &[
    "Args",
    "Arguments",
    "Parameters",
    "Params",
    "Keyword Args",
    "Keyword Arguments",
    "Returns",
    "Return",
    "Yields",
    "Raises",
    "Examples",
    "Example",
    "Note",
    "Notes",
    "Attributes",
    "Todo",
];

const PARAM_SECTIONS: &[&str] = &[
    "Parameters",
    "Other Parameters",
    "Args",
    "Arguments",
    "Params",
    "Keyword Args",
    "Keyword Arguments",
];

static GOOGLE_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*{0,2}([A-Za-z_][A-Za-z0-9_]*)\s*(?:\([^)]*\))?\s*:\s*(.*)$").unwrap());
static NUMPY_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*{0,2}([A-Za-z_][A-Za-z0-9_]*)\s*(?::.*)?$").unwrap());
static UNDERLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-{3,}\s*$").unwrap());

/// One documented parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocParam {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Docstring {
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub blank_after_short_description: bool,
    pub params: Vec<DocParam>,
}

impl Docstring {
    pub fn parse(text: &str) -> Self {
        let lines = clean_lines(text);
        let sections = split_sections(&lines);

        let mut doc = Docstring::default();
        let description = sections.description.join("\n");
        let description = description.trim();
        if !description.is_empty() {
            let (short, rest) = match description.split_once('\n') {
                Some((short, rest)) => (short, rest),
                None => (description, ""),
            };
            doc.short_description = Some(short.trim().to_string());
            doc.blank_after_short_description =
                rest.trim_start_matches([' ', '\t']).starts_with('\n');
            let long = rest.trim();
            if !long.is_empty() {
                doc.long_description = Some(long.to_string());
            }
        }

        for section in sections.params {
            match section.layout {
                Layout::Numpy => doc.params.extend(numpy_params(&section.body)),
                Layout::Google => doc.params.extend(google_params(&section.body)),
            }
        }
        doc
    }

    /// Short and long descriptions joined the way help text shows them
    pub fn description(&self) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(short) = &self.short_description {
            parts.push(short);
            if self.blank_after_short_description {
                parts.push("");
            }
        }
        if let Some(long) = &self.long_description {
            parts.push(long);
        }
        let joined = parts.join("\n");
        let joined = joined.trim();
        if joined.is_empty() {
            None
        } else {
            Some(joined.to_string())
        }
    }

    /// Description of the named parameter, if documented
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.description.as_str())
    }
}

/// Description of a docstring, `None` when there is nothing to show
pub fn description(text: &str) -> Option<String> {
    Docstring::parse(text).description()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Numpy,
    Google,
}

struct Section {
    layout: Layout,
    body: Vec<String>,
}

struct Sections {
    description: Vec<String>,
    params: Vec<Section>,
}

/// Strip surrounding blank lines and the common indentation of every line
/// after the first
fn clean_lines(text: &str) -> Vec<String> {
    let raw: Vec<&str> = text.lines().collect();
    let indent = raw
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let mut lines: Vec<String> = raw
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 {
                l.trim().to_string()
            } else if l.trim().is_empty() {
                String::new()
            } else {
                l[indent.min(l.len() - l.trim_start().len())..].trim_end().to_string()
            }
        })
        .collect();
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn section_start(lines: &[String], i: usize) -> Option<(Layout, &str)> {
    let line = lines[i].as_str();
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let title = line.trim();
    if NUMPY_SECTIONS.contains(&title) && lines.get(i + 1).is_some_and(|l| UNDERLINE.is_match(l.trim())) {
        return Some((Layout::Numpy, title));
    }
    let title = title.strip_suffix(':')?;
    if GOOGLE_SECTIONS.contains(&title) {
        return Some((Layout::Google, title));
    }
    None
}

fn split_sections(lines: &[String]) -> Sections {
    let mut description = Vec::new();
    let mut params = Vec::new();
    let mut current: Option<(Layout, bool, Vec<String>)> = None;
    let mut i = 0;

    while i < lines.len() {
        if let Some((layout, title)) = section_start(lines, i) {
            if let Some((layout, true, body)) = current.take() {
                params.push(Section { layout, body });
            }
            let is_params = PARAM_SECTIONS.contains(&title);
            current = Some((layout, is_params, Vec::new()));
            i += if layout == Layout::Numpy { 2 } else { 1 };
            continue;
        }
        match current.as_mut() {
            Some((_, _, body)) => body.push(lines[i].clone()),
            None => description.push(lines[i].clone()),
        }
        i += 1;
    }
    if let Some((layout, true, body)) = current {
        params.push(Section { layout, body });
    }

    Sections {
        description,
        params,
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn finish(entries: &mut Vec<DocParam>, name: Option<String>, body: &[String]) {
    if let Some(name) = name {
        let description = body
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        entries.push(DocParam { name, description });
    }
}

fn numpy_params(body: &[String]) -> Vec<DocParam> {
    let mut entries = Vec::new();
    let mut name: Option<String> = None;
    let mut text: Vec<String> = Vec::new();
    for line in body {
        if line.is_empty() {
            text.push(String::new());
            continue;
        }
        if indentation(line) == 0 {
            if let Some(caps) = NUMPY_ENTRY.captures(line.trim()) {
                finish(&mut entries, name.take(), &text);
                text.clear();
                name = Some(caps[1].to_string());
                continue;
            }
        }
        text.push(line.clone());
    }
    finish(&mut entries, name, &text);
    entries
}

fn google_params(body: &[String]) -> Vec<DocParam> {
    let base = body
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| indentation(l))
        .min()
        .unwrap_or(0);
    let mut entries = Vec::new();
    let mut name: Option<String> = None;
    let mut text: Vec<String> = Vec::new();
    for line in body {
        if line.is_empty() {
            text.push(String::new());
            continue;
        }
        if indentation(line) == base {
            if let Some(caps) = GOOGLE_ENTRY.captures(line.trim()) {
                finish(&mut entries, name.take(), &text);
                text.clear();
                name = Some(caps[1].to_string());
                text.push(caps[2].to_string());
                continue;
            }
        }
        text.push(line.clone());
    }
    finish(&mut entries, name, &text);
    entries
}
