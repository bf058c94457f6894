//! Reports describing how a manifest compiled

use decree::{Command, Group, ParameterSpec};
use decree_config::EffectiveConfig;
use serde::Serialize;

use crate::manifest::Compiled;

#[derive(Debug, Serialize)]
pub struct CommandReport<'a> {
    pub command: &'a str,
    pub function: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    pub parameters: Vec<&'a ParameterSpec>,
}

impl<'a> CommandReport<'a> {
    pub fn new(command: &'a Command) -> Self {
        Self {
            command: command.name(),
            function: command.function().name(),
            help: command.help(),
            hidden: command.is_hidden(),
            parameters: command.parameters().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub config: EffectiveConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<serde_json::Value>,
    pub commands: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupReport>,
}

impl GroupReport {
    pub fn new(group: &Group) -> serde_json::Result<Self> {
        Ok(Self {
            group: group.name().to_string(),
            help: group.help(),
            config: group.config().effective(),
            main: group
                .main()
                .map(|main| serde_json::to_value(CommandReport::new(main)))
                .transpose()?,
            commands: group
                .commands()
                .iter()
                .map(|command| serde_json::to_value(CommandReport::new(command)))
                .collect::<serde_json::Result<_>>()?,
            groups: group
                .subgroups()
                .iter()
                .map(GroupReport::new)
                .collect::<serde_json::Result<_>>()?,
        })
    }
}

/// Render a compiled manifest as YAML
pub fn render(compiled: &Compiled) -> anyhow::Result<String> {
    let text = match compiled {
        Compiled::Command(command) => serde_yaml_ng::to_string(&CommandReport::new(command))?,
        Compiled::Group(group) => serde_yaml_ng::to_string(&GroupReport::new(group)?)?,
    };
    Ok(text)
}
