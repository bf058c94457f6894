//! Command groups
//!
//! A [`Group`] is built once from a [`GroupBuilder`]: configuration and
//! rendering settings are merged from its ancestors, its own functions are
//! compiled with the merged configuration, and inherited commands keep the
//! position they had in the ancestor. Sub-group registration stays mutable
//! after the group is built, but every registration is checked against the
//! descendant graph so the graph never becomes cyclic.
//!
//! ```
//! use decree::{Group, FunctionSpec, Param, Signature, TypeHint};
//!
//! let f = FunctionSpec::new(
//!     "greet",
//!     Signature::new(vec![Param::positional("name", TypeHint::Str)]).unwrap(),
//!     |_, call| Ok(serde_json::json!(format!("hi {}", call.get::<String>("name")?))),
//! );
//! let group = Group::builder("Cli").command("greet", f).build().unwrap();
//! assert_eq!(group.command_names(), vec!["greet"]);
//! assert_eq!(group.run(["greet", "bob"]).unwrap(), "hi bob");
//! ```

use clap::ArgMatches;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use decree_common::Pretty;
use decree_config::{Config, ConfigOverrides, Styling, ValidationSettings};

use crate::command::{first_paragraph, Command, CommandBuilder};
use crate::context::Context;
use crate::docstring::Docstring;
use crate::error::{CompilationError, DecreeError, RegistrationError, Result};
use crate::host;
use crate::inflect::sanitize;
use crate::metadata::FunctionSpec;
use crate::styling;

/// Class name given to groups assembled from a mapping or a list
pub const ANONYMOUS: &str = "Group";

/// Rendering settings for a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epilog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Run the group's `main` when no sub-command is given instead of showing help
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoke_without_command: Option<bool>,
}

impl GroupSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.epilog = Some(epilog.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    pub fn invoke_without_command(mut self, invoke: bool) -> Self {
        self.invoke_without_command = Some(invoke);
        self
    }

    /// Fields set in `other` win
    pub fn merge(&self, other: &GroupSettings) -> GroupSettings {
        GroupSettings {
            name: other.name.clone().or_else(|| self.name.clone()),
            help: other.help.clone().or_else(|| self.help.clone()),
            epilog: other.epilog.clone().or_else(|| self.epilog.clone()),
            hidden: other.hidden.or(self.hidden),
            invoke_without_command: other.invoke_without_command.or(self.invoke_without_command),
        }
    }

    /// What a derived group picks up; help is inherited through the docstring
    fn inheritable(&self) -> GroupSettings {
        GroupSettings {
            name: None,
            help: None,
            ..self.clone()
        }
    }
}

/// Something that can be placed in a group or run directly
#[derive(Debug, Clone)]
pub enum Runnable {
    Function(FunctionSpec),
    Command(Command),
    Group(Group),
}

impl Runnable {
    /// The name the item is known by when no key is given
    pub fn name(&self) -> String {
        match self {
            Runnable::Function(function) => function.name().to_string(),
            Runnable::Command(command) => command.name().to_string(),
            Runnable::Group(group) => group.name().to_string(),
        }
    }
}

impl From<FunctionSpec> for Runnable {
    fn from(function: FunctionSpec) -> Self {
        Runnable::Function(function)
    }
}

impl From<Command> for Runnable {
    fn from(command: Command) -> Self {
        Runnable::Command(command)
    }
}

impl From<Group> for Runnable {
    fn from(group: Group) -> Self {
        Runnable::Group(group)
    }
}

/// One node of [`Group::descendants`]
#[derive(Debug, Clone)]
pub struct Descendant {
    pub group: Group,
    pub children: Vec<Descendant>,
}

impl Descendant {
    /// `(name, children)` pairs, handy for comparisons
    pub fn names(nodes: &[Descendant]) -> Vec<(String, Vec<String>)> {
        nodes
            .iter()
            .map(|node| {
                (
                    node.group.class_name().to_string(),
                    node.children
                        .iter()
                        .map(|child| child.group.class_name().to_string())
                        .collect(),
                )
            })
            .collect()
    }
}

/// What a register or deregister call actually did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// Class names of the groups added or removed
    pub changed: Vec<String>,
    /// Warnings for the groups that were ignored
    pub warnings: Vec<String>,
}

impl RegistrationOutcome {
    fn ignore(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

struct GroupInner {
    class_name: String,
    name: String,
    /// Raw help text, used for the description and the main's parameter docs
    doc: Option<String>,
    settings: GroupSettings,
    config: Config,
    main_function: Option<FunctionSpec>,
    main: Option<Command>,
    template: clap::Command,
    /// Keyed by member name; the value carries the command-line name
    commands: RwLock<IndexMap<String, Command>>,
    subgroups: RwLock<Vec<Group>>,
}

/// A compiled command group
///
/// Cloning is cheap and clones share registration state. Two `Group`s are
/// equal when they are the same group.
#[derive(Clone)]
pub struct Group {
    inner: Arc<GroupInner>,
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("class_name", &self.inner.class_name)
            .field("name", &self.inner.name)
            .field("commands", &self.command_names())
            .field("subgroups", &self.subgroup_names())
            .finish()
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Group {}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Declares a [`Group`]
///
/// Configuration precedence, lowest first: ancestors (left to right), the
/// scalar setters on this builder, then the fields explicitly set on a
/// [`Config`] passed with [`config`](Self::config).
#[derive(Debug, Clone)]
pub struct GroupBuilder {
    class_name: String,
    bases: Vec<Group>,
    doc: Option<String>,
    main: Option<FunctionSpec>,
    members: Vec<(String, Runnable)>,
    overrides: ConfigOverrides,
    config: Option<Config>,
    settings: GroupSettings,
}

impl GroupBuilder {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            bases: Vec::new(),
            doc: None,
            main: None,
            members: Vec::new(),
            overrides: ConfigOverrides::default(),
            config: None,
            settings: GroupSettings::default(),
        }
    }

    /// Inherit configuration, settings, commands, sub-groups and `main`
    pub fn extends(mut self, base: &Group) -> Self {
        self.bases.push(base.clone());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Top-level parameters of the group, run before any sub-command
    pub fn main(mut self, function: FunctionSpec) -> Self {
        self.main = Some(function);
        self
    }

    /// Add a member; a group member is registered as a sub-group
    pub fn command(mut self, name: impl Into<String>, member: impl Into<Runnable>) -> Self {
        self.members.push((name.into(), member.into()));
        self
    }

    pub fn negate_flags(mut self, value: bool) -> Self {
        self.overrides = self.overrides.negate_flags(value);
        self
    }

    pub fn show_help_defaults(mut self, value: bool) -> Self {
        self.overrides = self.overrides.show_help_defaults(value);
        self
    }

    pub fn show_help_datetime_formats(mut self, value: bool) -> Self {
        self.overrides = self.overrides.show_help_datetime_formats(value);
        self
    }

    pub fn show_help_envvars(mut self, value: bool) -> Self {
        self.overrides = self.overrides.show_help_envvars(value);
        self
    }

    pub fn validation(mut self, value: ValidationSettings) -> Self {
        self.overrides = self.overrides.validation(value);
        self
    }

    pub fn styling(mut self, value: Styling) -> Self {
        self.overrides = self.overrides.styling(value);
        self
    }

    pub fn overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = self.overrides.overlay(&overrides);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn settings(mut self, settings: GroupSettings) -> Self {
        self.settings = self.settings.merge(&settings);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = Some(name.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.settings.help = Some(help.into());
        self
    }

    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.settings.epilog = Some(epilog.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.settings.hidden = Some(hidden);
        self
    }

    pub fn invoke_without_command(mut self, invoke: bool) -> Self {
        self.settings.invoke_without_command = Some(invoke);
        self
    }

    /// Merge the ancestors and compile every member
    ///
    /// # Errors
    ///
    /// Any member function (or `main`) that fails to compile.
    pub fn build(self) -> std::result::Result<Group, CompilationError> {
        let mut base: Option<Config> = None;
        let mut settings = GroupSettings::default();
        let mut inherited_doc = None;
        let mut commands: IndexMap<String, Command> = IndexMap::new();
        let mut subgroups: Vec<Group> = Vec::new();
        let mut main = self.main;

        for ancestor in &self.bases {
            base = Some(match base {
                Some(config) => config.merge(ancestor.config()),
                None => ancestor.config().clone(),
            });
            settings = settings.merge(&ancestor.inner.settings.inheritable());
            if ancestor.inner.doc.is_some() {
                inherited_doc = ancestor.inner.doc.clone();
            }
            for (key, command) in ancestor.members() {
                commands.entry(key).or_insert(command);
            }
            for subgroup in ancestor.subgroups() {
                if !subgroups.contains(&subgroup) {
                    subgroups.push(subgroup);
                }
            }
            if main.is_none() {
                main = ancestor.inner.main_function.clone();
            }
        }

        let mut config = Config::create(base.as_ref(), self.overrides);
        if let Some(explicit) = &self.config {
            config = config.merge(explicit);
        }
        let settings = settings.merge(&self.settings);

        for (key, member) in self.members {
            let command = match member {
                Runnable::Function(function) => CommandBuilder::new(function).config(config.clone()).build()?,
                Runnable::Command(command) => command,
                Runnable::Group(group) => {
                    if !subgroups.contains(&group) {
                        subgroups.push(group);
                    }
                    continue;
                }
            };
            commands.insert(key, command);
        }

        let name = settings
            .name
            .clone()
            .unwrap_or_else(|| sanitize(&self.class_name));
        let doc = settings
            .help
            .clone()
            .or_else(|| main.as_ref().and_then(|f| f.docstring().map(str::to_string)))
            .or(self.doc)
            .or(inherited_doc);
        let description = doc.as_deref().and_then(|doc| Docstring::parse(doc).description());

        let compiled_main = match &main {
            Some(function) => {
                let function = match &doc {
                    Some(doc) => function.clone().doc(doc.clone()),
                    None => function.clone(),
                };
                let mut builder = CommandBuilder::new(function).config(config.clone());
                if let Some(description) = &description {
                    builder = builder.help(description.clone());
                }
                let command = builder.build()?;
                Some(if command.name() == name {
                    command
                } else {
                    command.renamed(name.clone())
                })
            }
            None => None,
        };
        let template = match &compiled_main {
            Some(command) => command.to_clap(),
            None => host::command(&name, &[])?,
        };

        debug!(
            group = %name,
            commands = commands.len(),
            subgroups = subgroups.len(),
            main = compiled_main.is_some(),
            config = %Pretty(&config.effective()),
            "built group"
        );

        Ok(Group {
            inner: Arc::new(GroupInner {
                class_name: self.class_name,
                name,
                doc,
                settings,
                config,
                main_function: main,
                main: compiled_main,
                template,
                commands: RwLock::new(commands),
                subgroups: RwLock::new(subgroups),
            }),
        })
    }
}

impl Group {
    pub fn builder(class_name: impl Into<String>) -> GroupBuilder {
        GroupBuilder::new(class_name)
    }

    /// Name used in registration messages
    pub fn class_name(&self) -> &str {
        &self.inner.class_name
    }

    /// Command-line name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Description shown in help
    pub fn help(&self) -> Option<String> {
        self.inner
            .doc
            .as_deref()
            .and_then(|doc| Docstring::parse(doc).description())
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn settings(&self) -> &GroupSettings {
        &self.inner.settings
    }

    pub fn main(&self) -> Option<&Command> {
        self.inner.main.as_ref()
    }

    fn members(&self) -> Vec<(String, Command)> {
        read(&self.inner.commands)
            .iter()
            .map(|(key, command)| (key.clone(), command.clone()))
            .collect()
    }

    /// Commands in declaration order, inherited ones first
    pub fn commands(&self) -> Vec<Command> {
        read(&self.inner.commands).values().cloned().collect()
    }

    pub fn command_names(&self) -> Vec<String> {
        read(&self.inner.commands)
            .values()
            .map(|command| command.name().to_string())
            .collect()
    }

    /// A command by its command-line name
    pub fn command(&self, name: &str) -> Option<Command> {
        read(&self.inner.commands)
            .values()
            .find(|command| command.name() == name)
            .cloned()
    }

    /// Registered sub-groups in registration order
    pub fn subgroups(&self) -> Vec<Group> {
        read(&self.inner.subgroups).clone()
    }

    pub fn subgroup_names(&self) -> Vec<String> {
        read(&self.inner.subgroups)
            .iter()
            .map(|group| group.name().to_string())
            .collect()
    }

    /// The tree of registered sub-groups
    pub fn descendants(&self) -> Vec<Descendant> {
        self.subgroups()
            .into_iter()
            .map(|group| Descendant {
                children: group.descendants(),
                group,
            })
            .collect()
    }

    /// Every group reachable through registrations, depth first
    fn walk(&self) -> Vec<Group> {
        let mut found = Vec::new();
        for group in self.subgroups() {
            let below = group.walk();
            found.push(group);
            found.extend(below);
        }
        found
    }

    /// Would registering `target` (or, with `None`, the current graph) make a cycle?
    fn check_descendants(&self, target: Option<&Group>) -> std::result::Result<(), RegistrationError> {
        if target.is_some_and(|target| target == self) {
            return Err(RegistrationError::new(format!(
                "Group '{}' cannot be a subgroup of itself.",
                self.class_name()
            )));
        }
        let group = target.unwrap_or(self);
        if group.walk().contains(self) {
            return Err(RegistrationError::new(format!(
                "Group '{}' is a descendant subgroup of '{}', causing a circular dependency.",
                self.class_name(),
                group.class_name()
            )));
        }
        Ok(())
    }

    /// Register sub-groups
    ///
    /// Groups already registered are skipped with a warning. Nothing is
    /// registered if any group would create a cycle.
    ///
    /// # Errors
    ///
    /// Registering the group under itself, or under one of its descendants.
    pub fn register<'a, I>(&self, subgroups: I) -> std::result::Result<RegistrationOutcome, RegistrationError>
    where
        I: IntoIterator<Item = &'a Group>,
    {
        let current = self.subgroups();
        let mut pending: Vec<Group> = Vec::new();
        let mut outcome = RegistrationOutcome::default();
        for group in subgroups {
            if current.contains(group) || pending.contains(group) {
                outcome.ignore(format!(
                    "Group '{}' is already registered as a subgroup under '{}' and will be ignored.",
                    group.class_name(),
                    self.class_name()
                ));
                continue;
            }
            self.check_descendants(Some(group))?;
            pending.push(group.clone());
        }
        outcome.changed = pending.iter().map(|g| g.class_name().to_string()).collect();
        debug!(group = %self.class_name(), registered = ?outcome.changed, "registered subgroups");
        write(&self.inner.subgroups).extend(pending);
        Ok(outcome)
    }

    /// Deregister sub-groups; groups that are not registered are skipped with a warning
    pub fn deregister<'a, I>(&self, subgroups: I) -> RegistrationOutcome
    where
        I: IntoIterator<Item = &'a Group>,
    {
        let current = self.subgroups();
        let mut removed: Vec<Group> = Vec::new();
        let mut outcome = RegistrationOutcome::default();
        for group in subgroups {
            if !current.contains(group) || removed.contains(group) {
                outcome.ignore(format!(
                    "Group '{}' is not a registered subgroup under '{}' and will be ignored.",
                    group.class_name(),
                    self.class_name()
                ));
                continue;
            }
            removed.push(group.clone());
        }
        outcome.changed = removed.iter().map(|g| g.class_name().to_string()).collect();
        write(&self.inner.subgroups).retain(|group| !removed.contains(group));
        outcome
    }

    /// Remove every registered sub-group
    pub fn deregister_all(&self) -> RegistrationOutcome {
        let removed = std::mem::take(&mut *write(&self.inner.subgroups));
        RegistrationOutcome {
            changed: removed.iter().map(|g| g.class_name().to_string()).collect(),
            warnings: Vec::new(),
        }
    }

    /// Add commands after the group was built
    ///
    /// Functions are compiled with the group's configuration. Unnamed members
    /// keep their own names; named ones are renamed to the given key. A
    /// member replacing an existing one moves to the end.
    ///
    /// # Errors
    ///
    /// A function that fails to compile. Nothing is added in that case.
    pub fn add_commands<N>(&self, commands: Vec<Runnable>, named: N) -> std::result::Result<(), CompilationError>
    where
        N: IntoIterator<Item = (String, Runnable)>,
    {
        let mut added: IndexMap<String, Command> = IndexMap::new();
        for member in commands {
            match member {
                Runnable::Function(function) => {
                    let key = function.name().to_string();
                    added.insert(key, self.compile_member(function, None)?);
                }
                Runnable::Command(command) => {
                    added.insert(member_key(&command), command);
                }
                Runnable::Group(group) => {
                    return Err(CompilationError::new(format!(
                        "Group '{}' cannot be added as a command, register it instead.",
                        group.class_name()
                    )))
                }
            }
        }
        for (name, member) in named {
            match member {
                Runnable::Function(function) => {
                    let key = function.name().to_string();
                    added.insert(key, self.compile_member(function, Some(&name))?);
                }
                Runnable::Command(command) => {
                    added.insert(member_key(&command), command.renamed(name));
                }
                Runnable::Group(group) => {
                    return Err(CompilationError::new(format!(
                        "Group '{}' cannot be added as a command, register it instead.",
                        group.class_name()
                    )))
                }
            }
        }

        let mut members = write(&self.inner.commands);
        for (key, command) in added {
            members.shift_remove(&key);
            members.insert(key, command);
        }
        Ok(())
    }

    fn compile_member(&self, function: FunctionSpec, name: Option<&str>) -> std::result::Result<Command, CompilationError> {
        let function = match name {
            Some(name) if function.metadata().command_name.is_some() => {
                function.rename(Some(name), Vec::<(String, String)>::new())?
            }
            _ => function,
        };
        let mut builder = CommandBuilder::new(function).config(self.config().clone());
        if let Some(name) = name {
            builder = builder.name(name);
        }
        builder.build()
    }

    /// A derived group with a different command-line name
    ///
    /// The copy inherits everything from this group, including a snapshot of
    /// its registrations.
    pub fn renamed(&self, name: impl Into<String>) -> std::result::Result<Group, CompilationError> {
        let mut builder = GroupBuilder::new(self.class_name()).extends(self).name(name);
        if let Some(doc) = &self.inner.doc {
            builder = builder.doc(doc.clone());
        }
        builder.build()
    }

    /// Build a group from named members
    ///
    /// Members whose key differs from their own name are renamed copies;
    /// groups become sub-groups.
    ///
    /// # Errors
    ///
    /// A member that fails to compile.
    pub fn from_dict<I, K>(entries: I, settings: GroupSettings, config: Option<Config>) -> Result<Group>
    where
        I: IntoIterator<Item = (K, Runnable)>,
        K: Into<String>,
    {
        let mut builder = GroupBuilder::new(ANONYMOUS).settings(settings);
        if let Some(config) = config {
            builder = builder.config(config);
        }
        let mut subgroups = Vec::new();
        let mut functions = Vec::new();
        for (key, member) in entries {
            let key = key.into();
            match member {
                Runnable::Function(function) => {
                    functions.push(key.clone());
                    builder = builder.command(key, function);
                }
                Runnable::Command(command) if command.name() != key => {
                    builder = builder.command(key.clone(), command.renamed(key));
                }
                Runnable::Command(command) => builder = builder.command(key, command),
                Runnable::Group(group) if group.name() != key => subgroups.push(group.renamed(key)?),
                Runnable::Group(group) => subgroups.push(group),
            }
        }
        let group = builder.build()?;

        // functions compile under the group config first, then take their key as name
        if !functions.is_empty() {
            let mut members = write(&group.inner.commands);
            for key in &functions {
                if let Some(command) = members.get_mut(key) {
                    if command.name() != key {
                        *command = command.renamed(key.clone());
                    }
                }
            }
        }
        group.register(&subgroups)?;
        Ok(group)
    }

    /// Build a group from members named after themselves
    ///
    /// # Errors
    ///
    /// A member that fails to compile.
    pub fn from_iter<I>(items: I, settings: GroupSettings, config: Option<Config>) -> Result<Group>
    where
        I: IntoIterator<Item = Runnable>,
    {
        let mut builder = GroupBuilder::new(ANONYMOUS).settings(settings);
        if let Some(config) = config {
            builder = builder.config(config);
        }
        let mut subgroups = Vec::new();
        for item in items {
            match item {
                Runnable::Group(group) => subgroups.push(group),
                member => builder = builder.command(member.name(), member),
            }
        }
        let group = builder.build()?;
        group.register(&subgroups)?;
        Ok(group)
    }

    /// Build the clap command tree
    ///
    /// Compiling does not change the group; compiling twice gives the same
    /// tree.
    ///
    /// # Errors
    ///
    /// The registration graph has become cyclic.
    pub fn compile(&self) -> std::result::Result<clap::Command, RegistrationError> {
        self.check_descendants(None)?;

        let invoke = self.inner.settings.invoke_without_command.unwrap_or(false);
        let mut cmd = self.inner.template.clone().name(self.name().to_string());
        if let Some(help) = self.help() {
            cmd = cmd.about(first_paragraph(&help)).long_about(help);
        }
        if let Some(epilog) = &self.inner.settings.epilog {
            cmd = cmd.after_help(epilog.clone());
        }
        cmd = cmd
            .hide(self.inner.settings.hidden.unwrap_or(false))
            .subcommand_required(!invoke)
            .arg_required_else_help(!invoke)
            .disable_help_subcommand(true)
            .subcommand_value_name("COMMAND")
            .subcommand_help_heading("Commands");

        for command in self.commands() {
            cmd = cmd.subcommand(command.to_clap());
        }
        for subgroup in self.subgroups() {
            cmd = cmd.subcommand(subgroup.compile()?);
        }
        debug!(group = %self.name(), subcommands = cmd.get_subcommands().count(), "compiled group");
        Ok(styling::apply(cmd, &styling::effective(self.inner.config.styling())))
    }

    /// Parse `args` (without the program name) and run
    ///
    /// `main` runs first; the selected command then runs with a context that
    /// shares whatever `main` stashed. Without a sub-command the result is
    /// that of `main`.
    ///
    /// # Errors
    ///
    /// Registration cycles, anything clap rejects, then whatever the bodies
    /// report.
    pub fn run<I, T>(&self, args: I) -> Result<Value>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut cmd = self.compile()?;
        let argv = std::iter::once(OsString::from(self.name())).chain(args.into_iter().map(Into::into));
        let matches = cmd.try_get_matches_from_mut(argv)?;
        let mut ctx = Context::new(self.name());
        self.dispatch(&mut ctx, &matches, &mut cmd)
    }

    fn dispatch(&self, ctx: &mut Context, matches: &ArgMatches, cmd: &mut clap::Command) -> Result<Value> {
        let mut result = Value::Null;
        if let Some(main) = &self.inner.main {
            result = main.execute(ctx, matches, cmd)?;
        }
        let Some((name, sub_matches)) = matches.subcommand() else {
            return Ok(result);
        };
        let sub_cmd = cmd
            .find_subcommand_mut(name)
            .ok_or_else(|| DecreeError::cli(format!("No such command '{name}'.")))?;
        let mut child = ctx.child(name);
        if let Some(command) = self.command(name) {
            return command.execute(&mut child, sub_matches, sub_cmd);
        }
        match self.subgroups().into_iter().find(|group| group.name() == name) {
            Some(group) => group.dispatch(&mut child, sub_matches, sub_cmd),
            None => Err(DecreeError::cli(format!("No such command '{name}'."))),
        }
    }
}

/// Key of a command added by value: its function's name
fn member_key(command: &Command) -> String {
    command.function().name().to_string()
}
