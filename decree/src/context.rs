//! The invocation context handed to command bodies
//!
//! A [`Context`] carries the path of the running command, the parameters the
//! host parser produced for it, and a typed extension store. A group's `main`
//! body can stash shared state in the store; every command dispatched below
//! that group sees it.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::error::Result;
use crate::validation::BoundCall;

/// Validated arguments of one call, keyed by original parameter name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Call {
    values: BoundCall,
}

impl Call {
    pub fn new(values: BoundCall) -> Self {
        Self { values }
    }

    /// Deserialize one argument
    ///
    /// # Errors
    ///
    /// The parameter is unknown or its value does not deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("no argument named '{name}'"))?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("argument '{name}' has an unexpected shape: {e}"))
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All arguments as a JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    pub fn into_inner(self) -> BoundCall {
        self.values
    }
}

/// Type-keyed storage shared from a group down to its commands
#[derive(Clone, Default)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> Option<Arc<T>> {
        self.map
            .insert(TypeId::of::<T>(), Arc::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    command_path: Vec<String>,
    params: IndexMap<String, Value>,
    extensions: Extensions,
}

impl Context {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command_path: vec![command.into()],
            ..Self::default()
        }
    }

    /// Context for a command dispatched below this one
    ///
    /// The extension store is shared; parameters are not.
    pub fn child(&self, command: impl Into<String>) -> Self {
        let mut command_path = self.command_path.clone();
        command_path.push(command.into());
        Self {
            command_path,
            params: IndexMap::new(),
            extensions: self.extensions.clone(),
        }
    }

    pub fn with_params(mut self, params: IndexMap<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub(crate) fn set_params(&mut self, params: IndexMap<String, Value>) {
        self.params = params;
    }

    /// Name of the running command
    pub fn info_name(&self) -> &str {
        self.command_path.last().map(String::as_str).unwrap_or_default()
    }

    /// `root sub command`
    pub fn command_path(&self) -> String {
        self.command_path.join(" ")
    }

    /// Parsed parameters of the running command, keyed by their command-line name
    pub fn params(&self) -> &IndexMap<String, Value> {
        &self.params
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> Option<Arc<T>> {
        self.extensions.insert(value)
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Run another compiled command with the given command-line-named values
    ///
    /// The values go through that command's own validation; missing values
    /// take the command's defaults.
    pub fn invoke(&mut self, command: &Command, params: IndexMap<String, Value>) -> Result<Value> {
        let mut child = self.child(command.name());
        let params = command.with_defaults(params);
        child.params = params.clone();
        let result = command.call(&mut child, params);
        self.extensions = child.extensions;
        result
    }

    /// Run another command with this command's parameters
    pub fn forward(&mut self, command: &Command) -> Result<Value> {
        let params = self.params.clone();
        self.invoke(command, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Root(String);

    #[test]
    fn test_call_accessors() {
        let call = Call::new(BoundCall::from([
            ("count".to_string(), json!(3)),
            ("names".to_string(), json!(["a", "b"])),
        ]));
        assert_eq!(call.get::<u32>("count").unwrap(), 3);
        assert_eq!(call.get::<Vec<String>>("names").unwrap(), vec!["a", "b"]);
        assert!(call.get::<String>("count").is_err());
        assert!(call.get::<u32>("missing").is_err());
        assert_eq!(call.to_value(), json!({"count": 3, "names": ["a", "b"]}));
    }

    #[test]
    fn test_extensions_are_shared_with_children() {
        let mut root = Context::new("cli");
        assert!(root.insert(Root("/tmp".to_string())).is_none());
        let child = root.child("sub");
        assert_eq!(child.get::<Root>(), Some(&Root("/tmp".to_string())));
        assert_eq!(child.command_path(), "cli sub");
        assert_eq!(child.info_name(), "sub");
        assert!(child.get::<u32>().is_none());
    }

    #[test]
    fn test_insert_returns_previous() {
        let mut ctx = Context::new("cli");
        ctx.insert(1u32);
        let previous = ctx.insert(2u32).unwrap();
        assert_eq!(*previous, 1);
        assert_eq!(ctx.get::<u32>(), Some(&2));
        assert_eq!(ctx.extensions().len(), 1);
    }
}
