//! Service definitions
//!
//! A [`Definition`] is the declarative recipe for one service: which component
//! type to build, the constructor arguments, the properties to assign and the
//! methods to call afterwards, plus the `public` and `shared` policies.
//!
//! Definitions are plain data. They never hold on to the instances built from
//! them, so one definition may produce many instances when it is not shared.
//!
//! String arguments use a small reference syntax that the container expands
//! at build time:
//!
//! - `"@logger"` is replaced by the resolved `logger` service
//! - `"%env%"` is replaced by the current value of the `env` parameter
//!
//! Property values and method call arguments are always passed literally.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A method invoked on a freshly built service, after its properties are set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Method name understood by the component's adapter
    pub method: String,

    /// Literal arguments, passed without reference substitution
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl MethodCall {
    /// Create a new method call
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Recipe for building one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Component type identifier, looked up in the component catalog
    #[serde(rename = "type")]
    type_id: String,

    /// Constructor arguments, in order
    #[serde(default)]
    arguments: Vec<Value>,

    /// Properties assigned after construction, in declaration order
    #[serde(default)]
    properties: IndexMap<String, Value>,

    /// Methods called after the properties are assigned, in declaration order
    #[serde(default)]
    calls: Vec<MethodCall>,

    /// Whether the service may be fetched directly by its id
    #[serde(default = "default_true")]
    public: bool,

    /// Whether the built instance is cached and reused
    #[serde(default = "default_true")]
    shared: bool,
}

fn default_true() -> bool {
    true
}

impl Definition {
    /// Create a public, shared definition with no arguments
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            arguments: Vec::new(),
            properties: IndexMap::new(),
            calls: Vec::new(),
            public: true,
            shared: true,
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn set_type_id(&mut self, type_id: impl Into<String>) {
        self.type_id = type_id.into();
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn set_arguments(&mut self, arguments: Vec<Value>) {
        self.arguments = arguments;
    }

    /// Append a constructor argument
    pub fn add_argument(&mut self, argument: impl Into<Value>) {
        self.arguments.push(argument.into());
    }

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    pub fn set_properties(&mut self, properties: IndexMap<String, Value>) {
        self.properties = properties;
    }

    /// Set a single property, replacing any earlier value under that name
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn calls(&self) -> &[MethodCall] {
        &self.calls
    }

    pub fn set_calls(&mut self, calls: Vec<MethodCall>) {
        self.calls = calls;
    }

    /// Append a method call
    pub fn add_call(&mut self, method: impl Into<String>, arguments: Vec<Value>) {
        self.calls.push(MethodCall::new(method, arguments));
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn set_public(&mut self, public: bool) {
        self.public = public;
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn set_shared(&mut self, shared: bool) {
        self.shared = shared;
    }

    // Builder-style helpers

    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_argument(mut self, argument: impl Into<Value>) -> Self {
        self.add_argument(argument);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn with_call(mut self, method: impl Into<String>, arguments: Vec<Value>) -> Self {
        self.add_call(method, arguments);
        self
    }

    /// Mark the definition as reachable only through an alias
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Build a fresh instance on every lookup
    pub fn unshared(mut self) -> Self {
        self.shared = false;
        self
    }
}
