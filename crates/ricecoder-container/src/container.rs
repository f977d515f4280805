//! The service container
//!
//! [`Container`] stores definitions, aliases, parameters and built instances,
//! and resolves services lazily on first lookup.
//!
//! All ids are case-insensitive: they are lower-cased on every insert and
//! lookup. Aliases resolve in a single hop.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

use crate::argument::{Argument, Arguments};
use crate::component::{component_error, Component, ComponentCatalog};
use crate::definition::Definition;
use crate::{ContainerOptions, DIError, DIResult};

/// A built service instance
pub type Service = Arc<dyn Any + Send + Sync>;

/// Id under which every container registers itself by default
pub const SERVICE_CONTAINER_ID: &str = "service_container";

/// Prefix marking an argument as a service reference: `@logger`
pub const SERVICE_MARKER: char = '@';

/// Delimiter wrapping an argument that names a parameter: `%env%`
pub const PARAMETER_MARKER: char = '%';

/// Contents of one slot in the instance store
enum Slot {
    Service(Service),
    /// The container itself, held weakly so it does not keep itself alive
    Container,
}

/// Runtime service registry.
///
/// Created through [`Container::new`] (or [`ContainerBuilder`](crate::ContainerBuilder))
/// and shared as `Arc<Container>`. Every method takes `&self`; the maps sit
/// behind `parking_lot` locks that are never held while component code runs,
/// so constructors may call back into the container.
pub struct Container {
    this: Weak<Container>,
    options: ContainerOptions,
    catalog: RwLock<ComponentCatalog>,
    instances: RwLock<HashMap<String, Slot>>,
    aliases: RwLock<HashMap<String, String>>,
    definitions: RwLock<HashMap<String, Arc<Definition>>>,
    parameters: RwLock<HashMap<String, Value>>,
}

fn normalize(id: &str) -> String {
    id.to_lowercase()
}

/// Inner name of a `%name%` argument, if the string is one
fn parameter_name(raw: &str) -> Option<&str> {
    if raw.len() > 2 && raw.starts_with(PARAMETER_MARKER) && raw.ends_with(PARAMETER_MARKER) {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

impl Container {
    /// Create a container using every component type submitted via inventory
    pub fn new() -> Arc<Self> {
        Self::with_catalog(ComponentCatalog::discovered())
    }

    /// Create a container with an explicit component catalog
    pub fn with_catalog(catalog: ComponentCatalog) -> Arc<Self> {
        Self::with_options(catalog, ContainerOptions::default())
    }

    pub fn with_options(catalog: ComponentCatalog, options: ContainerOptions) -> Arc<Self> {
        Arc::new_cyclic(|this| {
            let mut instances = HashMap::new();
            instances.insert(normalize(&options.self_id), Slot::Container);

            debug!("Created service container (self id: {})", options.self_id);

            Self {
                this: this.clone(),
                options,
                catalog: RwLock::new(catalog),
                instances: RwLock::new(instances),
                aliases: RwLock::new(HashMap::new()),
                definitions: RwLock::new(HashMap::new()),
                parameters: RwLock::new(HashMap::new()),
            }
        })
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Store a pre-built instance under `id`, replacing whatever was there
    pub fn set<T>(&self, id: &str, service: Arc<T>) -> &Self
    where
        T: Send + Sync + 'static,
    {
        self.set_service(id, service)
    }

    /// Type-erased variant of [`set`](Self::set)
    pub fn set_service(&self, id: &str, service: Service) -> &Self {
        let id = normalize(id);
        debug!("Stored service instance: {}", id);
        self.instances.write().insert(id, Slot::Service(service));
        self
    }

    /// Point `alias` at `target`. Aliases are not followed transitively.
    pub fn set_alias(&self, alias: &str, target: &str) -> &Self {
        let alias = normalize(alias);
        let target = normalize(target);
        debug!("Registered alias: {} -> {}", alias, target);
        self.aliases.write().insert(alias, target);
        self
    }

    pub fn set_parameter(&self, id: &str, value: impl Into<Value>) -> &Self {
        self.parameters.write().insert(normalize(id), value.into());
        self
    }

    /// Current value of a parameter, or `None` when it was never set
    pub fn get_parameter(&self, id: &str) -> Option<Value> {
        self.parameters.read().get(&normalize(id)).cloned()
    }

    pub fn set_definition(&self, id: &str, definition: Definition) -> &Self {
        let id = normalize(id);
        debug!(
            "Registered definition: {} ({})",
            id,
            definition.type_id()
        );
        self.definitions.write().insert(id, Arc::new(definition));
        self
    }

    /// Register a component constructor on this container's catalog
    pub fn register_type<T, F>(&self, type_id: impl Into<String>, constructor: F) -> &Self
    where
        T: Component,
        F: Fn(Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.catalog.write().register(type_id, constructor);
        self
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// The definition registered under `id`, following one alias hop.
    ///
    /// Fails with [`DIError::NotDefined`] when there is no definition, even if
    /// an instance is stored under that id.
    pub fn get_definition(&self, id: &str) -> DIResult<Arc<Definition>> {
        let (id, _) = self.canonical_id(id);
        self.definition(&id).ok_or(DIError::NotDefined { id })
    }

    /// Resolve a service by id.
    ///
    /// Follows one alias hop, returns a stored instance when the id has no
    /// definition, rejects direct lookups of non-public definitions, and
    /// otherwise returns the cached instance or builds a new one.
    pub fn get(&self, id: &str) -> DIResult<Service> {
        let (id, is_alias) = self.canonical_id(id);

        let Some(definition) = self.definition(&id) else {
            return self.instance(&id).ok_or(DIError::NotDefined { id });
        };

        if !definition.is_public() && !is_alias {
            return Err(DIError::NotAccessible { id });
        }

        self.resolve_defined(&id, &definition, &mut Vec::new())
    }

    /// Resolve a service and downcast it to `T`
    pub fn get_as<T>(&self, id: &str) -> DIResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get(id)?
            .downcast::<T>()
            .map_err(|_| DIError::InvalidServiceType {
                id: normalize(id),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Whether `get(id)` has anything to return or build
    pub fn has(&self, id: &str) -> bool {
        let (id, _) = self.canonical_id(id);
        self.definitions.read().contains_key(&id) || self.instances.read().contains_key(&id)
    }

    pub fn has_definition(&self, id: &str) -> bool {
        let (id, _) = self.canonical_id(id);
        self.definitions.read().contains_key(&id)
    }

    pub fn has_parameter(&self, id: &str) -> bool {
        self.parameters.read().contains_key(&normalize(id))
    }

    /// Ids of all registered definitions, sorted
    pub fn definition_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.definitions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of stored instances, including the container itself
    pub fn service_count(&self) -> usize {
        self.instances.read().len()
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Normalize `id` and follow one alias hop; the flag reports the hop
    fn canonical_id(&self, id: &str) -> (String, bool) {
        let id = normalize(id);
        match self.aliases.read().get(&id) {
            Some(target) => (target.clone(), true),
            None => (id, false),
        }
    }

    fn definition(&self, id: &str) -> Option<Arc<Definition>> {
        self.definitions.read().get(id).cloned()
    }

    fn instance(&self, id: &str) -> Option<Service> {
        match self.instances.read().get(id)? {
            Slot::Service(service) => Some(service.clone()),
            Slot::Container => self.this.upgrade().map(|container| container as Service),
        }
    }

    /// Resolve an `@id` reference: like `get`, minus the public check
    fn resolve_reference(&self, id: &str, chain: &mut Vec<String>) -> DIResult<Service> {
        let (id, _) = self.canonical_id(id);

        match self.definition(&id) {
            Some(definition) => self.resolve_defined(&id, &definition, chain),
            None => self.instance(&id).ok_or(DIError::NotDefined { id }),
        }
    }

    /// Return the cached instance for `id` or build it, caching when shared
    fn resolve_defined(
        &self,
        id: &str,
        definition: &Definition,
        chain: &mut Vec<String>,
    ) -> DIResult<Service> {
        if let Some(service) = self.instance(id) {
            trace!("Service cache hit: {}", id);
            return Ok(service);
        }

        let service = self.build(id, definition, chain)?;

        if definition.is_shared() {
            let mut instances = self.instances.write();
            // Another thread may have finished the same service first
            if let Some(Slot::Service(existing)) = instances.get(id) {
                return Ok(existing.clone());
            }
            instances.insert(id.to_string(), Slot::Service(service.clone()));
            debug!("Cached shared service: {}", id);
        }

        Ok(service)
    }

    fn build(&self, id: &str, definition: &Definition, chain: &mut Vec<String>) -> DIResult<Service> {
        if self.options.detect_cycles && chain.iter().any(|entry| entry == id) {
            let mut cycle = chain.clone();
            cycle.push(id.to_string());
            return Err(DIError::CircularDependency { chain: cycle });
        }

        chain.push(id.to_string());
        let result = self.construct(definition, chain);
        chain.pop();
        result
    }

    fn construct(&self, definition: &Definition, chain: &mut Vec<String>) -> DIResult<Service> {
        let type_id = definition.type_id();
        debug!("Building service of type {}", type_id);

        let mut arguments = Vec::with_capacity(definition.arguments().len());
        for argument in definition.arguments() {
            arguments.push(self.substitute(argument, chain)?);
        }

        let constructor = self
            .catalog
            .read()
            .constructor(type_id)
            .ok_or_else(|| DIError::TypeNotRegistered {
                type_id: type_id.to_string(),
            })?;

        let mut component =
            constructor(Arguments::new(arguments)).map_err(|e| component_error(type_id, e))?;

        for (name, value) in definition.properties() {
            component
                .set_property(name, value)
                .map_err(|e| component_error(type_id, e))?;
        }

        for call in definition.calls() {
            component
                .call(&call.method, &call.arguments)
                .map_err(|e| component_error(type_id, e))?;
        }

        Ok(component.into_service())
    }

    /// Expand `@service` and `%parameter%` references in one argument
    fn substitute(&self, argument: &Value, chain: &mut Vec<String>) -> DIResult<Argument> {
        let Value::String(raw) = argument else {
            return Ok(Argument::Value(argument.clone()));
        };

        if let Some(reference) = raw.strip_prefix(SERVICE_MARKER) {
            trace!("Resolving service reference: {}", reference);
            return self.resolve_reference(reference, chain).map(Argument::Service);
        }

        if let Some(name) = parameter_name(raw) {
            trace!("Substituting parameter: {}", name);
            return Ok(Argument::Value(self.get_parameter(name).unwrap_or(Value::Null)));
        }

        Ok(Argument::Value(argument.clone()))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("options", &self.options)
            .field("definitions", &self.definition_ids())
            .field("aliases", &*self.aliases.read())
            .field("instances", &self.service_count())
            .finish()
    }
}
