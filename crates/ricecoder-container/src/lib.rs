//! Service Container for RiceCoder
//!
//! This crate provides a runtime service registry. Services are described
//! declaratively with [`Definition`]s (component type, constructor arguments,
//! properties, method calls, public/shared flags) and built lazily by the
//! [`Container`] on first lookup, with dependencies wired transitively.
//!
//! ## Quick Start
//!
//! ```rust
//! use ricecoder_container::{Component, ComponentCatalog, Container, Definition};
//! use std::sync::Arc;
//!
//! struct Logger {
//!     channel: String,
//! }
//!
//! impl Component for Logger {}
//!
//! struct Cache {
//!     logger: Arc<Logger>,
//! }
//!
//! impl Component for Cache {}
//!
//! let catalog = ComponentCatalog::new()
//!     .with("app::Logger", |args| Ok(Logger { channel: args.string(0)? }))
//!     .with("app::Cache", |args| Ok(Cache { logger: args.service(0)? }));
//!
//! let container = Container::with_catalog(catalog);
//! container.set_parameter("channel", "app");
//! container.set_definition("logger", Definition::new("app::Logger").with_argument("%channel%"));
//! container.set_definition("cache", Definition::new("app::Cache").with_argument("@logger"));
//!
//! let cache = container.get_as::<Cache>("cache").unwrap();
//! let logger = container.get_as::<Logger>("logger").unwrap();
//! assert!(Arc::ptr_eq(&cache.logger, &logger));
//! assert_eq!(logger.channel, "app");
//! ```
//!
//! ## Argument references
//!
//! - `"@id"` resolves the service `id` (aliases and private services allowed)
//! - `"%name%"` substitutes the parameter `name`, or `null` when unset
//!
//! ## Setup
//!
//! Registration is usually split across [`ServiceProvider`]s and assembled
//! with a [`ContainerBuilder`]. Component types can be submitted from any
//! linked crate with [`register_component!`].

pub mod argument;
pub mod component;
pub mod container;
pub mod definition;
pub mod provider;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub use argument::{Argument, Arguments};
pub use component::{
    discovered_type_count, Component, ComponentCatalog, ComponentType, Constructor, IntoService,
};
pub use container::{Container, Service, SERVICE_CONTAINER_ID};
pub use definition::{Definition, MethodCall};
pub use provider::{ServiceProvider, ServiceProviderRegistry};

#[doc(hidden)]
pub use inventory;

/// Errors that can occur during service registration and resolution
#[derive(Debug, thiserror::Error)]
pub enum DIError {
    #[error("Service is not defined: {id}")]
    NotDefined { id: String },

    #[error("Service cannot be accessed directly: {id}")]
    NotAccessible { id: String },

    #[error("Component type not registered: {type_id}")]
    TypeNotRegistered { type_id: String },

    #[error("Service '{id}' is not a {expected}")]
    InvalidServiceType { id: String, expected: &'static str },

    #[error("Missing constructor argument {index} (got {len})")]
    MissingArgument { index: usize, len: usize },

    #[error("Invalid constructor argument {index}: expected {expected}")]
    InvalidArgument { index: usize, expected: &'static str },

    #[error("Unknown property '{name}' on {component}")]
    UnknownProperty { component: String, name: String },

    #[error("Unknown method '{method}' on {component}")]
    UnknownMethod { component: String, method: String },

    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    #[error("Component '{type_id}' failed: {source}")]
    Component {
        type_id: String,
        source: anyhow::Error,
    },
}

pub type DIResult<T> = Result<T, DIError>;

/// Container configuration
///
/// Deserializable so it can live inside an application's own config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Id under which the container registers itself
    pub self_id: String,
    /// Fail with [`DIError::CircularDependency`] instead of recursing forever
    pub detect_cycles: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            self_id: SERVICE_CONTAINER_ID.to_string(),
            detect_cycles: true,
        }
    }
}

/// Builder pattern for configuring the container
#[derive(Default)]
pub struct ContainerBuilder {
    options: ContainerOptions,
    catalog: Option<ComponentCatalog>,
    providers: ServiceProviderRegistry,
    parameters: Vec<(String, Value)>,
    definitions: Vec<(String, Definition)>,
    aliases: Vec<(String, String)>,
    services: Vec<(String, Service)>,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    /// Use `catalog` instead of the inventory-discovered component types
    pub fn catalog(mut self, catalog: ComponentCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn provider<P: ServiceProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.add(provider);
        self
    }

    pub fn parameter(mut self, id: &str, value: impl Into<Value>) -> Self {
        self.parameters.push((id.to_string(), value.into()));
        self
    }

    pub fn definition(mut self, id: &str, definition: Definition) -> Self {
        self.definitions.push((id.to_string(), definition));
        self
    }

    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.aliases.push((alias.to_string(), target.to_string()));
        self
    }

    pub fn service<T: Send + Sync + 'static>(mut self, id: &str, service: Arc<T>) -> Self {
        let service: Service = service;
        self.services.push((id.to_string(), service));
        self
    }

    /// Build the container.
    ///
    /// Direct registrations are applied first, then providers run in priority
    /// order and may override them.
    pub fn build(self) -> DIResult<Arc<Container>> {
        let catalog = self.catalog.unwrap_or_else(ComponentCatalog::discovered);
        let container = Container::with_options(catalog, self.options);

        for (id, value) in self.parameters {
            container.set_parameter(&id, value);
        }
        for (id, definition) in self.definitions {
            container.set_definition(&id, definition);
        }
        for (alias, target) in self.aliases {
            container.set_alias(&alias, &target);
        }
        for (id, service) in self.services {
            container.set_service(&id, service);
        }

        self.providers.register_all(&container)?;

        debug!(
            "Built container with {} definitions",
            container.definition_ids().len()
        );
        Ok(container)
    }
}

/// Submit a component type for discovery by [`ComponentCatalog::discovered`]
#[macro_export]
macro_rules! register_component {
    ($type_id:expr, $constructor:expr) => {
        $crate::inventory::submit! {
            $crate::ComponentType::new($type_id, $constructor)
        }
    };
}

/// Convenience macro for resolving a typed service
#[macro_export]
macro_rules! resolve_service {
    ($container:expr, $service_type:ty, $id:expr) => {
        $container.get_as::<$service_type>($id)
    };
}
