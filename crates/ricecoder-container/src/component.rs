//! Component types and the catalog used to build them
//!
//! Definitions refer to the type they build by a string identifier. The
//! [`ComponentCatalog`] maps those identifiers to constructors, and the
//! [`Component`] trait is the per-type adapter the container uses to assign
//! properties and invoke methods on a freshly built instance.
//!
//! Types can be added to a catalog at runtime, or submitted from any linked
//! crate with [`register_component!`](crate::register_component) and picked
//! up by [`ComponentCatalog::discovered`]:
//!
//! ```rust,ignore
//! use ricecoder_container::{register_component, Component};
//!
//! struct Logger {
//!     channel: String,
//! }
//!
//! impl Component for Logger {}
//!
//! register_component!("app::Logger", |args| {
//!     Ok(Box::new(Logger { channel: args.string(0)? }))
//! });
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::argument::Arguments;
use crate::container::Service;
use crate::{DIError, DIResult};

/// Turns a boxed component into a shareable service.
///
/// Implemented for every sized `Send + Sync` type; it only exists so that
/// `Box<dyn Component>` can be frozen into an `Arc` of its concrete type.
pub trait IntoService {
    fn into_service(self: Box<Self>) -> Service;
}

impl<T: Any + Send + Sync> IntoService for T {
    fn into_service(self: Box<Self>) -> Service {
        Arc::<T>::from(self)
    }
}

/// Adapter through which the container mutates a newly built instance.
///
/// Both methods default to rejecting every name, so a type with no settable
/// properties or callable methods only needs an empty `impl`.
pub trait Component: IntoService + Send + Sync + 'static {
    /// Assign a property from a definition's `properties` map
    #[allow(unused_variables)]
    fn set_property(&mut self, name: &str, value: &Value) -> anyhow::Result<()> {
        Err(DIError::UnknownProperty {
            component: std::any::type_name::<Self>().to_string(),
            name: name.to_string(),
        }
        .into())
    }

    /// Invoke a method from a definition's `calls` list
    #[allow(unused_variables)]
    fn call(&mut self, method: &str, arguments: &[Value]) -> anyhow::Result<()> {
        Err(DIError::UnknownMethod {
            component: std::any::type_name::<Self>().to_string(),
            method: method.to_string(),
        }
        .into())
    }
}

/// Type-erased component constructor
pub type Constructor =
    Arc<dyn Fn(Arguments) -> anyhow::Result<Box<dyn Component>> + Send + Sync>;

/// Map a failure raised by component code into a container error.
///
/// Container errors raised inside a constructor (for example a bad argument
/// accessed with `?`) come back out as themselves; anything else is carried
/// unchanged inside [`DIError::Component`].
pub(crate) fn component_error(type_id: &str, error: anyhow::Error) -> DIError {
    match error.downcast::<DIError>() {
        Ok(error) => error,
        Err(source) => DIError::Component {
            type_id: type_id.to_string(),
            source,
        },
    }
}

/// Table of constructors keyed by component type identifier.
///
/// Type identifiers are matched exactly; unlike service ids they are not
/// case-folded.
#[derive(Clone, Default)]
pub struct ComponentCatalog {
    constructors: HashMap<String, Constructor>,
}

impl ComponentCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding every [`ComponentType`] submitted via inventory
    pub fn discovered() -> Self {
        let mut types: Vec<&ComponentType> = inventory::iter::<ComponentType>().collect();
        types.sort_by_key(|t| t.type_id);

        let mut catalog = Self::new();
        for component_type in types {
            if catalog.contains(component_type.type_id) {
                warn!(
                    "Component type '{}' submitted more than once, keeping the last",
                    component_type.type_id
                );
            }
            let constructor = component_type.constructor;
            catalog.insert(component_type.type_id, Arc::new(constructor));
        }

        info!(
            "Discovered {} component types via inventory",
            catalog.len()
        );
        catalog
    }

    /// Register a constructor for `type_id`, replacing any earlier one
    pub fn register<T, F>(&mut self, type_id: impl Into<String>, constructor: F) -> &mut Self
    where
        T: Component,
        F: Fn(Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let wrapped: Constructor = Arc::new(move |arguments: Arguments| {
            let component = constructor(arguments)?;
            Ok(Box::new(component) as Box<dyn Component>)
        });
        self.insert(type_id, wrapped)
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with<T, F>(mut self, type_id: impl Into<String>, constructor: F) -> Self
    where
        T: Component,
        F: Fn(Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.register(type_id, constructor);
        self
    }

    /// Register an already type-erased constructor
    pub fn insert(&mut self, type_id: impl Into<String>, constructor: Constructor) -> &mut Self {
        let type_id = type_id.into();
        debug!("Registered component type: {}", type_id);
        self.constructors.insert(type_id, constructor);
        self
    }

    /// Merge another catalog into this one; entries from `other` win
    pub fn extend(&mut self, other: ComponentCatalog) {
        self.constructors.extend(other.constructors);
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.constructors.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// All registered type identifiers, sorted
    pub fn type_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.constructors.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn constructor(&self, type_id: &str) -> Option<Constructor> {
        self.constructors.get(type_id).cloned()
    }

    /// Build a bare component, before any properties or calls are applied
    pub fn instantiate(&self, type_id: &str, arguments: Arguments) -> DIResult<Box<dyn Component>> {
        let constructor = self
            .constructor(type_id)
            .ok_or_else(|| DIError::TypeNotRegistered {
                type_id: type_id.to_string(),
            })?;

        constructor(arguments).map_err(|e| component_error(type_id, e))
    }
}

impl fmt::Debug for ComponentCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCatalog")
            .field("type_ids", &self.type_ids())
            .finish()
    }
}

/// A component type submitted at compile time.
///
/// Collected with `inventory`; see [`register_component!`](crate::register_component).
pub struct ComponentType {
    /// Identifier definitions use to refer to this type
    pub type_id: &'static str,

    /// Constructor called with the resolved arguments
    pub constructor: fn(Arguments) -> anyhow::Result<Box<dyn Component>>,
}

impl ComponentType {
    pub const fn new(
        type_id: &'static str,
        constructor: fn(Arguments) -> anyhow::Result<Box<dyn Component>>,
    ) -> Self {
        Self {
            type_id,
            constructor,
        }
    }
}

inventory::collect!(ComponentType);

/// Number of component types submitted via inventory across linked crates
pub fn discovered_type_count() -> usize {
    inventory::iter::<ComponentType>().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Argument;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Counter {
        start: i64,
        step: i64,
    }

    impl Component for Counter {
        fn set_property(&mut self, name: &str, value: &Value) -> anyhow::Result<()> {
            match name {
                "step" => {
                    self.step = value.as_i64().unwrap_or(1);
                    Ok(())
                }
                _ => anyhow::bail!("no such field: {}", name),
            }
        }
    }

    struct Plain;

    impl Component for Plain {}

    inventory::submit! {
        ComponentType::new("test::Plain", |_args| Ok(Box::new(Plain)))
    }

    #[test]
    fn test_register_and_instantiate() {
        let catalog = ComponentCatalog::new().with("test::Counter", |args| {
            Ok(Counter {
                start: args.i64(0)?,
                step: 1,
            })
        });

        assert!(catalog.contains("test::Counter"));
        assert!(!catalog.contains("test::counter"));

        let component = catalog
            .instantiate(
                "test::Counter",
                Arguments::new(vec![Argument::Value(json!(5))]),
            )
            .unwrap();
        let counter = component.into_service().downcast::<Counter>().unwrap();
        assert_eq!(counter.start, 5);
        assert_eq!(counter.step, 1);
    }

    #[test]
    fn test_unknown_type() {
        let catalog = ComponentCatalog::new();
        let result = catalog.instantiate("test::Missing", Arguments::default());
        assert!(matches!(result, Err(DIError::TypeNotRegistered { .. })));
    }

    #[test]
    fn test_argument_errors_surface_unwrapped() {
        let catalog = ComponentCatalog::new().with("test::Counter", |args| {
            Ok(Counter {
                start: args.i64(0)?,
                step: 1,
            })
        });

        let result = catalog.instantiate("test::Counter", Arguments::default());
        assert!(matches!(result, Err(DIError::MissingArgument { index: 0, len: 0 })));
    }

    #[test]
    fn test_component_errors_are_wrapped() {
        let catalog = ComponentCatalog::new().with("test::Broken", |_args| {
            Err::<Plain, _>(anyhow::anyhow!("disk on fire"))
        });

        match catalog.instantiate("test::Broken", Arguments::default()) {
            Err(DIError::Component { type_id, source }) => {
                assert_eq!(type_id, "test::Broken");
                assert_eq!(source.to_string(), "disk on fire");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_default_adapter_rejects_members() {
        let mut plain = Plain;
        let error = plain.set_property("x", &json!(1)).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<DIError>(),
            Some(DIError::UnknownProperty { .. })
        ));

        let error = plain.call("run", &[]).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<DIError>(),
            Some(DIError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_discovered_includes_submitted_types() {
        let catalog = ComponentCatalog::discovered();
        assert!(catalog.contains("test::Plain"));
        assert!(discovered_type_count() >= 1);
    }

    #[test]
    fn test_extend_merges_catalogs() {
        let mut catalog = ComponentCatalog::new().with("test::Plain", |_args| Ok(Plain));
        let other = ComponentCatalog::new().with("test::Counter", |_args| Ok(Counter::default()));

        catalog.extend(other);

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("test::Plain"));
        assert!(catalog.contains("test::Counter"));
    }
}
