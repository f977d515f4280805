//! Service Provider trait for container setup
//!
//! A `ServiceProvider` groups the definitions, aliases and parameters of one
//! area of an application and registers them on a container.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ricecoder_container::{Container, DIResult, Definition, ServiceProvider};
//!
//! pub struct StorageServiceProvider;
//!
//! impl ServiceProvider for StorageServiceProvider {
//!     fn name(&self) -> &'static str {
//!         "storage"
//!     }
//!
//!     fn register(&self, container: &Container) -> DIResult<()> {
//!         container.set_parameter("storage_path", "./data");
//!         container.set_definition(
//!             "file_storage",
//!             Definition::new("storage::FileStorage").with_argument("%storage_path%"),
//!         );
//!         container.set_alias("storage", "file_storage");
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::container::Container;
use crate::DIResult;

/// Trait for types that register services on a container.
pub trait ServiceProvider: Send + Sync {
    /// Returns the name of this service provider.
    ///
    /// Used for logging and debugging.
    fn name(&self) -> &'static str;

    /// Returns the priority of this service provider.
    ///
    /// Lower values are registered first. Default is 100.
    fn priority(&self) -> u32 {
        100
    }

    /// Register definitions, aliases and parameters with the container.
    fn register(&self, container: &Container) -> DIResult<()>;

    /// Optional: check that everything this provider relies on is present.
    ///
    /// Called after all providers have registered.
    #[allow(unused_variables)]
    fn validate(&self, container: &Container) -> DIResult<()> {
        Ok(())
    }
}

/// Registry for managing service providers.
///
/// Runs providers in priority order.
pub struct ServiceProviderRegistry {
    providers: Vec<Arc<dyn ServiceProvider>>,
}

impl ServiceProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a service provider to the registry.
    pub fn add<P: ServiceProvider + 'static>(&mut self, provider: P) -> &mut Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add a shared service provider to the registry.
    pub fn add_shared(&mut self, provider: Arc<dyn ServiceProvider>) -> &mut Self {
        self.providers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in registration order (sorted by priority).
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.sorted().into_iter().map(|p| p.name()).collect()
    }

    // Stable sort keeps insertion order for equal priorities
    fn sorted(&self) -> Vec<&Arc<dyn ServiceProvider>> {
        let mut sorted: Vec<_> = self.providers.iter().collect();
        sorted.sort_by_key(|p| p.priority());
        sorted
    }

    /// Register all providers with the container, then validate each one.
    pub fn register_all(&self, container: &Container) -> DIResult<()> {
        let sorted = self.sorted();

        info!("Registering {} service providers", sorted.len());

        for provider in &sorted {
            debug!(
                "Registering provider '{}' (priority: {})",
                provider.name(),
                provider.priority()
            );
            provider.register(container)?;
        }

        for provider in &sorted {
            provider.validate(container)?;
        }

        info!("All service providers registered successfully");
        Ok(())
    }
}

impl Default for ServiceProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
