//! Service registry and method resolution.
//!
//! The [`ServiceRegistry`] maps service names to [`ServiceHandle`]s. It is
//! assembled once through [`RegistryBuilder`] and is immutable afterwards, so
//! any number of concurrent requests may read it without locking. Names match
//! by exact string equality; there is no case folding and no aliasing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{DispatchError, RegistryError};
use crate::method::{MethodDescriptor, MethodTable, Service, validate_name};

/// A registered service and the methods it exposes.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    name: String,
    methods: BTreeMap<String, MethodDescriptor>,
}

impl ServiceHandle {
    /// Name the service is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a method by exact name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    /// Resolves a method by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MethodNotFound`] when the service exposes no
    /// invocable method with that name.
    pub fn resolve(&self, name: &str) -> Result<&MethodDescriptor, DispatchError> {
        self.method(name)
            .ok_or_else(|| DispatchError::method_not_found(&self.name, name))
    }

    /// Names of the exposed methods, sorted.
    #[must_use]
    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }
}

/// Immutable mapping from service name to service handle.
///
/// # Example
///
/// ```
/// use switchboard::{CallContext, DomainError, MethodTable, Service, ServiceRegistry};
///
/// struct Clock;
///
/// impl Service for Clock {
///     const NAME: &'static str = "Clock";
///
///     fn methods(table: &mut MethodTable<Self>) {
///         table.method("Now", |_: &Self, _: &CallContext, _: ()| Ok::<_, DomainError>(0_u64));
///     }
/// }
///
/// let registry = ServiceRegistry::builder()
///     .register(Clock)
///     .expect("register clock")
///     .build();
/// assert!(registry.get("Clock").is_some());
/// assert!(registry.get("clock").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, ServiceHandle>,
}

impl ServiceRegistry {
    /// Starts assembling a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Looks up a service by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ServiceHandle> {
        self.services.get(name)
    }

    /// Looks up a service by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ServiceNotFound`] when no service is registered
    /// under `name`.
    pub fn lookup(&self, name: &str) -> Result<&ServiceHandle, DispatchError> {
        self.get(name)
            .ok_or_else(|| DispatchError::service_not_found(name))
    }

    /// Names of the registered services, sorted.
    #[must_use]
    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` when no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Builder for [`ServiceRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    services: HashMap<String, ServiceHandle>,
}

impl RegistryBuilder {
    /// Registers a service and the methods it declares.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateService`] when a service with the
    /// same name is already registered, or the first error recorded while the
    /// service declared its methods.
    pub fn register<S: Service>(mut self, service: S) -> Result<Self, RegistryError> {
        validate_name(S::NAME)?;
        if self.services.contains_key(S::NAME) {
            return Err(RegistryError::DuplicateService {
                service: S::NAME.to_owned(),
            });
        }

        let mut table = MethodTable::new(Arc::new(service));
        S::methods(&mut table);
        let methods = table.finish()?;

        self.services.insert(
            S::NAME.to_owned(),
            ServiceHandle {
                name: S::NAME.to_owned(),
                methods,
            },
        );
        Ok(self)
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            services: self.services,
        }
    }
}
