//! Services the daemon exposes.

mod auth;

use switchboard::{RegistryError, ServiceRegistry};

pub use self::auth::{
    AuthError, AuthService, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
};

/// Source of the service registry the daemon dispatches against.
pub trait ServiceProvider: Send + Sync {
    /// Builds the registry. Called once during bootstrap.
    ///
    /// # Errors
    ///
    /// Returns the registration error when a service cannot be registered.
    fn registry(&self) -> Result<ServiceRegistry, RegistryError>;
}

/// Provider registering the built-in services.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultServices;

impl ServiceProvider for DefaultServices {
    fn registry(&self) -> Result<ServiceRegistry, RegistryError> {
        Ok(ServiceRegistry::builder().register(AuthService::new())?.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_services_expose_auth() {
        let registry = DefaultServices.registry().expect("default registry");
        assert_eq!(registry.service_names(), vec!["AuthService"]);
        let auth = registry.lookup("AuthService").expect("auth registered");
        assert_eq!(auth.method_names(), vec!["Login", "Register"]);
    }
}
