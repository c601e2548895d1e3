//! Statically typed method tables.
//!
//! A [`Service`] declares its invocable methods by filling a [`MethodTable`].
//! Registration is only possible for functions with the dispatcher calling
//! convention, `Fn(&S, &CallContext, Input) -> Result<Output, Error>`, so a
//! non-conforming method never becomes visible to the resolver. Each entry is
//! erased into a [`MethodDescriptor`] whose thunk closes over the concrete
//! input and output types.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec;
use crate::context::CallContext;
use crate::error::{DispatchError, DomainError, RegistryError};
use crate::invoker;

/// Type-erased invocation thunk: decode, invoke, encode.
type Thunk = dyn Fn(&CallContext, &[u8]) -> Result<Option<Vec<u8>>, DispatchError> + Send + Sync;

/// A service that can be registered with the dispatcher.
///
/// Implementations must be `Send + Sync`: the dispatcher may run concurrent
/// requests against the same instance, so services that mutate state guard it
/// themselves.
///
/// # Example
///
/// ```
/// use switchboard::{CallContext, DomainError, MethodTable, Service};
///
/// struct Echo;
///
/// impl Echo {
///     fn shout(&self, _ctx: &CallContext, text: String) -> Result<String, DomainError> {
///         Ok(text.to_uppercase())
///     }
/// }
///
/// impl Service for Echo {
///     const NAME: &'static str = "Echo";
///
///     fn methods(table: &mut MethodTable<Self>) {
///         table.method("Shout", Self::shout);
///     }
/// }
/// ```
pub trait Service: Send + Sync + Sized + 'static {
    /// Name callers use to address the service.
    const NAME: &'static str;

    /// Declares the invocable methods.
    fn methods(table: &mut MethodTable<Self>);
}

/// Metadata and thunk for one invocable method.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    input_type: &'static str,
    output_type: &'static str,
    thunk: Arc<Thunk>,
}

impl MethodDescriptor {
    /// Name callers use to address the method.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type the payload is decoded into.
    #[must_use]
    pub const fn input_type(&self) -> &'static str {
        self.input_type
    }

    /// Rust type the method returns on success.
    #[must_use]
    pub const fn output_type(&self) -> &'static str {
        self.output_type
    }

    /// Decodes `payload`, invokes the method once and encodes its output.
    ///
    /// Returns `Ok(None)` when the output encodes to `null`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Decode`], [`DispatchError::Domain`],
    /// [`DispatchError::Fault`] or [`DispatchError::Encode`] depending on the
    /// stage that failed. Later stages never run after a failure.
    pub fn call(
        &self,
        context: &CallContext,
        payload: &[u8],
    ) -> Result<Option<Vec<u8>>, DispatchError> {
        (self.thunk)(context, payload)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("input_type", &self.input_type)
            .field("output_type", &self.output_type)
            .finish_non_exhaustive()
    }
}

/// Builder collecting the methods a service exposes.
pub struct MethodTable<S> {
    service: Arc<S>,
    methods: BTreeMap<String, MethodDescriptor>,
    errors: Vec<RegistryError>,
}

impl<S: Service> MethodTable<S> {
    pub(crate) fn new(service: Arc<S>) -> Self {
        Self {
            service,
            methods: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Registers `handler` under `name`.
    ///
    /// Registration problems (a duplicate or unaddressable name) are recorded
    /// and reported when the registry is built, keeping declarations chainable.
    pub fn method<I, O, E, F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        I: DeserializeOwned + 'static,
        O: Serialize + 'static,
        E: Into<DomainError> + 'static,
        F: Fn(&S, &CallContext, I) -> Result<O, E> + Send + Sync + 'static,
    {
        if let Err(error) = validate_name(name) {
            self.errors.push(error);
            return self;
        }
        if self.methods.contains_key(name) {
            self.errors.push(RegistryError::DuplicateMethod {
                service: S::NAME.to_owned(),
                method: name.to_owned(),
            });
            return self;
        }

        let service = Arc::clone(&self.service);
        let method_name = name.to_owned();
        let thunk = move |context: &CallContext,
                          payload: &[u8]|
              -> Result<Option<Vec<u8>>, DispatchError> {
            invoker::invoke(&method_name, || {
                let input: I = codec::decode(payload)?;
                let output = handler(service.as_ref(), context, input)
                    .map_err(|error| DispatchError::Domain(error.into()))?;
                codec::encode(&output)
            })
        };

        self.methods.insert(
            name.to_owned(),
            MethodDescriptor {
                name: name.to_owned(),
                input_type: std::any::type_name::<I>(),
                output_type: std::any::type_name::<O>(),
                thunk: Arc::new(thunk),
            },
        );
        self
    }

    pub(crate) fn finish(self) -> Result<BTreeMap<String, MethodDescriptor>, RegistryError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.methods),
        }
    }
}

/// Rejects names that cannot appear as a route segment.
pub(crate) fn validate_name(name: &str) -> Result<(), RegistryError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains('/') {
        "name contains '/'"
    } else if name.chars().any(char::is_whitespace) {
        "name contains whitespace"
    } else {
        return Ok(());
    };
    Err(RegistryError::InvalidName {
        name: name.to_owned(),
        reason,
    })
}
