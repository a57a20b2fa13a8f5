//! Service descriptors: what the host asks to be registered.

use std::fmt;
use std::sync::Arc;

use keel_core::{Closings, GenericDefinition, Injectable, Instance, PluggedType, Provides, ServiceType};

use crate::error::DiError;
use crate::host::lifetime::ServiceLifetime;
use crate::host::provider::ServiceProvider;

/// Host factory. Receives the resolver of the scope the service is resolved in.
pub type ServiceFactory =
    Arc<dyn Fn(&dyn ServiceProvider) -> Result<Instance, DiError> + Send + Sync>;

/// How a descriptor's service is produced. Exactly one mode per descriptor.
#[derive(Clone)]
pub enum Implementation {
    /// Concrete type built by the container through its constructor-selection policy.
    Type(PluggedType),
    /// Open generic implementation, closed per requested instantiation.
    OpenGeneric(Closings),
    Factory(ServiceFactory),
    /// Fixed instance, handed out as is.
    Instance(Instance),
}

/// Immutable registration request: service type, implementation mode and lifetime.
#[derive(Clone)]
pub struct ServiceDescriptor {
    service_type: ServiceType,
    implementation: Implementation,
    lifetime: ServiceLifetime,
}

impl ServiceDescriptor {
    pub fn new(
        service_type: ServiceType,
        implementation: Implementation,
        lifetime: ServiceLifetime,
    ) -> Self {
        Self {
            service_type,
            implementation,
            lifetime,
        }
    }

    /// Implementation `I` served as `S`.
    pub fn describe<S, I>(lifetime: ServiceLifetime) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        Self::new(
            ServiceType::of::<S>(),
            Implementation::Type(PluggedType::of::<S, I>()),
            lifetime,
        )
    }

    pub fn transient<S, I>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        Self::describe::<S, I>(ServiceLifetime::Transient)
    }

    pub fn scoped<S, I>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        Self::describe::<S, I>(ServiceLifetime::Scoped)
    }

    pub fn singleton<S, I>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        Self::describe::<S, I>(ServiceLifetime::Singleton)
    }

    /// Open generic `definition` implemented by `closings`.
    pub fn open(definition: GenericDefinition, closings: Closings, lifetime: ServiceLifetime) -> Self {
        Self::new(
            ServiceType::definition(definition),
            Implementation::OpenGeneric(closings),
            lifetime,
        )
    }

    /// Factory producing the instance together with its disposal hook, if any.
    pub fn factory(
        service_type: ServiceType,
        lifetime: ServiceLifetime,
        factory: impl Fn(&dyn ServiceProvider) -> Result<Instance, DiError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(service_type, Implementation::Factory(Arc::new(factory)), lifetime)
    }

    /// Factory producing an `S` that needs no disposal.
    pub fn factory_of<S: ?Sized + Send + Sync + 'static>(
        lifetime: ServiceLifetime,
        factory: impl Fn(&dyn ServiceProvider) -> Result<Arc<S>, DiError> + Send + Sync + 'static,
    ) -> Self {
        Self::factory(ServiceType::of::<S>(), lifetime, move |provider| {
            factory(provider).map(Instance::new)
        })
    }

    /// Fixed singleton instance. Never disposed by the container.
    pub fn instance<S: ?Sized + Send + Sync + 'static>(instance: Arc<S>) -> Self {
        Self::new(
            ServiceType::of::<S>(),
            Implementation::Instance(Instance::new(instance)),
            ServiceLifetime::Singleton,
        )
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let implementation = match &self.implementation {
            Implementation::Type(plugged) => plugged.name(),
            Implementation::OpenGeneric(closings) => closings.name(),
            Implementation::Factory(_) => "<factory>",
            Implementation::Instance(_) => "<instance>",
        };
        f.debug_struct("ServiceDescriptor")
            .field("service_type", &self.service_type)
            .field("implementation", &implementation)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}
