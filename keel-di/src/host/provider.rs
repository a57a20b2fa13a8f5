//! Contracts the host resolves services through.

use std::sync::Arc;

use keel_core::{ContainerError, Instance, ServiceType};

use crate::error::DiError;
use crate::host::collection::ServiceCollection;

/// Resolver contract.
pub trait ServiceProvider: Send + Sync {
    /// `Ok(None)` when nothing can satisfy `service_type`.
    fn get_service(&self, service_type: &ServiceType) -> Result<Option<Instance>, DiError>;

    /// Fails with [`DiError::ServiceNotRegistered`] when nothing can satisfy `service_type`.
    fn get_required_service(&self, service_type: &ServiceType) -> Result<Instance, DiError> {
        self.get_service(service_type)?
            .ok_or_else(|| DiError::ServiceNotRegistered(service_type.to_string()))
    }
}

/// Something the host tears down explicitly. A second call is a no-op.
pub trait Disposable {
    fn dispose(&self) -> Result<(), DiError>;
}

/// Scope handle. Disposing it (or dropping it) disposes what was resolved inside it.
pub trait ServiceScope: Disposable + Send + Sync {
    fn service_provider(&self) -> &dyn ServiceProvider;
}

pub trait ServiceScopeFactory: Send + Sync {
    fn create_scope(&self) -> Result<Box<dyn ServiceScope>, DiError>;
}

/// Presence predicate: whether a service type can be resolved, answered without resolving it.
pub trait ServiceProviderIsService: Send + Sync {
    fn is_service(&self, service_type: &ServiceType) -> bool;
}

/// Lets the host hand its service collection to another container.
pub trait ServiceProviderFactory {
    type Builder;
    type Provider: ServiceProvider;

    fn create_builder(&self, services: ServiceCollection) -> Self::Builder;

    fn create_service_provider(&self, builder: Self::Builder) -> Result<Self::Provider, DiError>;
}

/// Typed helpers over any [`ServiceProvider`].
pub trait ServiceProviderExt: ServiceProvider {
    fn get<S: ?Sized + 'static>(&self) -> Result<Option<Arc<S>>, DiError> {
        self.get_as(&ServiceType::of::<S>())
    }

    fn get_required<S: ?Sized + 'static>(&self) -> Result<Arc<S>, DiError> {
        self.get_required_as(&ServiceType::of::<S>())
    }

    /// Resolves `service_type` (e.g. a generic instantiation) as `S`.
    fn get_as<S: ?Sized + 'static>(&self, service_type: &ServiceType) -> Result<Option<Arc<S>>, DiError> {
        match self.get_service(service_type)? {
            Some(instance) => downcast(service_type, &instance).map(Some),
            None => Ok(None),
        }
    }

    fn get_required_as<S: ?Sized + 'static>(&self, service_type: &ServiceType) -> Result<Arc<S>, DiError> {
        let instance = self.get_required_service(service_type)?;
        downcast(service_type, &instance)
    }

    /// Every registered `S`, oldest first. Empty when none is registered.
    fn get_all<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<S>>, DiError> {
        let service_type = ServiceType::sequence_of::<S>();
        self.get_required_service(&service_type)?
            .downcast_sequence::<S>()
            .ok_or_else(|| ContainerError::TypeMismatch(service_type.to_string()).into())
    }

    /// Opens a scope through the registered [`ServiceScopeFactory`].
    fn create_scope(&self) -> Result<Box<dyn ServiceScope>, DiError> {
        self.get_required::<dyn ServiceScopeFactory>()?.create_scope()
    }
}

impl<P: ServiceProvider + ?Sized> ServiceProviderExt for P {}

fn downcast<S: ?Sized + 'static>(service_type: &ServiceType, instance: &Instance) -> Result<Arc<S>, DiError> {
    instance
        .downcast::<S>()
        .ok_or_else(|| ContainerError::TypeMismatch(service_type.to_string()).into())
}
