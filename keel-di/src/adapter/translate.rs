//! Descriptor translation: one native registration per host descriptor.

use std::borrow::Borrow;
use std::sync::Arc;

use keel_core::{Instance, IntoContainerError, Registry};
use tracing::trace;

use crate::adapter::lifetime::lifecycle_for;
use crate::adapter::provider::KeelServiceProvider;
use crate::host::{Implementation, ServiceCollection, ServiceDescriptor, ServiceProvider};

/// Queues exactly one registration for `descriptor`. Nothing is resolved until the container
/// is asked for the service.
pub fn register_descriptor(registry: &mut Registry, descriptor: &ServiceDescriptor) {
    trace!(service = %descriptor.service_type(), lifetime = %descriptor.lifetime(), "translating descriptor");
    let expression = registry
        .for_type(descriptor.service_type().clone())
        .lifecycle_is(lifecycle_for(descriptor.lifetime()));
    match descriptor.implementation() {
        Implementation::Type(plugged) => expression.use_plugged(plugged.clone()),
        Implementation::OpenGeneric(closings) => expression.use_open(closings.clone()),
        Implementation::Factory(factory) => {
            let factory = Arc::clone(factory);
            let service = descriptor.service_type().clone();
            expression.use_factory(move |context| {
                let provider: &dyn ServiceProvider = &KeelServiceProvider::new(context.clone());
                factory(provider).map_err(|error| error.into_factory_error(&service))
            });
        }
        Implementation::Instance(instance) => expression.use_instance(Instance::clone(instance)),
    }
}

/// Registers every descriptor, in order, with no populate marker and no duplicate check.
/// May be called any number of times on the same registry.
pub fn register_services<I>(registry: &mut Registry, descriptors: I)
where
    I: IntoIterator,
    I::Item: Borrow<ServiceDescriptor>,
{
    for descriptor in descriptors {
        register_descriptor(registry, descriptor.borrow());
    }
}

/// Builds descriptors on a fresh collection and registers them.
pub fn configure_services(registry: &mut Registry, configure: impl FnOnce(&mut ServiceCollection)) {
    let mut services = ServiceCollection::new();
    configure(&mut services);
    register_services(registry, services);
}
