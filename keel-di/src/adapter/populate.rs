//! Bulk population from host descriptors, optionally guarded against running twice on one
//! container.

use std::borrow::Borrow;
use std::sync::Arc;

use keel_core::{
    Container, ContainerError, Instance, IntoContainerError, Lifecycle, RegistrationModel,
    Registry, ServiceType,
};
use tracing::debug;

use crate::adapter::is_service::KeelServiceProviderIsService;
use crate::adapter::provider::{KeelServiceProvider, KeelServiceScopeFactory};
use crate::adapter::selector::HostConstructorSelector;
use crate::adapter::translate::{configure_services, register_services};
use crate::error::DiError;
use crate::host::{
    ServiceCollection, ServiceDescriptor, ServiceProvider, ServiceProviderIsService,
    ServiceScopeFactory,
};
use crate::options::PopulateOptions;

/// Declared (never implemented) by every populate call. Its family existing is the whole
/// record that a container was populated.
enum PopulateMarker {}

/// Queues, in order: the duplicate check (when asked for), the marker family, the host
/// constructor policy and adapters, then one registration per descriptor.
///
/// The check runs when the registry is applied, against everything applied before it. A
/// registry that populates twice, or a container configured with a second populate, fails
/// with [`DiError::DuplicatePopulation`].
pub fn populate<I>(registry: &mut Registry, descriptors: I, check_duplicate_calls: bool)
where
    I: IntoIterator,
    I::Item: Borrow<ServiceDescriptor>,
{
    if check_duplicate_calls {
        registry.configure(reject_repeated_population);
    }
    registry.for_service::<PopulateMarker>();
    register_host_services(registry);
    register_services(registry, descriptors);
    debug!(check_duplicate_calls, "populate queued");
}

pub fn populate_with<I>(registry: &mut Registry, descriptors: I, options: &PopulateOptions)
where
    I: IntoIterator,
    I::Item: Borrow<ServiceDescriptor>,
{
    populate(registry, descriptors, options.check_duplicate_calls);
}

fn reject_repeated_population(model: &RegistrationModel) -> Result<(), ContainerError> {
    if model.has_family(&ServiceType::of::<PopulateMarker>()) {
        return Err(DiError::DuplicatePopulation.into_configuration_error());
    }
    Ok(())
}

/// The resolver is one per context, so factories and constructors asking for it get the
/// scope they are resolved in.
fn register_host_services(registry: &mut Registry) {
    registry.constructor_selector(HostConstructorSelector);
    registry
        .for_service::<dyn ServiceProvider>()
        .lifecycle_is(Lifecycle::PerNestedScope)
        .use_factory(|context| {
            let provider: Arc<dyn ServiceProvider> =
                Arc::new(KeelServiceProvider::new(context.clone()));
            Ok(Instance::new(provider))
        });
    registry
        .for_service::<dyn ServiceScopeFactory>()
        .lifecycle_is(Lifecycle::PerContainer)
        .use_factory(|context| {
            let factory: Arc<dyn ServiceScopeFactory> =
                Arc::new(KeelServiceScopeFactory::new(context));
            Ok(Instance::new(factory))
        });
    registry
        .for_service::<dyn ServiceProviderIsService>()
        .lifecycle_is(Lifecycle::PerContainer)
        .use_factory(|context| {
            let oracle: Arc<dyn ServiceProviderIsService> =
                Arc::new(KeelServiceProviderIsService::new(context));
            Ok(Instance::new(oracle))
        });
}

/// Host registration on a [`Registry`].
pub trait RegistryExt {
    fn populate<I>(&mut self, descriptors: I, check_duplicate_calls: bool)
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>;

    fn populate_with<I>(&mut self, descriptors: I, options: &PopulateOptions)
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>;

    fn register_services<I>(&mut self, descriptors: I)
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>;

    fn configure_services(&mut self, configure: impl FnOnce(&mut ServiceCollection));
}

impl RegistryExt for Registry {
    fn populate<I>(&mut self, descriptors: I, check_duplicate_calls: bool)
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>,
    {
        populate(self, descriptors, check_duplicate_calls);
    }

    fn populate_with<I>(&mut self, descriptors: I, options: &PopulateOptions)
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>,
    {
        populate_with(self, descriptors, options);
    }

    fn register_services<I>(&mut self, descriptors: I)
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>,
    {
        register_services(self, descriptors);
    }

    fn configure_services(&mut self, configure: impl FnOnce(&mut ServiceCollection)) {
        configure_services(self, configure);
    }
}

/// Host registration on a built [`Container`]. Each call is one atomic configuration, so a
/// duplicate check fires at the call that repeats the population.
pub trait ContainerExt {
    fn populate<I>(&mut self, descriptors: I, check_duplicate_calls: bool) -> Result<(), DiError>
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>;

    fn populate_with<I>(&mut self, descriptors: I, options: &PopulateOptions) -> Result<(), DiError>
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>;

    fn register_services<I>(&mut self, descriptors: I) -> Result<(), DiError>
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>;

    /// The registered resolver of the root container, or a plain one when the container was
    /// never populated.
    fn service_provider(&self) -> Result<Arc<dyn ServiceProvider>, DiError>;
}

impl ContainerExt for Container {
    fn populate<I>(&mut self, descriptors: I, check_duplicate_calls: bool) -> Result<(), DiError>
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>,
    {
        self.configure(|registry| populate(registry, descriptors, check_duplicate_calls))?;
        Ok(())
    }

    fn populate_with<I>(&mut self, descriptors: I, options: &PopulateOptions) -> Result<(), DiError>
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>,
    {
        ContainerExt::populate(self, descriptors, options.check_duplicate_calls)
    }

    fn register_services<I>(&mut self, descriptors: I) -> Result<(), DiError>
    where
        I: IntoIterator,
        I::Item: Borrow<ServiceDescriptor>,
    {
        self.configure(|registry| register_services(registry, descriptors))?;
        Ok(())
    }

    fn service_provider(&self) -> Result<Arc<dyn ServiceProvider>, DiError> {
        match self.try_resolve_as::<dyn ServiceProvider>()? {
            Some(provider) => Ok(provider),
            None => Ok(Arc::new(KeelServiceProvider::new(self.context().clone()))),
        }
    }
}
