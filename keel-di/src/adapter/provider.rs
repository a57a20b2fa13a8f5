//! Resolver, scope factory and disposable-container adapters over keel-core contexts.

use std::sync::Arc;

use keel_core::{Container, Context, Instance, NestedContainer, Registry, ServiceType};
use tracing::debug;

use crate::adapter::populate::populate_with;
use crate::error::DiError;
use crate::host::{
    Disposable, ServiceCollection, ServiceProvider, ServiceProviderFactory, ServiceScope,
    ServiceScopeFactory,
};
use crate::options::PopulateOptions;

/// Resolver bound to one context: the root container's or a nested container's.
#[derive(Clone, Debug)]
pub struct KeelServiceProvider {
    context: Context,
}

impl KeelServiceProvider {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl ServiceProvider for KeelServiceProvider {
    fn get_service(&self, service_type: &ServiceType) -> Result<Option<Instance>, DiError> {
        Ok(self.context.try_resolve(service_type)?)
    }

    fn get_required_service(&self, service_type: &ServiceType) -> Result<Instance, DiError> {
        Ok(self.context.resolve(service_type)?)
    }
}

/// Opens nested containers below the root.
#[derive(Clone, Debug)]
pub struct KeelServiceScopeFactory {
    root: Context,
}

impl KeelServiceScopeFactory {
    pub fn new(context: &Context) -> Self {
        Self {
            root: context.root(),
        }
    }
}

impl ServiceScopeFactory for KeelServiceScopeFactory {
    fn create_scope(&self) -> Result<Box<dyn ServiceScope>, DiError> {
        let nested = self.root.nested()?;
        Ok(Box::new(KeelServiceScope::new(nested)))
    }
}

/// Host scope over one nested container. Dropping it closes the nested container.
pub struct KeelServiceScope {
    provider: KeelServiceProvider,
    nested: NestedContainer,
}

impl KeelServiceScope {
    pub fn new(nested: NestedContainer) -> Self {
        Self {
            provider: KeelServiceProvider::new(nested.context().clone()),
            nested,
        }
    }

    pub fn nested(&self) -> &NestedContainer {
        &self.nested
    }
}

impl ServiceScope for KeelServiceScope {
    fn service_provider(&self) -> &dyn ServiceProvider {
        &self.provider
    }
}

impl Disposable for KeelServiceScope {
    fn dispose(&self) -> Result<(), DiError> {
        Ok(self.nested.dispose()?)
    }
}

/// Provider handed to the host: owns the root container and disposes it with itself.
pub struct RootServiceProvider {
    provider: KeelServiceProvider,
    container: Container,
}

impl RootServiceProvider {
    pub fn new(container: Container) -> Self {
        Self {
            provider: KeelServiceProvider::new(container.context().clone()),
            container,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl ServiceProvider for RootServiceProvider {
    fn get_service(&self, service_type: &ServiceType) -> Result<Option<Instance>, DiError> {
        self.provider.get_service(service_type)
    }

    fn get_required_service(&self, service_type: &ServiceType) -> Result<Instance, DiError> {
        self.provider.get_required_service(service_type)
    }
}

impl Disposable for RootServiceProvider {
    /// Closes open scopes, then disposes every per-container instance.
    fn dispose(&self) -> Result<(), DiError> {
        Ok(self.container.dispose()?)
    }
}

type ConfigureBase = Arc<dyn Fn(&mut Registry) + Send + Sync>;

/// Builds a keel container from the host's service collection.
#[derive(Clone, Default)]
pub struct KeelServiceProviderFactory {
    base: Option<ConfigureBase>,
    options: PopulateOptions,
}

impl KeelServiceProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrations applied to every builder before the host's services.
    pub fn with_registry(mut self, configure: impl Fn(&mut Registry) + Send + Sync + 'static) -> Self {
        self.base = Some(Arc::new(configure));
        self
    }

    pub fn with_options(mut self, options: PopulateOptions) -> Self {
        self.options = options;
        self
    }
}

impl ServiceProviderFactory for KeelServiceProviderFactory {
    type Builder = Registry;
    type Provider = RootServiceProvider;

    fn create_builder(&self, services: ServiceCollection) -> Registry {
        let mut registry = Registry::new();
        if let Some(configure) = &self.base {
            configure(&mut registry);
        }
        populate_with(&mut registry, services, &self.options);
        registry
    }

    fn create_service_provider(&self, builder: Registry) -> Result<RootServiceProvider, DiError> {
        let container = Container::build(builder)?;
        debug!(
            registrations = container.model().registration_count(),
            "service provider created"
        );
        Ok(RootServiceProvider::new(container))
    }
}
