//! Ordered list of service descriptors, built by the host before a provider exists.

use std::sync::Arc;

use keel_core::{Injectable, Instance, Provides, ServiceType};

use crate::error::DiError;
use crate::host::descriptor::ServiceDescriptor;
use crate::host::lifetime::ServiceLifetime;
use crate::host::provider::ServiceProvider;

#[derive(Clone, Debug, Default)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Adds `descriptor` unless its service type is already described.
    pub fn try_add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        if !self.contains(descriptor.service_type()) {
            self.descriptors.push(descriptor);
        }
        self
    }

    pub fn contains(&self, service_type: &ServiceType) -> bool {
        self.descriptors
            .iter()
            .any(|descriptor| descriptor.service_type() == service_type)
    }

    pub fn add_transient<S, I>(&mut self) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        self.add(ServiceDescriptor::transient::<S, I>())
    }

    pub fn add_scoped<S, I>(&mut self) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        self.add(ServiceDescriptor::scoped::<S, I>())
    }

    pub fn add_singleton<S, I>(&mut self) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        self.add(ServiceDescriptor::singleton::<S, I>())
    }

    pub fn add_transient_factory<S: ?Sized + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn ServiceProvider) -> Result<Arc<S>, DiError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.add(ServiceDescriptor::factory_of(ServiceLifetime::Transient, factory))
    }

    pub fn add_scoped_factory<S: ?Sized + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn ServiceProvider) -> Result<Arc<S>, DiError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.add(ServiceDescriptor::factory_of(ServiceLifetime::Scoped, factory))
    }

    pub fn add_singleton_factory<S: ?Sized + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn ServiceProvider) -> Result<Arc<S>, DiError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.add(ServiceDescriptor::factory_of(ServiceLifetime::Singleton, factory))
    }

    /// Factory whose instances carry their own disposal hook (see [`Instance::disposable`]).
    pub fn add_factory<S: ?Sized + 'static>(
        &mut self,
        lifetime: ServiceLifetime,
        factory: impl Fn(&dyn ServiceProvider) -> Result<Instance, DiError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.add(ServiceDescriptor::factory(ServiceType::of::<S>(), lifetime, factory))
    }

    pub fn add_singleton_instance<S: ?Sized + Send + Sync + 'static>(
        &mut self,
        instance: Arc<S>,
    ) -> &mut Self {
        self.add(ServiceDescriptor::instance(instance))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceDescriptor> {
        self.descriptors.iter()
    }
}

impl IntoIterator for ServiceCollection {
    type Item = ServiceDescriptor;
    type IntoIter = std::vec::IntoIter<ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ServiceCollection {
    type Item = &'a ServiceDescriptor;
    type IntoIter = std::slice::Iter<'a, ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

impl FromIterator<ServiceDescriptor> for ServiceCollection {
    fn from_iter<T: IntoIterator<Item = ServiceDescriptor>>(iter: T) -> Self {
        Self {
            descriptors: iter.into_iter().collect(),
        }
    }
}

impl Extend<ServiceDescriptor> for ServiceCollection {
    fn extend<T: IntoIterator<Item = ServiceDescriptor>>(&mut self, iter: T) {
        self.descriptors.extend(iter);
    }
}
