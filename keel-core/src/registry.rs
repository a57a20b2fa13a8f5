//! Registry: queued configuration actions, replayed against the model when a container is
//! built or configured.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::construct::{Closings, ConstructorSelector, Injectable, PluggedType, Provides};
use crate::container::Context;
use crate::instance::Instance;
use crate::lifecycle::Lifecycle;
use crate::model::RegistrationModel;
use crate::types::ServiceType;
use crate::ContainerError;

pub type FactoryFn = Arc<dyn Fn(&Context) -> Result<Instance, ContainerError> + Send + Sync>;

type CheckFn = Box<dyn FnOnce(&RegistrationModel) -> Result<(), ContainerError> + Send>;

static NEXT_REGISTRATION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    fn next() -> Self {
        Self(NEXT_REGISTRATION.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a registration produces its instance.
#[derive(Clone)]
pub enum Construction {
    /// Build a concrete type through the model's constructor-selection policy.
    Plugged(PluggedType),
    /// Close an open generic over the requested instantiation.
    OpenGeneric(Arc<Closings>),
    Factory(FactoryFn),
    /// Hand out a fixed instance. The container never disposes it.
    Instance(Instance),
}

/// Binds a service type to a construction strategy and a lifecycle.
#[derive(Clone)]
pub struct Registration {
    id: RegistrationId,
    service_type: ServiceType,
    lifecycle: Lifecycle,
    construction: Construction,
}

impl Registration {
    pub fn new(service_type: ServiceType, lifecycle: Lifecycle, construction: Construction) -> Self {
        Self {
            id: RegistrationId::next(),
            service_type,
            lifecycle,
            construction,
        }
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn construction(&self) -> &Construction {
        &self.construction
    }
}

enum Action {
    Family(ServiceType),
    Register(Registration),
    Check(CheckFn),
    Selector(Arc<dyn ConstructorSelector>),
}

/// Configuration expression. Nothing touches the model until the registry is applied.
#[derive(Default)]
pub struct Registry {
    actions: Vec<Action>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a registration for `service_type` and declares its family.
    pub fn for_type(&mut self, service_type: ServiceType) -> RegistrationExpression<'_> {
        self.actions.push(Action::Family(service_type.clone()));
        RegistrationExpression {
            registry: self,
            service_type,
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn for_service<S: ?Sized + 'static>(&mut self) -> RegistrationExpression<'_> {
        self.for_type(ServiceType::of::<S>())
    }

    /// Queues a check run against the model at the point it is applied, after every
    /// action queued before it and before every action queued after it.
    pub fn configure(
        &mut self,
        check: impl FnOnce(&RegistrationModel) -> Result<(), ContainerError> + Send + 'static,
    ) {
        self.actions.push(Action::Check(Box::new(check)));
    }

    pub fn constructor_selector(&mut self, selector: impl ConstructorSelector + 'static) {
        self.actions.push(Action::Selector(Arc::new(selector)));
    }

    /// Appends every action of `other`, keeping their order.
    pub fn include(&mut self, other: Registry) {
        self.actions.extend(other.actions);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn apply(self, model: &mut RegistrationModel) -> Result<(), ContainerError> {
        for action in self.actions {
            match action {
                Action::Family(service_type) => model.add_family(service_type),
                Action::Register(registration) => {
                    trace!(
                        service = %registration.service_type(),
                        lifecycle = %registration.lifecycle(),
                        "registering"
                    );
                    model.add_registration(registration);
                }
                Action::Check(check) => check(model)?,
                Action::Selector(selector) => model.set_constructor_selector(selector),
            }
        }
        Ok(())
    }
}

/// Registration in progress for one service type.
pub struct RegistrationExpression<'a> {
    registry: &'a mut Registry,
    service_type: ServiceType,
    lifecycle: Lifecycle,
}

impl RegistrationExpression<'_> {
    pub fn lifecycle_is(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn use_plugged(self, plugged: PluggedType) {
        self.finish(Construction::Plugged(plugged));
    }

    /// Implementation `I` served as `S`. `S` must be the type this expression was started for.
    pub fn use_type<S, I>(self)
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        self.use_plugged(PluggedType::of::<S, I>());
    }

    pub fn use_open(self, closings: Closings) {
        self.finish(Construction::OpenGeneric(Arc::new(closings)));
    }

    pub fn use_factory(
        self,
        factory: impl Fn(&Context) -> Result<Instance, ContainerError> + Send + Sync + 'static,
    ) {
        self.finish(Construction::Factory(Arc::new(factory)));
    }

    pub fn use_instance(self, instance: Instance) {
        self.finish(Construction::Instance(instance));
    }

    fn finish(self, construction: Construction) {
        let registration = Registration::new(self.service_type, self.lifecycle, construction);
        self.registry.actions.push(Action::Register(registration));
    }
}
