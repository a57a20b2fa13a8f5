//! Constructor metadata for plugged types, open-generic closings and constructor selection.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::container::Context;
use crate::instance::{Dispose, Instance};
use crate::model::RegistrationModel;
use crate::types::ServiceType;
use crate::ContainerError;

type Build<T> = Arc<dyn Fn(&Context) -> Result<T, ContainerError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Must resolve; a miss fails construction.
    Required,
    /// Resolved if registered, `None` otherwise.
    Optional,
    /// Every registration of the element type, possibly none.
    Sequence,
}

/// One constructor parameter: what it asks the container for.
#[derive(Debug, Clone)]
pub struct Parameter {
    service_type: ServiceType,
    kind: ParameterKind,
}

impl Parameter {
    pub fn required<S: ?Sized + 'static>() -> Self {
        Self {
            service_type: ServiceType::of::<S>(),
            kind: ParameterKind::Required,
        }
    }

    pub fn optional<S: ?Sized + 'static>() -> Self {
        Self {
            service_type: ServiceType::of::<S>(),
            kind: ParameterKind::Optional,
        }
    }

    pub fn sequence<S: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            service_type: ServiceType::sequence_of::<S>(),
            kind: ParameterKind::Sequence,
        }
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }
}

/// Typed constructor of an [`Injectable`] type.
pub struct Constructor<T> {
    name: &'static str,
    parameters: Vec<Parameter>,
    marked: bool,
    build: Build<T>,
}

impl<T> Constructor<T> {
    pub fn new(
        name: &'static str,
        parameters: Vec<Parameter>,
        build: impl Fn(&Context) -> Result<T, ContainerError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            parameters,
            marked: false,
            build: Arc::new(build),
        }
    }

    /// Flags this constructor with the host's constructor-injection marker.
    pub fn marked(mut self) -> Self {
        self.marked = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }
}

/// A type the container can build itself. Usually implemented by `#[derive(Injectable)]`
/// or `#[injectable]` from `keel-di`.
pub trait Injectable: Sized + Send + Sync + 'static {
    fn constructors() -> Vec<Constructor<Self>>;

    /// Disposal hook registered with the owner of a freshly built instance.
    fn disposer(_this: &Arc<Self>) -> Option<Arc<dyn Dispose>> {
        None
    }
}

/// `Self` can be served as service `S`.
pub trait Provides<S: ?Sized>: Send + Sync + 'static {
    fn provide(self: Arc<Self>) -> Arc<S>;
}

impl<T: Injectable> Provides<T> for T {
    fn provide(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Type-erased constructor: builds the instance already cast to the service type.
#[derive(Clone)]
pub struct ConstructorInfo {
    name: &'static str,
    parameters: Arc<[Parameter]>,
    marked: bool,
    build: Build<Instance>,
}

impl ConstructorInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub(crate) fn build(&self, context: &Context) -> Result<Instance, ContainerError> {
        (self.build)(context)
    }
}

/// Concrete implementation type served as some service type.
#[derive(Clone)]
pub struct PluggedType {
    id: TypeId,
    name: &'static str,
    constructors: Arc<[ConstructorInfo]>,
}

impl PluggedType {
    /// Implementation `I` served as service `S`.
    pub fn of<S, I>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        let constructors: Vec<ConstructorInfo> = I::constructors()
            .into_iter()
            .map(|constructor| {
                let build = constructor.build;
                ConstructorInfo {
                    name: constructor.name,
                    parameters: constructor.parameters.into(),
                    marked: constructor.marked,
                    build: Arc::new(move |context: &Context| {
                        let built = Arc::new(build(context)?);
                        let disposer = I::disposer(&built);
                        let instance = Instance::new::<S>(<I as Provides<S>>::provide(built));
                        Ok(match disposer {
                            Some(disposer) => instance.with_disposer(disposer),
                            None => instance,
                        })
                    }),
                }
            })
            .collect();
        Self {
            id: TypeId::of::<I>(),
            name: type_name::<I>(),
            constructors: constructors.into(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }
}

/// Implementations of an open generic, one plugged type per supported instantiation.
#[derive(Clone)]
pub struct Closings {
    name: &'static str,
    plugged: HashMap<TypeId, PluggedType>,
}

impl Closings {
    /// `name` describes the open implementation, e.g. `"Logger<_>"`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            plugged: HashMap::new(),
        }
    }

    /// Adds the instantiation serving closed service `S` with implementation `I`.
    pub fn close<S, I>(mut self) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable + Provides<S>,
    {
        self.plugged.insert(TypeId::of::<S>(), PluggedType::of::<S, I>());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn plugged_for(&self, closed: &ServiceType) -> Option<&PluggedType> {
        self.plugged.get(&closed.id())
    }
}

/// Constructor-selection policy, consulted each time a plugged type is built.
pub trait ConstructorSelector: Send + Sync {
    fn select<'a>(
        &self,
        plugged: &'a PluggedType,
        model: &RegistrationModel,
    ) -> Option<&'a ConstructorInfo>;
}

/// Default policy: the constructor with the most parameters; first declared wins a tie.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreediestConstructor;

impl ConstructorSelector for GreediestConstructor {
    fn select<'a>(
        &self,
        plugged: &'a PluggedType,
        _model: &RegistrationModel,
    ) -> Option<&'a ConstructorInfo> {
        plugged
            .constructors()
            .iter()
            .rev()
            .max_by_key(|constructor| constructor.parameters().len())
    }
}
