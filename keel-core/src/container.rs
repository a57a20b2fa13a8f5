//! Root and nested containers: resolution, lifecycle caching and ownership of disposable instances.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use once_cell::sync::OnceCell;
use tracing::{debug, trace, warn};

use crate::construct::PluggedType;
use crate::instance::{Dispose, Instance};
use crate::lifecycle::Lifecycle;
use crate::model::RegistrationModel;
use crate::registry::{Construction, Registration, RegistrationId, Registry};
use crate::types::ServiceType;
use crate::ContainerError;

type CacheKey = (RegistrationId, TypeId);

thread_local! {
    static RESOLVING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Marks a service type as being resolved on this thread for as long as it lives.
struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(service_type: &ServiceType) -> Result<Self, ContainerError> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&service_type.id()) {
                return Err(ContainerError::Cycle(service_type.to_string()));
            }
            stack.push(service_type.id());
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// One once-cell per cached registration, so concurrent first resolutions build once.
#[derive(Default)]
struct InstanceCache {
    cells: Mutex<HashMap<CacheKey, Arc<OnceCell<Instance>>>>,
}

impl InstanceCache {
    fn get_or_try_init(
        &self,
        key: CacheKey,
        init: impl FnOnce() -> Result<Instance, ContainerError>,
    ) -> Result<Instance, ContainerError> {
        let cell = self
            .cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone();
        cell.get_or_try_init(init).cloned()
    }

    fn clear(&self) {
        let cells = std::mem::take(&mut *self.cells.lock().unwrap_or_else(PoisonError::into_inner));
        drop(cells);
    }
}

/// Ownership boundary: caches per-scope instances and owns the disposable ones it created.
#[derive(Default)]
struct ScopeState {
    cache: InstanceCache,
    owned: Mutex<Vec<Arc<dyn Dispose>>>,
    closed: AtomicBool,
}

impl ScopeState {
    fn track(&self, instance: &Instance) {
        if let Some(disposer) = instance.disposer() {
            self.owned
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Arc::clone(disposer));
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Disposes every owned instance, most recent first, and returns the first failure.
    fn close(&self) -> Result<(), ContainerError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let owned = std::mem::take(&mut *self.owned.lock().unwrap_or_else(PoisonError::into_inner));
        self.cache.clear();
        let mut result = Ok(());
        for disposer in owned.into_iter().rev() {
            if let Err(error) = disposer.dispose() {
                result = result.and(Err(error.into()));
            }
        }
        result
    }
}

struct Root {
    model: RwLock<Arc<RegistrationModel>>,
    singletons: InstanceCache,
    /// The root's own scope: owns per-container instances and per-scope instances resolved at the root.
    scope: Arc<ScopeState>,
    nested: Mutex<Vec<Weak<ScopeState>>>,
}

impl Root {
    fn dispose(&self) -> Result<(), ContainerError> {
        if self.scope.is_closed() {
            return Ok(());
        }
        let nested = std::mem::take(&mut *self.nested.lock().unwrap_or_else(PoisonError::into_inner));
        debug!(open_scopes = nested.len(), "disposing container");
        let mut result = Ok(());
        for scope in nested.iter().filter_map(Weak::upgrade) {
            result = result.and(scope.close());
        }
        result = result.and(self.scope.close());
        self.singletons.clear();
        result
    }
}

/// Resolution entry point bound to one scope (the root's own scope or a nested one).
///
/// Cheap to clone. Factories receive the context they are resolved in.
#[derive(Clone)]
pub struct Context {
    root: Arc<Root>,
    scope: Arc<ScopeState>,
}

impl Context {
    /// Snapshot of the current registration model.
    pub fn model(&self) -> Arc<RegistrationModel> {
        Arc::clone(&self.root.model.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_root(&self) -> bool {
        Arc::ptr_eq(&self.root.scope, &self.scope)
    }

    pub fn is_disposed(&self) -> bool {
        self.scope.is_closed()
    }

    /// Context of the root container this one belongs to.
    pub fn root(&self) -> Context {
        Context {
            root: Arc::clone(&self.root),
            scope: Arc::clone(&self.root.scope),
        }
    }

    /// Opens a nested container directly below the root.
    pub fn nested(&self) -> Result<NestedContainer, ContainerError> {
        if self.root.scope.is_closed() {
            return Err(ContainerError::Disposed);
        }
        let scope = Arc::new(ScopeState::default());
        {
            let mut nested = self.root.nested.lock().unwrap_or_else(PoisonError::into_inner);
            nested.retain(|open| open.strong_count() > 0);
            nested.push(Arc::downgrade(&scope));
        }
        debug!("nested container opened");
        Ok(NestedContainer {
            context: Context {
                root: Arc::clone(&self.root),
                scope,
            },
        })
    }

    pub fn resolve(&self, service_type: &ServiceType) -> Result<Instance, ContainerError> {
        self.ensure_open()?;
        if service_type.is_generic_definition() {
            return Err(ContainerError::NotRegistered(service_type.to_string()));
        }
        let model = self.model();
        let _guard = ResolutionGuard::enter(service_type)?;
        trace!(service = %service_type, "resolving");

        if let Some(registration) = model.default_for(service_type) {
            return self.instance_for(&model, registration, service_type);
        }
        if let Some(definition) = service_type.generic_definition() {
            if definition.is_sequence() {
                return self.sequence(&model, service_type);
            }
            if let Some(registration) = model.default_for(&ServiceType::definition(definition)) {
                return self.instance_for(&model, registration, service_type);
            }
        }
        Err(ContainerError::NotRegistered(service_type.to_string()))
    }

    /// Like [`Context::resolve`], but `None` when nothing is registered for the type.
    pub fn try_resolve(&self, service_type: &ServiceType) -> Result<Option<Instance>, ContainerError> {
        self.ensure_open()?;
        if !self.model().can_resolve(service_type) {
            return Ok(None);
        }
        self.resolve(service_type).map(Some)
    }

    pub fn resolve_as<S: ?Sized + 'static>(&self) -> Result<Arc<S>, ContainerError> {
        self.resolve_type_as(&ServiceType::of::<S>())
    }

    pub fn try_resolve_as<S: ?Sized + 'static>(&self) -> Result<Option<Arc<S>>, ContainerError> {
        let service_type = ServiceType::of::<S>();
        match self.try_resolve(&service_type)? {
            Some(instance) => downcast(&service_type, &instance).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves a generic instantiation (or any explicitly built service type) as `S`.
    pub fn resolve_type_as<S: ?Sized + 'static>(
        &self,
        service_type: &ServiceType,
    ) -> Result<Arc<S>, ContainerError> {
        let instance = self.resolve(service_type)?;
        downcast(service_type, &instance)
    }

    /// Every registration of `S`, oldest first.
    pub fn resolve_all<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<S>>, ContainerError> {
        let service_type = ServiceType::sequence_of::<S>();
        self.resolve(&service_type)?
            .downcast_sequence::<S>()
            .ok_or_else(|| ContainerError::TypeMismatch(service_type.to_string()))
    }

    fn ensure_open(&self) -> Result<(), ContainerError> {
        if self.scope.is_closed() {
            Err(ContainerError::Disposed)
        } else {
            Ok(())
        }
    }

    fn instance_for(
        &self,
        model: &RegistrationModel,
        registration: &Registration,
        requested: &ServiceType,
    ) -> Result<Instance, ContainerError> {
        let key = (registration.id(), requested.id());
        match registration.lifecycle() {
            Lifecycle::PerRequest => {
                let instance = self.construct(model, registration, requested)?;
                if !self.is_root() {
                    self.scope.track(&instance);
                }
                Ok(instance)
            }
            Lifecycle::PerNestedScope => self.scope.cache.get_or_try_init(key, || {
                let instance = self.construct(model, registration, requested)?;
                self.scope.track(&instance);
                Ok(instance)
            }),
            Lifecycle::PerContainer => {
                let root = self.root();
                self.root.singletons.get_or_try_init(key, || {
                    let instance = root.construct(model, registration, requested)?;
                    root.scope.track(&instance);
                    Ok(instance)
                })
            }
        }
    }

    fn construct(
        &self,
        model: &RegistrationModel,
        registration: &Registration,
        requested: &ServiceType,
    ) -> Result<Instance, ContainerError> {
        match registration.construction() {
            Construction::Plugged(plugged) => self.build_plugged(model, plugged),
            Construction::OpenGeneric(closings) => {
                let plugged = closings.plugged_for(requested).ok_or_else(|| {
                    ContainerError::NotClosable {
                        implementation: closings.name().to_string(),
                        closed: requested.to_string(),
                    }
                })?;
                self.build_plugged(model, plugged)
            }
            Construction::Factory(factory) => factory(self),
            Construction::Instance(instance) => Ok(instance.clone().without_disposer()),
        }
    }

    fn build_plugged(
        &self,
        model: &RegistrationModel,
        plugged: &PluggedType,
    ) -> Result<Instance, ContainerError> {
        let constructor = model
            .constructor_selector()
            .select(plugged, model)
            .ok_or_else(|| ContainerError::NoConstructor(plugged.name().to_string()))?;
        trace!(
            implementation = plugged.name(),
            constructor = constructor.name(),
            "building"
        );
        constructor.build(self)
    }

    fn sequence(
        &self,
        model: &RegistrationModel,
        sequence: &ServiceType,
    ) -> Result<Instance, ContainerError> {
        let mismatch = || ContainerError::TypeMismatch(sequence.to_string());
        let element = sequence.sequence_element().ok_or_else(mismatch)?;
        let collect = sequence.collector().ok_or_else(mismatch)?;
        let items = model
            .registrations_for(element)
            .iter()
            .map(|registration| {
                let _guard = ResolutionGuard::enter(element)?;
                self.instance_for(model, registration, element)
            })
            .collect::<Result<Vec<_>, _>>()?;
        collect(items).ok_or_else(mismatch)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.is_root())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn downcast<S: ?Sized + 'static>(
    service_type: &ServiceType,
    instance: &Instance,
) -> Result<Arc<S>, ContainerError> {
    instance
        .downcast::<S>()
        .ok_or_else(|| ContainerError::TypeMismatch(service_type.to_string()))
}

/// Root container: owns the registration model and every per-container instance.
///
/// Dropping it disposes it; call [`Container::dispose`] to observe disposal errors.
pub struct Container {
    context: Context,
}

impl Container {
    /// Empty container.
    pub fn new() -> Self {
        Self::from_model(RegistrationModel::new())
    }

    /// Applies `registry` to a fresh model, running its queued checks.
    pub fn build(registry: Registry) -> Result<Self, ContainerError> {
        let mut model = RegistrationModel::new();
        registry.apply(&mut model)?;
        debug!(
            families = model.family_count(),
            registrations = model.registration_count(),
            "container built"
        );
        Ok(Self::from_model(model))
    }

    /// Applies more configuration. Either every action applies or, when a queued check
    /// fails, the model is left untouched.
    pub fn configure(&mut self, configure: impl FnOnce(&mut Registry)) -> Result<(), ContainerError> {
        let mut registry = Registry::new();
        configure(&mut registry);
        let mut current = self
            .context
            .root
            .model
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut model = RegistrationModel::clone(&current);
        registry.apply(&mut model)?;
        debug!(
            families = model.family_count(),
            registrations = model.registration_count(),
            "container configured"
        );
        *current = Arc::new(model);
        Ok(())
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Closes open nested containers, then disposes every instance the root owns. Idempotent.
    pub fn dispose(&self) -> Result<(), ContainerError> {
        self.context.root.dispose()
    }

    fn from_model(model: RegistrationModel) -> Self {
        let scope = Arc::new(ScopeState::default());
        let root = Arc::new(Root {
            model: RwLock::new(Arc::new(model)),
            singletons: InstanceCache::default(),
            scope: Arc::clone(&scope),
            nested: Mutex::new(Vec::new()),
        });
        Self {
            context: Context { root, scope },
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Container {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.context
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if let Err(error) = self.dispose() {
            warn!(%error, "container disposal failed during drop");
        }
    }
}

/// Nested container opened from the root. Dropping it closes it.
pub struct NestedContainer {
    context: Context,
}

impl NestedContainer {
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Disposes every instance this scope owns. Idempotent.
    pub fn dispose(&self) -> Result<(), ContainerError> {
        if !self.context.is_disposed() {
            debug!("nested container closing");
        }
        self.context.scope.close()
    }
}

impl Deref for NestedContainer {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.context
    }
}

impl Drop for NestedContainer {
    fn drop(&mut self) {
        if let Err(error) = self.dispose() {
            warn!(%error, "nested container disposal failed during drop");
        }
    }
}
