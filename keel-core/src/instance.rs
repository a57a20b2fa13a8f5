//! Resolved instances and the disposal hook the container calls when their owner closes.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Teardown hook for instances the container owns.
///
/// The owner (a nested container for per-request and per-scope instances, the root for
/// per-container ones) calls it once, when it is disposed.
pub trait Dispose: Send + Sync {
    fn dispose(&self) -> Result<(), DisposeError>;
}

#[derive(Error, Debug)]
#[error("{message}")]
pub struct DisposeError {
    message: String,
}

impl DisposeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A resolved service: the typed handle behind `dyn Any`, plus its disposer if it has one.
///
/// For a service `S` the handle is an `Arc<S>`; for a sequence of `S` it is a `Vec<Arc<S>>`.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    disposer: Option<Arc<dyn Dispose>>,
}

impl Instance {
    pub fn new<S: ?Sized + Send + Sync + 'static>(service: Arc<S>) -> Self {
        Self::from_value(service)
    }

    /// Instance whose owner will call `disposer` when it closes.
    pub fn disposable<S, D>(service: Arc<S>, disposer: Arc<D>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        D: Dispose + 'static,
    {
        Self::new(service).with_disposer(disposer)
    }

    pub fn with_disposer(mut self, disposer: Arc<dyn Dispose>) -> Self {
        self.disposer = Some(disposer);
        self
    }

    pub(crate) fn from_value<H: Any + Send + Sync>(value: H) -> Self {
        Self {
            value: Arc::new(value),
            disposer: None,
        }
    }

    pub(crate) fn without_disposer(mut self) -> Self {
        self.disposer = None;
        self
    }

    /// Typed handle, or `None` when the instance holds another service type.
    pub fn downcast<S: ?Sized + 'static>(&self) -> Option<Arc<S>> {
        self.value.downcast_ref::<Arc<S>>().cloned()
    }

    /// Sequence handle, for instances produced by a sequence resolution.
    pub fn downcast_sequence<S: ?Sized + 'static>(&self) -> Option<Vec<Arc<S>>> {
        self.value.downcast_ref::<Vec<Arc<S>>>().cloned()
    }

    pub fn disposer(&self) -> Option<&Arc<dyn Dispose>> {
        self.disposer.as_ref()
    }

    /// True when both refer to the same resolved value.
    pub fn same_as(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("disposable", &self.disposer.is_some())
            .finish_non_exhaustive()
    }
}
