//! Keel core: IoC container with a registration model, native lifecycles, nested scopes and disposal.

pub mod construct;
pub mod container;
pub mod instance;
pub mod into_container_error;
pub mod lifecycle;
pub mod model;
pub mod registry;
pub mod types;

pub use construct::{
    Closings, Constructor, ConstructorInfo, ConstructorSelector, GreediestConstructor, Injectable,
    Parameter, ParameterKind, PluggedType, Provides,
};
pub use container::{Container, Context, NestedContainer};
pub use instance::{Dispose, DisposeError, Instance};
pub use into_container_error::IntoContainerError;
pub use lifecycle::Lifecycle;
pub use model::RegistrationModel;
pub use registry::{Construction, FactoryFn, Registration, RegistrationExpression, RegistrationId, Registry};
pub use types::{GenericDefinition, ServiceType};

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("no registration for {0}")]
    NotRegistered(String),
    #[error("no usable constructor for {0}")]
    NoConstructor(String),
    #[error("{implementation} cannot be closed over {closed}")]
    NotClosable { implementation: String, closed: String },
    #[error("instance resolved for {0} has another type")]
    TypeMismatch(String),
    #[error("circular dependency while resolving {0}")]
    Cycle(String),
    #[error("container has been disposed")]
    Disposed,
    #[error("disposal failed: {0}")]
    Dispose(#[from] DisposeError),
    #[error("configuration rejected: {0}")]
    Configuration(#[source] BoxError),
    #[error("factory for {service} failed: {source}")]
    Factory {
        service: String,
        #[source]
        source: BoxError,
    },
}
