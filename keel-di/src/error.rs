//! Host-facing errors.

use keel_core::{BoxError, ContainerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiError {
    #[error("populate should only be called once per container")]
    DuplicatePopulation,
    #[error("no service registered for {0}")]
    ServiceNotRegistered(String),
    #[error(transparent)]
    Container(ContainerError),
    #[error(transparent)]
    Other(BoxError),
}

impl DiError {
    /// Wraps an application error raised by a host factory.
    pub fn other(error: impl Into<BoxError>) -> Self {
        DiError::Other(error.into())
    }
}

/// Errors raised by the adapter travel through the container boxed in a configuration or
/// factory error; they come back out unchanged.
impl From<ContainerError> for DiError {
    fn from(error: ContainerError) -> Self {
        match error {
            ContainerError::NotRegistered(service) => DiError::ServiceNotRegistered(service),
            ContainerError::Configuration(source) => match source.downcast::<DiError>() {
                Ok(inner) => *inner,
                Err(source) => DiError::Container(ContainerError::Configuration(source)),
            },
            ContainerError::Factory { service, source } => match source.downcast::<DiError>() {
                Ok(inner) => *inner,
                Err(source) => DiError::Container(ContainerError::Factory { service, source }),
            },
            other => DiError::Container(other),
        }
    }
}
