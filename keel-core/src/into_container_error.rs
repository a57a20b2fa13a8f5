//! Map foreign errors to ContainerError from checks and factories.

use crate::types::ServiceType;
use crate::ContainerError;

/// Convert any error to ContainerError. Use in checks: `.map_err(IntoContainerError::into_configuration_error)`.
pub trait IntoContainerError {
    /// A queued configuration check rejected the model.
    fn into_configuration_error(self) -> ContainerError;

    /// A factory registered for `service` failed.
    fn into_factory_error(self, service: &ServiceType) -> ContainerError;
}

impl<E: std::error::Error + Send + Sync + 'static> IntoContainerError for E {
    fn into_configuration_error(self) -> ContainerError {
        ContainerError::Configuration(Box::new(self))
    }

    fn into_factory_error(self, service: &ServiceType) -> ContainerError {
        ContainerError::Factory {
            service: service.to_string(),
            source: Box::new(self),
        }
    }
}
