//! Presence oracle: answers whether a service type is resolvable without resolving it.

use keel_core::{Context, RegistrationModel, ServiceType};

use crate::host::ServiceProviderIsService;

/// Reads the container's current model on every call, so later configuration is visible.
#[derive(Clone, Debug)]
pub struct KeelServiceProviderIsService {
    root: Context,
}

impl KeelServiceProviderIsService {
    pub fn new(context: &Context) -> Self {
        Self {
            root: context.root(),
        }
    }
}

impl ServiceProviderIsService for KeelServiceProviderIsService {
    fn is_service(&self, service_type: &ServiceType) -> bool {
        is_service_in(&self.root.model(), service_type)
    }
}

/// The checks run in this order: a type that is both registered and generic is decided by
/// its own registration before any generic fallback.
pub fn is_service_in(model: &RegistrationModel, service_type: &ServiceType) -> bool {
    if service_type.is_generic_definition() {
        return false;
    }
    if model.has_default_for(service_type) {
        return true;
    }
    match service_type.generic_definition() {
        // Sequences are synthesized even when nothing of the element type is registered.
        Some(definition) if definition.is_sequence() => true,
        Some(definition) => model.has_default_for(&ServiceType::definition(definition)),
        None => false,
    }
}
