//! Registration model: families of registrations keyed by service type.

use std::collections::HashMap;
use std::sync::Arc;

use crate::construct::{ConstructorSelector, GreediestConstructor};
use crate::registry::Registration;
use crate::types::ServiceType;

/// The built registration model. The last registration of a family is its default.
#[derive(Clone)]
pub struct RegistrationModel {
    families: HashMap<ServiceType, Vec<Arc<Registration>>>,
    selector: Arc<dyn ConstructorSelector>,
}

impl RegistrationModel {
    pub fn new() -> Self {
        Self {
            families: HashMap::new(),
            selector: Arc::new(GreediestConstructor),
        }
    }

    /// True once the type was named in any registration, even one without an implementation.
    pub fn has_family(&self, service_type: &ServiceType) -> bool {
        self.families.contains_key(service_type)
    }

    pub fn has_default_for(&self, service_type: &ServiceType) -> bool {
        self.default_for(service_type).is_some()
    }

    pub fn default_for(&self, service_type: &ServiceType) -> Option<&Arc<Registration>> {
        self.families
            .get(service_type)
            .and_then(|registrations| registrations.last())
    }

    /// Every registration of the family, oldest first.
    pub fn registrations_for(&self, service_type: &ServiceType) -> &[Arc<Registration>] {
        self.families
            .get(service_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether resolving `service_type` would find a registration or a fallback for it.
    pub fn can_resolve(&self, service_type: &ServiceType) -> bool {
        if service_type.is_generic_definition() {
            return false;
        }
        if self.has_default_for(service_type) {
            return true;
        }
        match service_type.generic_definition() {
            Some(definition) if definition.is_sequence() => true,
            Some(definition) => self.has_default_for(&ServiceType::definition(definition)),
            None => false,
        }
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn registration_count(&self) -> usize {
        self.families.values().map(Vec::len).sum()
    }

    pub fn constructor_selector(&self) -> &Arc<dyn ConstructorSelector> {
        &self.selector
    }

    pub(crate) fn add_family(&mut self, service_type: ServiceType) {
        self.families.entry(service_type).or_default();
    }

    pub(crate) fn add_registration(&mut self, registration: Registration) {
        self.families
            .entry(registration.service_type().clone())
            .or_default()
            .push(Arc::new(registration));
    }

    pub(crate) fn set_constructor_selector(&mut self, selector: Arc<dyn ConstructorSelector>) {
        self.selector = selector;
    }
}

impl Default for RegistrationModel {
    fn default() -> Self {
        Self::new()
    }
}
