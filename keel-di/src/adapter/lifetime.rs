//! Mapping host service lifetimes onto native lifecycles.

use keel_core::Lifecycle;

use crate::host::ServiceLifetime;

/// Host lifetime to native lifecycle.
pub fn lifecycle_for(lifetime: ServiceLifetime) -> Lifecycle {
    match lifetime {
        ServiceLifetime::Transient => Lifecycle::PerRequest,
        ServiceLifetime::Scoped => Lifecycle::PerNestedScope,
        ServiceLifetime::Singleton => Lifecycle::PerContainer,
    }
}

impl From<ServiceLifetime> for Lifecycle {
    fn from(lifetime: ServiceLifetime) -> Self {
        lifecycle_for(lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn maps_each_lifetime_to_its_own_lifecycle() {
        let lifetimes = [
            ServiceLifetime::Transient,
            ServiceLifetime::Scoped,
            ServiceLifetime::Singleton,
        ];
        let lifecycles: HashSet<Lifecycle> = lifetimes.into_iter().map(Lifecycle::from).collect();
        assert_eq!(lifecycles.len(), 3);
        assert_eq!(lifecycle_for(ServiceLifetime::Transient), Lifecycle::PerRequest);
        assert_eq!(lifecycle_for(ServiceLifetime::Scoped), Lifecycle::PerNestedScope);
        assert_eq!(lifecycle_for(ServiceLifetime::Singleton), Lifecycle::PerContainer);
    }
}
