//! Host dependency-injection abstraction: descriptors, the service collection and the resolver,
//! scope and presence contracts the host consumes.

pub mod collection;
pub mod descriptor;
pub mod lifetime;
pub mod provider;

pub use collection::ServiceCollection;
pub use descriptor::{Implementation, ServiceDescriptor, ServiceFactory};
pub use lifetime::ServiceLifetime;
pub use provider::{
    Disposable, ServiceProvider, ServiceProviderExt, ServiceProviderFactory,
    ServiceProviderIsService, ServiceScope, ServiceScopeFactory,
};
