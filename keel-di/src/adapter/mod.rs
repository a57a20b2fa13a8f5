//! Satisfies the host abstraction with a keel-core container.

pub mod is_service;
pub mod lifetime;
pub mod populate;
pub mod provider;
pub mod selector;
pub mod translate;

pub use is_service::KeelServiceProviderIsService;
pub use lifetime::lifecycle_for;
pub use populate::{populate, populate_with, ContainerExt, RegistryExt};
pub use provider::{
    KeelServiceProvider, KeelServiceProviderFactory, KeelServiceScope, KeelServiceScopeFactory,
    RootServiceProvider,
};
pub use selector::HostConstructorSelector;
pub use translate::{configure_services, register_descriptor, register_services};
