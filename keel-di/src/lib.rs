//! Keel DI: lets a keel-core container stand behind the host's dependency-injection
//! abstraction (descriptors, resolver, scopes, presence checks).

pub mod adapter;
pub mod error;
pub mod host;
pub mod options;

pub use adapter::{
    configure_services, lifecycle_for, populate, populate_with, register_descriptor,
    register_services, ContainerExt, HostConstructorSelector, KeelServiceProvider,
    KeelServiceProviderFactory, KeelServiceProviderIsService, KeelServiceScope,
    KeelServiceScopeFactory, RegistryExt, RootServiceProvider,
};
pub use error::DiError;
pub use host::{
    Disposable, Implementation, ServiceCollection, ServiceDescriptor, ServiceFactory,
    ServiceLifetime, ServiceProvider, ServiceProviderExt, ServiceProviderFactory,
    ServiceProviderIsService, ServiceScope, ServiceScopeFactory,
};
pub use keel_core::{
    BoxError, Closings, Constructor, ConstructorInfo, ConstructorSelector, Container,
    ContainerError, Context, Dispose, DisposeError, GenericDefinition, GreediestConstructor,
    Injectable, Instance, IntoContainerError, Lifecycle, NestedContainer, Parameter, ParameterKind,
    PluggedType, Provides, RegistrationModel, Registry, ServiceType,
};
pub use keel_macros::{injectable, Injectable};
pub use options::PopulateOptions;
