//! Container behaviour without the host adapter: lifecycles, scopes, disposal, fallbacks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use keel_core::{
    Closings, Constructor, Container, ContainerError, Dispose, DisposeError, GenericDefinition,
    Injectable, Instance, IntoContainerError, Lifecycle, Parameter, Provides, Registry,
    ServiceType,
};

trait Clock: Send + Sync {
    fn disposals(&self) -> usize;
}

#[derive(Default)]
struct Counter {
    disposed: AtomicUsize,
}

impl Counter {
    fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Dispose for Counter {
    fn dispose(&self) -> Result<(), DisposeError> {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Clock for Counter {
    fn disposals(&self) -> usize {
        self.disposed()
    }
}

impl Injectable for Counter {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new("default", vec![], |_| Ok(Counter::default()))]
    }

    fn disposer(this: &Arc<Self>) -> Option<Arc<dyn Dispose>> {
        Some(Arc::clone(this) as Arc<dyn Dispose>)
    }
}

impl Provides<dyn Clock> for Counter {
    fn provide(self: Arc<Self>) -> Arc<dyn Clock> {
        self
    }
}

fn same<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn container_with(lifecycle: Lifecycle) -> Container {
    let mut registry = Registry::new();
    registry
        .for_service::<Counter>()
        .lifecycle_is(lifecycle)
        .use_type::<Counter, Counter>();
    Container::build(registry).unwrap()
}

#[test]
fn per_request_builds_every_time() {
    let container = container_with(Lifecycle::PerRequest);
    let a = container.resolve_as::<Counter>().unwrap();
    let b = container.resolve_as::<Counter>().unwrap();
    assert!(!same(&a, &b));
}

#[test]
fn per_nested_scope_is_shared_within_one_scope_only() {
    let container = container_with(Lifecycle::PerNestedScope);
    let first = container.nested().unwrap();
    let second = container.nested().unwrap();

    let a = first.resolve_as::<Counter>().unwrap();
    let b = first.resolve_as::<Counter>().unwrap();
    let c = second.resolve_as::<Counter>().unwrap();
    assert!(same(&a, &b));
    assert!(!same(&a, &c));
}

#[test]
fn per_container_is_shared_across_scopes() {
    let container = container_with(Lifecycle::PerContainer);
    let first = container.nested().unwrap();
    let second = container.nested().unwrap();

    let a = first.resolve_as::<Counter>().unwrap();
    let b = second.resolve_as::<Counter>().unwrap();
    let c = container.resolve_as::<Counter>().unwrap();
    assert!(same(&a, &b));
    assert!(same(&a, &c));
}

#[test]
fn closing_a_scope_disposes_what_it_owns() {
    let mut registry = Registry::new();
    registry
        .for_service::<Counter>()
        .lifecycle_is(Lifecycle::PerNestedScope)
        .use_type::<Counter, Counter>();
    registry
        .for_service::<dyn Clock>()
        .lifecycle_is(Lifecycle::PerContainer)
        .use_type::<dyn Clock, Counter>();
    let container = Container::build(registry).unwrap();

    let scope = container.nested().unwrap();
    let scoped = scope.resolve_as::<Counter>().unwrap();
    let singleton = scope.resolve_as::<dyn Clock>().unwrap();

    scope.dispose().unwrap();
    assert_eq!(scoped.disposed(), 1);
    assert_eq!(singleton.disposals(), 0);

    scope.dispose().unwrap();
    assert_eq!(scoped.disposed(), 1);
    assert!(matches!(scope.resolve_as::<Counter>(), Err(ContainerError::Disposed)));

    container.dispose().unwrap();
    assert_eq!(singleton.disposals(), 1);
}

#[test]
fn disposing_root_closes_open_scopes_first() {
    let mut registry = Registry::new();
    registry
        .for_service::<dyn Clock>()
        .lifecycle_is(Lifecycle::PerRequest)
        .use_type::<dyn Clock, Counter>();
    registry
        .for_service::<Counter>()
        .lifecycle_is(Lifecycle::PerContainer)
        .use_type::<Counter, Counter>();
    let container = Container::build(registry).unwrap();
    let singleton = container.resolve_as::<Counter>().unwrap();
    let open = container.nested().unwrap();
    let transient = open.resolve_as::<dyn Clock>().unwrap();

    container.dispose().unwrap();
    container.dispose().unwrap();
    assert!(open.is_disposed());
    assert_eq!(transient.disposals(), 1);
    assert_eq!(singleton.disposed(), 1);
    assert!(matches!(container.nested(), Err(ContainerError::Disposed)));
}

#[test]
fn root_level_transients_are_not_tracked() {
    let container = container_with(Lifecycle::PerRequest);
    let transient = container.resolve_as::<Counter>().unwrap();
    container.dispose().unwrap();
    assert_eq!(transient.disposed(), 0);
}

#[test]
fn last_registration_wins_and_sequences_see_all() {
    let mut registry = Registry::new();
    let first = Arc::new(Counter::default());
    let second = Arc::new(Counter::default());
    registry
        .for_service::<dyn Clock>()
        .use_instance(Instance::new::<dyn Clock>(first.clone()));
    registry
        .for_service::<dyn Clock>()
        .use_instance(Instance::new::<dyn Clock>(second.clone()));
    let container = Container::build(registry).unwrap();

    let resolved = container.resolve_as::<dyn Clock>().unwrap();
    assert!(same(&resolved, &(second.clone() as Arc<dyn Clock>)));

    let all = container.resolve_all::<dyn Clock>().unwrap();
    assert_eq!(all.len(), 2);
    assert!(same(&all[0], &(first as Arc<dyn Clock>)));
}

#[test]
fn empty_sequence_resolves() {
    let container = Container::new();
    assert!(container.resolve_all::<dyn Clock>().unwrap().is_empty());
    assert!(container
        .try_resolve(&ServiceType::sequence_of::<dyn Clock>())
        .unwrap()
        .is_some());
}

#[test]
fn fixed_instances_are_never_disposed() {
    let counter = Arc::new(Counter::default());
    let mut registry = Registry::new();
    registry
        .for_service::<Counter>()
        .lifecycle_is(Lifecycle::PerContainer)
        .use_instance(Instance::disposable::<Counter, Counter>(counter.clone(), counter.clone()));
    let container = Container::build(registry).unwrap();
    container.resolve_as::<Counter>().unwrap();
    container.dispose().unwrap();
    assert_eq!(counter.disposed(), 0);
}

#[test]
fn missing_service() {
    let container = Container::new();
    assert!(matches!(
        container.resolve_as::<Counter>(),
        Err(ContainerError::NotRegistered(_))
    ));
    assert!(container.try_resolve_as::<Counter>().unwrap().is_none());
}

struct Greeting {
    clock: Arc<dyn Clock>,
    used: &'static str,
}

impl Injectable for Greeting {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::new("plain", vec![], |_| {
                Ok(Greeting {
                    clock: Arc::new(Counter::default()),
                    used: "plain",
                })
            }),
            Constructor::new("with_clock", vec![Parameter::required::<dyn Clock>()], |context| {
                Ok(Greeting {
                    clock: context.resolve_as::<dyn Clock>()?,
                    used: "with_clock",
                })
            }),
        ]
    }
}

#[test]
fn default_policy_takes_the_greediest_constructor() {
    let mut registry = Registry::new();
    registry.for_service::<Greeting>().use_type::<Greeting, Greeting>();
    let container = Container::build(registry).unwrap();
    assert!(matches!(
        container.resolve_as::<Greeting>(),
        Err(ContainerError::NotRegistered(_))
    ));

    let mut registry = Registry::new();
    registry.for_service::<Greeting>().use_type::<Greeting, Greeting>();
    registry.for_service::<dyn Clock>().use_type::<dyn Clock, Counter>();
    let container = Container::build(registry).unwrap();
    let greeting = container.resolve_as::<Greeting>().unwrap();
    assert_eq!(greeting.used, "with_clock");
    assert_eq!(greeting.clock.disposals(), 0);
}

trait Repository: Send + Sync {
    fn entity(&self) -> &'static str;
}

enum RepositoryFamily {}

struct MemoryRepository<T>(std::marker::PhantomData<T>);

impl<T: Send + Sync + 'static> Injectable for MemoryRepository<T> {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new("new", vec![], |_| {
            Ok(MemoryRepository(std::marker::PhantomData))
        })]
    }
}

enum Order {}
enum Invoice {}

trait RepositoryOf<T>: Repository {}

impl<T: Send + Sync + 'static> Repository for MemoryRepository<T> {
    fn entity(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T: Send + Sync + 'static> RepositoryOf<T> for MemoryRepository<T> {}

impl<T: Send + Sync + 'static> Provides<dyn RepositoryOf<T>> for MemoryRepository<T> {
    fn provide(self: Arc<Self>) -> Arc<dyn RepositoryOf<T>> {
        self
    }
}

fn repository_of<T: Send + Sync + 'static>() -> ServiceType {
    ServiceType::closed::<dyn RepositoryOf<T>>(
        GenericDefinition::of::<RepositoryFamily>("RepositoryOf", 1),
        vec![ServiceType::of::<T>()],
    )
}

#[test]
fn open_generics_close_per_instantiation() {
    let definition = GenericDefinition::of::<RepositoryFamily>("RepositoryOf", 1);
    let mut registry = Registry::new();
    registry
        .for_type(ServiceType::definition(definition))
        .lifecycle_is(Lifecycle::PerContainer)
        .use_open(
            Closings::new("MemoryRepository<_>")
                .close::<dyn RepositoryOf<Order>, MemoryRepository<Order>>(),
        );
    let container = Container::build(registry).unwrap();

    let orders = container
        .resolve_type_as::<dyn RepositoryOf<Order>>(&repository_of::<Order>())
        .unwrap();
    let again = container
        .resolve_type_as::<dyn RepositoryOf<Order>>(&repository_of::<Order>())
        .unwrap();
    assert!(orders.entity().ends_with("Order"));
    assert!(same(&orders, &again));

    assert!(matches!(
        container.resolve(&repository_of::<Invoice>()),
        Err(ContainerError::NotClosable { .. })
    ));
    assert!(matches!(
        container.resolve(&ServiceType::definition(definition)),
        Err(ContainerError::NotRegistered(_))
    ));
}

#[derive(Debug, thiserror::Error)]
#[error("rejected")]
struct Rejected;

#[test]
fn queued_checks_see_only_earlier_actions() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = Registry::new();
    registry.for_service::<Counter>();
    {
        let seen = Arc::clone(&seen);
        registry.configure(move |model| {
            seen.lock().unwrap().push((
                model.has_family(&ServiceType::of::<Counter>()),
                model.has_family(&ServiceType::of::<dyn Clock>()),
            ));
            Ok(())
        });
    }
    registry.for_service::<dyn Clock>();
    Container::build(registry).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![(true, false)]);
}

#[test]
fn failed_check_leaves_the_model_untouched() {
    let mut container = Container::new();
    let result = container.configure(|registry| {
        registry.for_service::<Counter>().use_type::<Counter, Counter>();
        registry.configure(|_| Err(Rejected.into_configuration_error()));
    });
    assert!(matches!(result, Err(ContainerError::Configuration(_))));
    assert!(!container.model().has_family(&ServiceType::of::<Counter>()));
}

struct Broken;

impl Dispose for Broken {
    fn dispose(&self) -> Result<(), DisposeError> {
        Err(DisposeError::new("socket already closed"))
    }
}

#[test]
fn disposal_errors_propagate() {
    let mut registry = Registry::new();
    registry
        .for_service::<Broken>()
        .lifecycle_is(Lifecycle::PerNestedScope)
        .use_factory(|_| {
            let broken = Arc::new(Broken);
            Ok(Instance::disposable(broken.clone(), broken))
        });
    let container = Container::build(registry).unwrap();
    let scope = container.nested().unwrap();
    scope.resolve_as::<Broken>().unwrap();
    assert!(matches!(scope.dispose(), Err(ContainerError::Dispose(_))));
    assert!(scope.dispose().is_ok());
}

#[test]
fn a_failing_disposal_does_not_skip_the_rest() {
    let healthy = Arc::new(Counter::default());
    let mut registry = Registry::new();
    {
        let healthy = Arc::clone(&healthy);
        registry
            .for_service::<Counter>()
            .lifecycle_is(Lifecycle::PerNestedScope)
            .use_factory(move |_| {
                Ok(Instance::disposable(Arc::clone(&healthy), Arc::clone(&healthy)))
            });
    }
    registry
        .for_service::<Broken>()
        .lifecycle_is(Lifecycle::PerNestedScope)
        .use_factory(|_| {
            let broken = Arc::new(Broken);
            Ok(Instance::disposable(broken.clone(), broken))
        });
    let container = Container::build(registry).unwrap();
    let scope = container.nested().unwrap();
    scope.resolve_as::<Counter>().unwrap();
    scope.resolve_as::<Broken>().unwrap();

    assert!(matches!(scope.dispose(), Err(ContainerError::Dispose(_))));
    assert_eq!(healthy.disposed(), 1);
    assert!(scope.dispose().is_ok());
    assert_eq!(healthy.disposed(), 1);
}

#[test]
fn a_failing_scope_does_not_keep_root_from_closing_the_others() {
    let mut registry = Registry::new();
    registry
        .for_service::<Counter>()
        .lifecycle_is(Lifecycle::PerNestedScope)
        .use_type::<Counter, Counter>();
    registry
        .for_service::<Broken>()
        .lifecycle_is(Lifecycle::PerNestedScope)
        .use_factory(|_| {
            let broken = Arc::new(Broken);
            Ok(Instance::disposable(broken.clone(), broken))
        });
    let container = Container::build(registry).unwrap();
    let failing = container.nested().unwrap();
    failing.resolve_as::<Broken>().unwrap();
    let healthy = container.nested().unwrap();
    let counter = healthy.resolve_as::<Counter>().unwrap();

    assert!(matches!(container.dispose(), Err(ContainerError::Dispose(_))));
    assert_eq!(counter.disposed(), 1);
    assert!(healthy.is_disposed());
    assert!(container.dispose().is_ok());
}

struct Loop;

#[test]
fn cycles_are_reported() {
    let mut registry = Registry::new();
    registry.for_service::<Loop>().use_factory(|context| {
        context.resolve_as::<Loop>()?;
        Ok(Instance::new(Arc::new(Loop)))
    });
    let container = Container::build(registry).unwrap();
    assert!(matches!(
        container.resolve_as::<Loop>(),
        Err(ContainerError::Cycle(_))
    ));
}

#[test]
fn concurrent_first_resolution_builds_one_singleton() {
    let built = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    {
        let built = Arc::clone(&built);
        registry
            .for_service::<Counter>()
            .lifecycle_is(Lifecycle::PerContainer)
            .use_factory(move |_| {
                built.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(5));
                Ok(Instance::new(Arc::new(Counter::default())))
            });
    }
    let container = Container::build(registry).unwrap();
    let context = container.context().clone();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let context = context.clone();
            std::thread::spawn(move || context.resolve_as::<Counter>().unwrap())
        })
        .collect();
    let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(resolved.windows(2).all(|pair| same(&pair[0], &pair[1])));
}

trait Widget: Send + Sync {}

struct Composite;

impl Widget for Composite {}

#[test]
fn cached_composites_report_a_cycle_instead_of_hanging() {
    for lifecycle in [Lifecycle::PerContainer, Lifecycle::PerNestedScope] {
        let mut registry = Registry::new();
        registry
            .for_service::<dyn Widget>()
            .lifecycle_is(lifecycle)
            .use_factory(|context| {
                context.resolve_all::<dyn Widget>()?;
                Ok(Instance::new::<dyn Widget>(Arc::new(Composite)))
            });
        let container = Container::build(registry).unwrap();
        let scope = container.nested().unwrap();

        let (sender, receiver) = std::sync::mpsc::channel();
        let context = scope.context().clone();
        std::thread::spawn(move || {
            let _ = sender.send(context.resolve_as::<dyn Widget>().err());
        });
        let error = receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("resolution did not finish");
        assert!(matches!(error, Some(ContainerError::Cycle(_))));
    }
}
