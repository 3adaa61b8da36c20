//! Integration tests for the DI container

use keystone_di::prelude::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Test services
trait Facility: Send + Sync {
    fn facilitate(&self) -> usize;
}

struct BasicFacility;

impl Facility for BasicFacility {
    fn facilitate(&self) -> usize {
        1
    }
}

struct AdvancedFacility {
    inner: Arc<dyn Facility>,
}

impl AdvancedFacility {
    fn new(inner: Arc<dyn Facility>) -> Self {
        Self { inner }
    }
}

impl Facility for AdvancedFacility {
    fn facilitate(&self) -> usize {
        self.inner.facilitate() + 1
    }
}

trait Logger: Send + Sync {
    fn name(&self) -> &str;
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn name(&self) -> &str {
        "console"
    }
}

struct FileLogger;

impl Logger for FileLogger {
    fn name(&self) -> &str {
        "file"
    }
}

struct RequestScope {
    id: usize,
}

static NEXT_REQUEST: AtomicUsize = AtomicUsize::new(0);

struct UserService {
    logger: Arc<dyn Logger>,
    facility: Arc<dyn Facility>,
}

struct RequestHandler {
    scope: Arc<RequestScope>,
    users: Arc<UserService>,
}

struct CachedHandler {
    _scope: Arc<RequestScope>,
}

struct Ambiguous;

fn catalog() -> Arc<TypeCatalog> {
    let mut builder = TypeCatalog::builder();
    builder
        .register_in(
            "facilities",
            Implementation::of::<AdvancedFacility>()
                .provides::<dyn Facility>(|it| it)
                .constructor(AdvancedFacility::new)
                .build(),
        )
        .register_in(
            "facilities",
            Implementation::of::<BasicFacility>()
                .provides::<dyn Facility>(|it| it)
                .constructor(|| BasicFacility)
                .build(),
        )
        .register_in(
            "services",
            Implementation::of::<ConsoleLogger>()
                .provides::<dyn Logger>(|it| it)
                .constructor(|| ConsoleLogger)
                .build(),
        )
        .register_in(
            "services",
            Implementation::of::<UserService>()
                .constructor(|logger: Arc<dyn Logger>, facility: Arc<dyn Facility>| {
                    UserService { logger, facility }
                })
                .build(),
        )
        .register_in(
            "services",
            Implementation::of::<RequestScope>()
                .constructor(|| RequestScope {
                    id: NEXT_REQUEST.fetch_add(1, Ordering::SeqCst),
                })
                .transient()
                .build(),
        )
        .register_in(
            "services",
            Implementation::of::<RequestHandler>()
                .constructor(|scope: Arc<RequestScope>, users: Arc<UserService>| {
                    RequestHandler { scope, users }
                })
                .transient()
                .build(),
        )
        .register(
            Implementation::of::<FileLogger>()
                .provides::<dyn Logger>(|it| it)
                .constructor(|| FileLogger)
                .build(),
        )
        .register(
            Implementation::of::<CachedHandler>()
                .constructor(|scope: Arc<RequestScope>| CachedHandler { _scope: scope })
                .build(),
        )
        .register(
            Implementation::of::<Ambiguous>()
                .constructor(|| Ambiguous)
                .constructor(|_logger: Arc<dyn Logger>| Ambiguous)
                .build(),
        );
    Arc::new(builder.build())
}

#[test]
fn test_instance_registration() {
    let mut container = Container::with_catalog(catalog());
    let facility = Arc::new(BasicFacility);
    container
        .add_instance::<dyn Facility, _>(facility.clone())
        .unwrap();

    let resolved = container.get::<dyn Facility>().unwrap();
    assert_eq!(
        Arc::as_ptr(&resolved) as *const u8,
        Arc::as_ptr(&facility) as *const u8
    );
}

#[test]
fn test_shared_and_transient_lifetimes() {
    let mut container = Container::with_catalog(catalog());
    container.refer_module("facilities").refer_module("services");

    let users1 = container.get::<UserService>().unwrap();
    let users2 = container.get::<UserService>().unwrap();
    assert!(Arc::ptr_eq(&users1, &users2));

    let handler1 = container.get::<RequestHandler>().unwrap();
    let handler2 = container.get::<RequestHandler>().unwrap();
    assert!(!Arc::ptr_eq(&handler1, &handler2));
    assert_ne!(handler1.scope.id, handler2.scope.id);

    // a fresh transient graph still shares the shared parts
    assert!(Arc::ptr_eq(&handler1.users, &handler2.users));
    assert_eq!(handler1.users.logger.name(), "console");
}

#[test]
fn test_discovery_skips_decorators() {
    let mut container = Container::with_catalog(catalog());
    container.refer_module("facilities");

    // AdvancedFacility comes first in the module but decorates the contract
    assert_eq!(container.get::<dyn Facility>().unwrap().facilitate(), 1);
}

#[test]
fn test_discovery_follows_candidate_order() {
    let mut container = Container::with_catalog(catalog());
    container
        .refer([TypeInfo::of::<FileLogger>(), TypeInfo::of::<ConsoleLogger>()])
        .unwrap();
    assert_eq!(container.get::<dyn Logger>().unwrap().name(), "file");

    let mut container = Container::with_catalog(catalog());
    container
        .refer([TypeInfo::of::<ConsoleLogger>(), TypeInfo::of::<FileLogger>()])
        .unwrap();
    assert_eq!(container.get::<dyn Logger>().unwrap().name(), "console");
}

#[test]
fn test_decorations_compose() {
    let mut container = Container::with_catalog(catalog());
    container.add::<dyn Facility, BasicFacility>().unwrap();

    container
        .decorate::<dyn Facility, AdvancedFacility>()
        .unwrap();
    assert_eq!(container.get::<dyn Facility>().unwrap().facilitate(), 2);

    container
        .decorate_with::<dyn Facility, AdvancedFacility>(AdvancedFacility::new)
        .unwrap();
    assert_eq!(container.get::<dyn Facility>().unwrap().facilitate(), 3);
}

#[test]
fn test_shared_decoration_evaluated_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut container = Container::with_catalog(catalog());
    container.add::<dyn Facility, BasicFacility>().unwrap();
    container
        .decorate_with::<dyn Facility, AdvancedFacility>(move |inner| {
            counter.fetch_add(1, Ordering::SeqCst);
            AdvancedFacility::new(inner)
        })
        .unwrap();

    for _ in 0..5 {
        assert_eq!(container.get::<dyn Facility>().unwrap().facilitate(), 2);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_service_not_found() {
    let container = Container::with_catalog(catalog());

    match container.get::<dyn Logger>() {
        Err(DiError::UnresolvedContract { contract }) => {
            assert!(contract.ends_with("Logger"));
        }
        Err(other) => panic!("Expected UnresolvedContract, got {}", other),
        Ok(_) => panic!("Expected UnresolvedContract"),
    }
}

#[test]
fn test_defer_to_other_container() {
    let mut primary = Container::with_catalog(catalog());
    primary.refer_module("services").refer_module("facilities");
    let primary = Arc::new(primary);

    let mut secondary = Container::with_catalog(catalog());
    secondary.defer(primary.clone());

    let from_secondary = secondary.get::<UserService>().unwrap();
    let from_primary = primary.get::<UserService>().unwrap();
    assert!(Arc::ptr_eq(&from_secondary, &from_primary));
    assert_eq!(from_secondary.facility.facilitate(), 1);
}

#[test]
fn test_local_registration_beats_deferred() {
    let mut primary = Container::with_catalog(catalog());
    primary.add::<dyn Facility, BasicFacility>().unwrap();
    let primary = Arc::new(primary);

    let mut secondary = Container::with_catalog(catalog());
    secondary
        .defer(primary)
        .add::<dyn Facility, BasicFacility>()
        .unwrap()
        .decorate::<dyn Facility, AdvancedFacility>()
        .unwrap();

    assert_eq!(secondary.get::<dyn Facility>().unwrap().facilitate(), 2);
}

#[test]
fn test_deferred_hard_errors_propagate() {
    let mut primary = Container::with_catalog(catalog());
    primary.add::<UserService, UserService>().unwrap();
    let primary = Arc::new(primary);

    let mut secondary = Container::with_catalog(catalog());
    secondary.defer(primary);

    // UserService is found in the primary, but its logger is not
    assert!(matches!(
        secondary.get_maybe::<UserService>(),
        Err(DiError::UnresolvedContract { .. })
    ));
    assert!(secondary.get_maybe::<dyn Logger>().unwrap().is_none());
}

#[test]
fn test_ambiguous_constructor() {
    let mut container = Container::with_catalog(catalog());
    container.add::<Ambiguous, Ambiguous>().unwrap();

    assert!(matches!(
        container.get::<Ambiguous>(),
        Err(DiError::AmbiguousConstructor { count: 2, .. })
    ));
}

#[test]
fn test_shared_capturing_transient_fails() {
    let mut container = Container::with_catalog(catalog());
    container.refer_module("services");
    container.add::<CachedHandler, CachedHandler>().unwrap();

    match container.get::<CachedHandler>() {
        Err(DiError::LifetimeViolation {
            implementation,
            dependency,
            ..
        }) => {
            assert!(implementation.ends_with("CachedHandler"));
            assert!(dependency.ends_with("RequestScope"));
        }
        _ => panic!("Expected LifetimeViolation"),
    }
}

#[test]
fn test_decorator_as_primary_is_a_cycle() {
    let mut container = Container::with_catalog(catalog());
    container.add::<dyn Facility, AdvancedFacility>().unwrap();

    assert!(matches!(
        container.get::<dyn Facility>(),
        Err(DiError::CircularDependency { .. })
    ));
}

proptest! {
    #[test]
    fn prop_decoration_depth(depth in 0usize..12) {
        let mut container = Container::with_catalog(catalog());
        container.add::<dyn Facility, BasicFacility>().unwrap();
        for _ in 0..depth {
            container.decorate::<dyn Facility, AdvancedFacility>().unwrap();
        }

        let first = container.get::<dyn Facility>().unwrap();
        let second = container.get::<dyn Facility>().unwrap();
        prop_assert_eq!(first.facilitate(), depth + 1);
        prop_assert!(Arc::ptr_eq(&first, &second));
    }
}
