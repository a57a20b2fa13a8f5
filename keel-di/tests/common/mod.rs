#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use keel_di::{injectable, Dispose, DisposeError, Injectable};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

pub trait Tracked: Send + Sync {
    fn id(&self) -> usize;
    fn is_disposed(&self) -> bool;
}

pub trait FakeService: Tracked {}
pub trait FakeScopedService: Tracked {}
pub trait FakeSingletonService: Tracked {}
pub trait FakeServiceInstance: Tracked {}

/// Implements every fake service; records its own disposal.
pub struct Fake {
    id: usize,
    disposed: AtomicBool,
}

#[injectable(
    provides(dyn FakeService, dyn FakeScopedService, dyn FakeSingletonService),
    dispose
)]
impl Fake {
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            disposed: AtomicBool::new(false),
        }
    }
}

impl Tracked for Fake {
    fn id(&self) -> usize {
        self.id
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl FakeService for Fake {}
impl FakeScopedService for Fake {}
impl FakeSingletonService for Fake {}

impl Dispose for Fake {
    fn dispose(&self) -> Result<(), DisposeError> {
        self.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub trait Clock: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Injectable)]
#[keel(provides(dyn Clock))]
pub struct SystemClock;

impl Clock for SystemClock {
    fn name(&self) -> &'static str {
        "system"
    }
}

/// Never registered.
pub trait Audit: Send + Sync {}

pub fn same<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
