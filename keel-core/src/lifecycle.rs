//! Native lifecycles: how long a resolved instance lives and who owns it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// New instance on every resolution. Owned by the nested container that resolved it.
    #[default]
    PerRequest,
    /// One instance per nested container; the root container acts as its own scope.
    PerNestedScope,
    /// One instance for the root container and every scope below it. Owned by the root.
    PerContainer,
}

impl Lifecycle {
    pub fn is_cached(&self) -> bool {
        !matches!(self, Lifecycle::PerRequest)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::PerRequest => write!(f, "PerRequest"),
            Lifecycle::PerNestedScope => write!(f, "PerNestedScope"),
            Lifecycle::PerContainer => write!(f, "PerContainer"),
        }
    }
}
