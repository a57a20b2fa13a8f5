//! Host service lifetimes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host service lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceLifetime {
    /// A new instance for every resolution.
    Transient,
    /// One instance per scope.
    Scoped,
    /// One instance for the root provider and every scope created from it.
    Singleton,
}

impl fmt::Display for ServiceLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceLifetime::Transient => "transient",
            ServiceLifetime::Scoped => "scoped",
            ServiceLifetime::Singleton => "singleton",
        })
    }
}
