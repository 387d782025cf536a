//! Type-safe identifier wrappers around [`Uuid`], plus the session-scoped
//! [`IdAllocator`] that mints them.
//!
//! Every entity in the simulation has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. IDs are never minted
//! from global state: each run owns an allocator, so a test can inject
//! [`SequentialIds`] and get the same identifiers on every execution while
//! production uses [`UuidV7Ids`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a new identifier from the given allocator.
            pub fn allocate(ids: &dyn IdAllocator) -> Self {
                Self(ids.next_uuid())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an agent in the simulated population.
    AgentId
}

define_id! {
    /// Unique identifier for one experiment (an ordered set of conditions).
    ExperimentId
}

define_id! {
    /// Unique identifier for one condition run inside an experiment.
    ConditionId
}

define_id! {
    /// Unique identifier for an interaction log entry.
    LogEntryId
}

/// A source of fresh UUIDs, scoped to one session or run.
pub trait IdAllocator: Send + Sync {
    /// Produce the next identifier.
    fn next_uuid(&self) -> Uuid;
}

/// Production allocator: time-ordered UUID v7 values.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Ids;

impl IdAllocator for UuidV7Ids {
    fn next_uuid(&self) -> Uuid {
        Uuid::now_v7()
    }
}

/// Deterministic allocator yielding `1, 2, 3, ...` encoded as UUIDs.
///
/// Two allocators created with the same `start` produce identical
/// sequences, which makes seeded runs reproducible end to end.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    /// Create an allocator whose first identifier is `start`.
    pub const fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdAllocator for SequentialIds {
    fn next_uuid(&self) -> Uuid {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Uuid::from_u128(u128::from(n))
    }
}
