// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use tl_core::Descriptor;

struct Slot<D> {
    sid: String,
    snapshot: RwLock<Arc<D>>,
}

/// A live entity: a stable identity whose state is a replaceable snapshot.
///
/// Clones share the same slot, so a handle obtained once keeps observing
/// every later update of that entity. Snapshots are swapped whole; a reader
/// holding an `Arc<D>` never sees a half-applied update.
pub struct Live<D> {
    slot: Arc<Slot<D>>,
}

impl<D> Clone for Live<D> {
    fn clone(&self) -> Self {
        Live {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<D: Descriptor> Live<D> {
    pub(crate) fn new(descriptor: D) -> Self {
        Live {
            slot: Arc::new(Slot {
                sid: descriptor.sid().to_string(),
                snapshot: RwLock::new(Arc::new(descriptor)),
            }),
        }
    }

    /// The entity identifier; fixed for the life of the entity.
    pub fn sid(&self) -> &str {
        &self.slot.sid
    }

    /// The current state.
    pub fn snapshot(&self) -> Arc<D> {
        Arc::clone(&self.slot.snapshot.read())
    }

    /// Returns true if both handles refer to the same entity instance.
    pub fn ptr_eq(&self, other: &Live<D>) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Swaps in a new snapshot and returns the previous one.
    pub(crate) fn replace(&self, descriptor: D) -> Arc<D> {
        std::mem::replace(&mut *self.slot.snapshot.write(), Arc::new(descriptor))
    }
}

impl<D: Descriptor> fmt::Debug for Live<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Live")
            .field("kind", &D::KIND)
            .field("sid", &self.slot.sid)
            .field("snapshot", &*self.snapshot())
            .finish()
    }
}
