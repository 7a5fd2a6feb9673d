//! Sink ownership ledger
//!
//! Records which binding currently owns each sink. All bindings that may
//! exchange sinks share one ledger; this is what lets `add_sink` notice a
//! sink is owned elsewhere and detach it first.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::sink::SinkId;

use super::stream::StreamBinding;
use super::BindingId;

struct Owner {
    binding: BindingId,
    handle: Weak<StreamBinding>,
}

/// Shared sink -> owning binding table
#[derive(Default)]
pub struct SinkLedger {
    owners: Mutex<HashMap<SinkId, Owner>>,
}

impl SinkLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the binding owning `sink`
    pub fn owner_of(&self, sink: SinkId) -> Option<BindingId> {
        self.owners.lock().get(&sink).map(|owner| owner.binding)
    }

    /// Owning binding of `sink`, if it is still alive
    pub(crate) fn owner_binding(&self, sink: SinkId) -> Option<(BindingId, Option<Arc<StreamBinding>>)> {
        self.owners
            .lock()
            .get(&sink)
            .map(|owner| (owner.binding, owner.handle.upgrade()))
    }

    /// Record `binding` as the owner of `sink`, returning the previous owner
    pub(crate) fn claim(
        &self,
        sink: SinkId,
        binding: BindingId,
        handle: Weak<StreamBinding>,
    ) -> Option<BindingId> {
        self.owners
            .lock()
            .insert(sink, Owner { binding, handle })
            .map(|previous| previous.binding)
    }

    /// Forget `sink` if `binding` owns it
    pub(crate) fn release(&self, sink: SinkId, binding: BindingId) -> bool {
        let mut owners = self.owners.lock();
        match owners.get(&sink) {
            Some(owner) if owner.binding == binding => {
                owners.remove(&sink);
                true
            }
            _ => false,
        }
    }

    /// Number of owned sinks
    pub fn len(&self) -> usize {
        self.owners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.lock().is_empty()
    }
}

impl std::fmt::Debug for SinkLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkLedger").field("owned", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_and_release() {
        let ledger = SinkLedger::new();
        let sink = SinkId::new(7);
        let a = BindingId::next();
        let b = BindingId::next();

        assert_eq!(ledger.claim(sink, a, Weak::new()), None);
        assert_eq!(ledger.owner_of(sink), Some(a));

        // Only the owner can release
        assert!(!ledger.release(sink, b));
        assert_eq!(ledger.claim(sink, b, Weak::new()), Some(a));
        assert!(ledger.release(sink, b));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_dead_owner() {
        let ledger = SinkLedger::new();
        let sink = SinkId::new(1);
        let a = BindingId::next();

        ledger.claim(sink, a, Weak::new());
        let (owner, handle) = ledger.owner_binding(sink).unwrap();

        assert_eq!(owner, a);
        assert!(handle.is_none());
    }
}
