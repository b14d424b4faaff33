//! Event extractor
//!
//! Folds the variable bindings of one decoded notification into a
//! [`TrapEvent`]. Both decoders feed this module, so the OID-to-field mapping
//! lives in exactly one place.
//!
//! Bindings carry no ordering guarantee, so every binding is scanned before
//! completeness is decided. When a field is bound more than once, the last
//! binding wins.

use tracing::debug;

use crate::event::{AdminStatus, TrapEvent};
use crate::traits::DecodedTrap;

/// A MIB object known by both its numeric OID and its symbolic path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectIdentity {
    pub numeric: &'static str,
    pub symbolic: &'static str,
}

impl ObjectIdentity {
    /// Exact match, or the identity followed by an instance suffix
    pub fn matches(&self, oid: &str) -> bool {
        let oid = oid.strip_prefix('.').unwrap_or(oid);
        [self.numeric, self.symbolic].into_iter().any(|base| {
            oid.strip_prefix(base)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        })
    }
}

/// IF-MIB::ifDescr
pub const IF_DESCR: ObjectIdentity = ObjectIdentity {
    numeric: "1.3.6.1.2.1.2.2.1.2",
    symbolic: "interfaces.ifTable.ifEntry.ifDescr",
};

/// IF-MIB::ifAdminStatus
pub const IF_ADMIN_STATUS: ObjectIdentity = ObjectIdentity {
    numeric: "1.3.6.1.2.1.2.2.1.7",
    symbolic: "interfaces.ifTable.ifEntry.ifAdminStatus",
};

/// Fold all bindings into an event, resolved or not
pub fn fold_bindings(decoded: &DecodedTrap) -> TrapEvent {
    let mut event = TrapEvent::new(decoded.timestamp.clone(), decoded.host.clone());

    for binding in &decoded.bindings {
        if IF_DESCR.matches(&binding.oid) {
            event.interface = binding.value.clone();
            debug!("[{}] Parsed Interface: {}", event.host, event.interface);
        } else if IF_ADMIN_STATUS.matches(&binding.oid) {
            event.status = AdminStatus::from_value(&binding.value);
            debug!(
                "[{}] Parsed Status: {} (Raw value: {})",
                event.host, event.status, binding.value
            );
        }
    }

    event
}

/// Fold bindings and keep the event only if it is fully resolved
pub fn extract_event(decoded: &DecodedTrap) -> Option<TrapEvent> {
    Some(fold_bindings(decoded)).filter(TrapEvent::is_complete)
}
