//! Bulk-load sessions.
//!
//! While a session is active, handlers may compute a whole class at once
//! and keep the results as shadow data. Handlers that do so register with
//! the session; deactivating tells every participant, in registration
//! order, to fall back to per-object loading and then clears the roster.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::error::VirtualResult;
use crate::handler::VirtualPropertyHandler;

#[derive(Default)]
struct SessionState {
    active: bool,
    participants: Vec<Arc<dyn VirtualPropertyHandler>>,
}

/// Session flag plus the handlers that opted in while it was set.
#[derive(Default)]
pub struct BulkLoadSession {
    state: Mutex<SessionState>,
}

impl BulkLoadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self) {
        let mut state = self.state.lock().expect("bulk session lock poisoned");
        if !state.active {
            debug!("bulk load session activated");
        }
        state.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().expect("bulk session lock poisoned").active
    }

    /// Add a participant. Returns `false` if the session is inactive or the
    /// handler is already registered.
    pub fn register(&self, handler: Arc<dyn VirtualPropertyHandler>) -> bool {
        let mut state = self.state.lock().expect("bulk session lock poisoned");
        if !state.active || state.participants.iter().any(|h| same(h, &handler)) {
            return false;
        }
        debug!(tag = %handler.tag(), "handler joined bulk load session");
        state.participants.push(handler);
        true
    }

    pub fn deregister(&self, handler: &Arc<dyn VirtualPropertyHandler>) -> bool {
        let mut state = self.state.lock().expect("bulk session lock poisoned");
        let before = state.participants.len();
        state.participants.retain(|h| !same(h, handler));
        state.participants.len() != before
    }

    pub fn is_registered(&self, handler: &Arc<dyn VirtualPropertyHandler>) -> bool {
        self.state
            .lock()
            .expect("bulk session lock poisoned")
            .participants
            .iter()
            .any(|h| same(h, handler))
    }

    pub fn participant_count(&self) -> usize {
        self.state
            .lock()
            .expect("bulk session lock poisoned")
            .participants
            .len()
    }

    /// End the session. Every participant is told to stop whole-class
    /// loading, even if an earlier one fails; the first failure is returned.
    pub fn deactivate(&self) -> VirtualResult<()> {
        let participants = {
            let mut state = self.state.lock().expect("bulk session lock poisoned");
            state.active = false;
            std::mem::take(&mut state.participants)
        };
        debug!(participants = participants.len(), "bulk load session deactivated");
        let mut first_error = None;
        for handler in participants {
            if let Err(e) = handler.set_load_for_all_of_class(false) {
                warn!(tag = %handler.tag(), error = %e, "participant failed to leave bulk mode");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn same(a: &Arc<dyn VirtualPropertyHandler>, b: &Arc<dyn VirtualPropertyHandler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl std::fmt::Debug for BulkLoadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("bulk session lock poisoned");
        f.debug_struct("BulkLoadSession")
            .field("active", &state.active)
            .field("participants", &state.participants.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use lexo_types::{FieldKind, FieldTag, ObjectId};

    use super::*;
    use crate::descriptor::VirtualPropertyDescriptor;
    use crate::error::VirtualError;
    use crate::fixture::empty_store;
    use crate::handler::HandlerBase;

    struct Probe {
        base: HandlerBase,
        name: &'static str,
        log: Arc<StdMutex<Vec<String>>>,
        fail: bool,
    }

    impl VirtualPropertyHandler for Probe {
        fn base(&self) -> &HandlerBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut HandlerBase {
            &mut self.base
        }
        fn load(&self, _id: ObjectId) -> VirtualResult<()> {
            Ok(())
        }
        fn set_load_for_all_of_class(&self, all: bool) -> VirtualResult<()> {
            self.log.lock().unwrap().push(format!("{}:{all}", self.name));
            if self.fail {
                return Err(VirtualError::NotInstalled(FieldTag(1)));
            }
            Ok(())
        }
    }

    fn probe(name: &'static str, log: &Arc<StdMutex<Vec<String>>>, fail: bool) -> Arc<dyn VirtualPropertyHandler> {
        let mut d = VirtualPropertyDescriptor::new("LexEntry", name, FieldKind::Integer);
        d.set_tag(FieldTag(2501));
        Arc::new(Probe {
            base: HandlerBase::new(d, empty_store()),
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    #[test]
    fn inactive_session_rejects_participants() {
        let log = Arc::default();
        let session = BulkLoadSession::new();
        assert!(!session.register(probe("a", &log, false)));
        assert_eq!(session.participant_count(), 0);
    }

    #[test]
    fn deactivate_notifies_in_order_and_clears() {
        let log = Arc::default();
        let session = BulkLoadSession::new();
        session.activate();
        let a = probe("a", &log, false);
        let b = probe("b", &log, false);
        assert!(session.register(a.clone()));
        assert!(session.register(b.clone()));
        assert!(!session.register(a.clone()));
        assert!(session.is_registered(&b));

        session.deactivate().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a:false", "b:false"]);
        assert!(!session.is_active());
        assert_eq!(session.participant_count(), 0);
    }

    #[test]
    fn deregistered_handler_is_not_notified() {
        let log = Arc::default();
        let session = BulkLoadSession::new();
        session.activate();
        let a = probe("a", &log, false);
        session.register(a.clone());
        assert!(session.deregister(&a));
        assert!(!session.deregister(&a));
        session.deactivate().unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn failure_does_not_stop_notification() {
        let log = Arc::default();
        let session = BulkLoadSession::new();
        session.activate();
        session.register(probe("a", &log, true));
        session.register(probe("b", &log, false));
        assert!(session.deactivate().is_err());
        assert_eq!(*log.lock().unwrap(), vec!["a:false", "b:false"]);
    }
}
