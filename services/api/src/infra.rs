use metrics_exporter_prometheus::PrometheusHandle;
use scholarship_eligibility::questionnaire::{
    EligibilityStore, RegistryError, SessionId, SessionRegistry,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local session host; sessions are lost on restart.
#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRegistry {
    sessions: Arc<Mutex<HashMap<SessionId, EligibilityStore>>>,
}

impl InMemorySessionRegistry {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, EligibilityStore>>, RegistryError> {
        self.sessions
            .lock()
            .map_err(|_| RegistryError::Unavailable("session mutex poisoned".to_string()))
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn insert(&self, id: SessionId, store: EligibilityStore) -> Result<(), RegistryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&id) {
            return Err(RegistryError::Conflict);
        }
        guard.insert(id, store);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<EligibilityStore>, RegistryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn update(
        &self,
        id: &SessionId,
        mutate: &mut dyn FnMut(&mut EligibilityStore),
    ) -> Result<EligibilityStore, RegistryError> {
        let mut guard = self.lock()?;
        let store = guard.get_mut(id).ok_or(RegistryError::NotFound)?;
        mutate(store);
        Ok(store.clone())
    }

    fn remove_if(
        &self,
        id: &SessionId,
        claim: &mut dyn FnMut(&EligibilityStore) -> bool,
    ) -> Result<Option<EligibilityStore>, RegistryError> {
        let mut guard = self.lock()?;
        let store = guard.get(id).ok_or(RegistryError::NotFound)?;
        if !claim(store) {
            return Ok(None);
        }
        Ok(guard.remove(id))
    }
}
