use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::questionnaire::registry::{RegistryError, SessionId, SessionRegistry};
use crate::questionnaire::{
    session_router, EligibilityCatalog, EligibilitySessionService, EligibilityStore,
};

pub(super) const SAMPLE_DOCUMENT: &str = include_str!("../../../../../data/eligibility.json");

pub(super) const RUTHERFORD: &str = "SCH_RUTHERFORD";
pub(super) const JASON_LANG: &str = "SCH_JASON_LANG";
pub(super) const MCKINNEY: &str = "SCH_MCKINNEY";
pub(super) const GRADUATE: &str = "SCH_GRADUATE";
pub(super) const INDIGENOUS: &str = "SCH_INDIGENOUS";

pub(super) fn catalog() -> Arc<EligibilityCatalog> {
    Arc::new(EligibilityCatalog::from_json(SAMPLE_DOCUMENT).expect("sample catalog loads"))
}

pub(super) fn store() -> EligibilityStore {
    EligibilityStore::new(catalog())
}

pub(super) fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Residency cleared, entering post-secondary, full time, Indigenous.
pub(super) fn answer_high_school_path(store: &mut EligibilityStore) {
    store.answer("Q1", "yes", None);
    store.answer("Q2", "yes", None);
    store.answer("Q3", "high_school_graduate", None);
    store.answer("Q5", "full_time", None);
    store.answer("Q6", vec!["indigenous"], None);
}

#[derive(Default)]
pub(super) struct MemorySessions {
    pub(super) sessions: Mutex<HashMap<SessionId, EligibilityStore>>,
}

impl MemorySessions {
    pub(super) fn len(&self) -> usize {
        self.sessions.lock().expect("sessions mutex poisoned").len()
    }
}

impl SessionRegistry for MemorySessions {
    fn insert(&self, id: SessionId, store: EligibilityStore) -> Result<(), RegistryError> {
        let mut guard = self.sessions.lock().expect("sessions mutex poisoned");
        if guard.contains_key(&id) {
            return Err(RegistryError::Conflict);
        }
        guard.insert(id, store);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<EligibilityStore>, RegistryError> {
        let guard = self.sessions.lock().expect("sessions mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(
        &self,
        id: &SessionId,
        mutate: &mut dyn FnMut(&mut EligibilityStore),
    ) -> Result<EligibilityStore, RegistryError> {
        let mut guard = self.sessions.lock().expect("sessions mutex poisoned");
        let store = guard.get_mut(id).ok_or(RegistryError::NotFound)?;
        mutate(store);
        Ok(store.clone())
    }

    fn remove_if(
        &self,
        id: &SessionId,
        claim: &mut dyn FnMut(&EligibilityStore) -> bool,
    ) -> Result<Option<EligibilityStore>, RegistryError> {
        let mut guard = self.sessions.lock().expect("sessions mutex poisoned");
        let store = guard.get(id).ok_or(RegistryError::NotFound)?;
        if !claim(store) {
            return Ok(None);
        }
        Ok(guard.remove(id))
    }
}

pub(super) struct UnavailableSessions;

impl SessionRegistry for UnavailableSessions {
    fn insert(&self, _id: SessionId, _store: EligibilityStore) -> Result<(), RegistryError> {
        Err(RegistryError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<EligibilityStore>, RegistryError> {
        Err(RegistryError::Unavailable("store offline".to_string()))
    }

    fn update(
        &self,
        _id: &SessionId,
        _mutate: &mut dyn FnMut(&mut EligibilityStore),
    ) -> Result<EligibilityStore, RegistryError> {
        Err(RegistryError::Unavailable("store offline".to_string()))
    }

    fn remove_if(
        &self,
        _id: &SessionId,
        _claim: &mut dyn FnMut(&EligibilityStore) -> bool,
    ) -> Result<Option<EligibilityStore>, RegistryError> {
        Err(RegistryError::Unavailable("store offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    EligibilitySessionService<MemorySessions>,
    Arc<MemorySessions>,
) {
    let sessions = Arc::new(MemorySessions::default());
    let service = EligibilitySessionService::new(catalog(), sessions.clone());
    (service, sessions)
}

pub(super) fn router_with_service(
    service: EligibilitySessionService<MemorySessions>,
) -> axum::Router {
    session_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
