use serde::{Deserialize, Serialize};

use super::store::EligibilityStore;

/// Identifier wrapper for questionnaire sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Holds live sessions so the service can be exercised without a server.
///
/// `update` must run `mutate` and store the result as one step, so concurrent
/// requests against the same session apply one after the other. `remove_if`
/// must check `claim` and remove the session under the same lock, so only one
/// caller can take a session out of the registry.
pub trait SessionRegistry: Send + Sync {
    fn insert(&self, id: SessionId, store: EligibilityStore) -> Result<(), RegistryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<EligibilityStore>, RegistryError>;
    fn update(
        &self,
        id: &SessionId,
        mutate: &mut dyn FnMut(&mut EligibilityStore),
    ) -> Result<EligibilityStore, RegistryError>;
    /// Removes the session when `claim` accepts it. `Ok(None)` means it was left in place.
    fn remove_if(
        &self,
        id: &SessionId,
        claim: &mut dyn FnMut(&EligibilityStore) -> bool,
    ) -> Result<Option<EligibilityStore>, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("session registry unavailable: {0}")]
    Unavailable(String),
}
