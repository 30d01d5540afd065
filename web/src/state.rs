//! Application state shared by every handler.
//!
//! Each browser session owns one [`PortalStore`]; the registry maps session
//! ids to stores. Stores share the environment (resolver, bus, clock) but
//! never state.

use crate::help::HelpProvider;
use franc_portal_core::event_bus::EventBus;
use franc_portal_forms::{PortalAction, PortalEnvironment, PortalReducer, PortalState};
use franc_portal_runtime::Store;
use franc_portal_runtime::metrics::PortalMetrics;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Store driving one form session.
pub type PortalStore = Store<PortalState, PortalAction, PortalEnvironment, PortalReducer>;

/// Session lookup failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// No session with this id
    #[error("session {0} not found")]
    NotFound(Uuid),

    /// The session was closed while the request was running
    #[error("session {0} is closed")]
    Closed(Uuid),
}

/// Open sessions by id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<PortalStore>>>>,
}

impl SessionRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session with no form open
    pub async fn create(&self, environment: PortalEnvironment) -> Uuid {
        let id = Uuid::new_v4();
        let store = Store::new(PortalState::default(), PortalReducer::new(), environment);
        self.sessions.write().await.insert(id, Arc::new(store));
        tracing::info!(session_id = %id, "session created");
        id
    }

    /// Store of session `id`
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] for unknown ids.
    pub async fn get(&self, id: Uuid) -> Result<Arc<PortalStore>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    /// Close session `id`; in-flight requests on it finish but new ones fail
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] for unknown ids.
    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        let store = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        store.shutdown();
        tracing::info!(session_id = %id, "session closed");
        Ok(())
    }

    /// Number of open sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is open
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Open form sessions
    pub sessions: SessionRegistry,
    /// Template every new session's store is built from
    pub environment: PortalEnvironment,
    /// Help markdown
    pub help: Arc<HelpProvider>,
    /// Rendered on `/metrics`; absent when no recorder is installed
    pub metrics: Option<PortalMetrics>,
}

impl AppState {
    /// State with no sessions and no metrics recorder.
    #[must_use]
    pub fn new(environment: PortalEnvironment, help: HelpProvider) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            environment,
            help: Arc::new(help),
            metrics: None,
        }
    }

    /// Serve `metrics` on `/metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: PortalMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The bus every session publishes to
    #[must_use]
    pub fn event_bus(&self) -> &Arc<dyn EventBus> {
        &self.environment.event_bus
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.environment)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use franc_portal_forms::OptionResolver;
    use franc_portal_forms::options::DEFAULT_LOOKUP_TIMEOUT;
    use franc_portal_runtime::StoreError;
    use franc_portal_testing::mocks::{InMemoryEventBus, RecordingBranchManager, StaticOptionSource};
    use franc_portal_testing::test_clock;

    fn environment() -> PortalEnvironment {
        PortalEnvironment::new(
            OptionResolver::new(Arc::new(StaticOptionSource::populated()), DEFAULT_LOOKUP_TIMEOUT),
            Arc::new(InMemoryEventBus::new()),
            Arc::new(RecordingBranchManager::new()),
            Arc::new(test_clock()),
        )
    }

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let registry = SessionRegistry::new();
        let a = registry.create(environment()).await;
        let b = registry.create(environment()).await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);

        registry
            .get(a)
            .await
            .unwrap()
            .send(PortalAction::SetInterfaceCount { count: 2 })
            .await
            .unwrap();
        let untouched = registry.get(b).await.unwrap().state(|s| s.input_error.clone()).await;
        assert!(untouched.is_none());
    }

    #[tokio::test]
    async fn removed_sessions_refuse_work() {
        let registry = SessionRegistry::new();
        let id = registry.create(environment()).await;
        let store = registry.get(id).await.unwrap();

        registry.remove(id).await.unwrap();

        assert_eq!(registry.get(id).await.unwrap_err(), SessionError::NotFound(id));
        assert_eq!(registry.remove(id).await.unwrap_err(), SessionError::NotFound(id));
        assert_eq!(
            store.send(PortalAction::CloseService).await.unwrap_err(),
            StoreError::ShutdownInProgress
        );
        assert!(registry.is_empty().await);
    }
}
