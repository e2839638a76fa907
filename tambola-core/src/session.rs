use crate::config::TambolaConfig;
use crate::document::{self, StoreHandle};
use crate::error::Result;
use crate::lobby::{LobbyCoordinator, PlayerName};
use crate::marks::{MarkEditor, Surface};
use crate::storage::{LocalStorage, SqliteLocalStorage, Storage};
use std::sync::Arc;

/// Everything one user session owns: identity, storage handles, the mark
/// editor and the lobby coordinator.
pub struct Session<S: Surface> {
    identity: PlayerName,
    local: Arc<dyn LocalStorage>,
    store: StoreHandle,
    marks: MarkEditor<S>,
    lobby: LobbyCoordinator,
}

impl<S: Surface> Session<S> {
    /// Opens local storage and connects the game store. A store that fails to
    /// connect leaves the handle pending; marking still works without it.
    pub async fn init(
        config: &TambolaConfig,
        surface: S,
        identity: Option<PlayerName>,
    ) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::new(&config.local_db_path()).await?);
        let local: Arc<dyn LocalStorage> = Arc::new(SqliteLocalStorage::new(storage));
        let identity = identity.unwrap_or_else(PlayerName::random);

        let store = StoreHandle::pending();
        match document::connect(&config.store).await {
            Ok(connected) => store.install(connected),
            Err(e) => tracing::warn!("Game store unavailable: {}", e),
        }

        tracing::info!("Session started as {}", identity);
        Ok(Self::with_parts(identity, local, store, surface))
    }

    pub fn with_parts(
        identity: PlayerName,
        local: Arc<dyn LocalStorage>,
        store: StoreHandle,
        surface: S,
    ) -> Self {
        Self {
            marks: MarkEditor::new(local.clone(), surface),
            lobby: LobbyCoordinator::new(store.clone(), identity.clone()),
            identity,
            local,
            store,
        }
    }

    pub fn identity(&self) -> &PlayerName {
        &self.identity
    }

    pub fn local_storage(&self) -> &Arc<dyn LocalStorage> {
        &self.local
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn marks(&self) -> &MarkEditor<S> {
        &self.marks
    }

    pub fn marks_mut(&mut self) -> &mut MarkEditor<S> {
        &mut self.marks
    }

    pub fn lobby(&self) -> &LobbyCoordinator {
        &self.lobby
    }

    pub fn lobby_mut(&mut self) -> &mut LobbyCoordinator {
        &mut self.lobby
    }

    /// Releases the lobby subscription.
    pub fn teardown(&mut self) {
        self.lobby.teardown();
        tracing::debug!("Session for {} torn down", self.identity);
    }
}
