//! Lobby coordinator: hosts or joins a shared game record and keeps a live
//! roster.
//!
//! ```text
//! Idle ──host──▶ Hosting ──▶ InLobby (host) ──start──▶ Started
//!   └──begin_join──▶ Joining ──submit_join──▶ InLobby
//! ```

pub mod code;

pub use code::{GameCode, PlayerName, GAME_CODE_LEN};

use crate::document::{DocumentStore, StoreHandle, Subscription};
use crate::error::{Result, TambolaError};
use crate::types::Game;
use serde_json::Value;

pub const GAMES_COLLECTION: &str = "games";
pub const PLAYERS_FIELD: &str = "players";
pub const STARTED_FIELD: &str = "started";

pub const WAITING_MESSAGE: &str = "Waiting for host to start the game...";
pub const STARTED_MESSAGE: &str = "Game started!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyPhase {
    Idle,
    Hosting,
    Joining,
    InLobby,
    Started,
}

/// What the lobby screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyView {
    pub title: String,
    pub players: Vec<String>,
    pub show_start: bool,
    pub waiting_message: Option<String>,
}

impl LobbyView {
    fn entered(code: &GameCode, is_host: bool) -> Self {
        Self {
            title: if is_host {
                format!("Game Code: {}", code)
            } else {
                format!("Joined Game: {}", code)
            },
            players: Vec::new(),
            show_start: is_host,
            waiting_message: (!is_host).then(|| WAITING_MESSAGE.to_string()),
        }
    }
}

pub struct LobbyCoordinator {
    store: StoreHandle,
    identity: PlayerName,
    phase: LobbyPhase,
    code: Option<GameCode>,
    is_host: bool,
    subscription: Option<Subscription>,
    view: LobbyView,
}

impl LobbyCoordinator {
    pub fn new(store: StoreHandle, identity: PlayerName) -> Self {
        Self {
            store,
            identity,
            phase: LobbyPhase::Idle,
            code: None,
            is_host: false,
            subscription: None,
            view: LobbyView::default(),
        }
    }

    pub fn phase(&self) -> LobbyPhase {
        self.phase
    }

    pub fn code(&self) -> Option<&GameCode> {
        self.code.as_ref()
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn identity(&self) -> &PlayerName {
        &self.identity
    }

    pub fn view(&self) -> &LobbyView {
        &self.view
    }

    fn ensure_outside_lobby(&self) -> Result<()> {
        match self.phase {
            LobbyPhase::Idle | LobbyPhase::Joining => Ok(()),
            phase => Err(TambolaError::invalid_state(format!(
                "already in a lobby ({:?}); leave it first",
                phase
            ))),
        }
    }

    /// Creates a new game with this player as host and enters its lobby.
    /// An existing game with the same code is overwritten.
    pub async fn host(&mut self) -> Result<GameCode> {
        self.ensure_outside_lobby()?;
        let store = self.store.get()?;
        let previous = self.phase;

        self.phase = LobbyPhase::Hosting;
        let code = GameCode::generate();
        let game = Game::new(code.clone(), self.identity.as_str());

        let created = match game.to_document() {
            Ok(document) => {
                store
                    .create_or_replace(GAMES_COLLECTION, code.as_str(), document)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = created {
            tracing::warn!("Failed to create game {}: {}", code, e);
            self.phase = previous;
            return Err(e);
        }

        self.enter_lobby(store.as_ref(), code.clone(), true, previous)
            .await?;
        tracing::info!("{} is hosting game {}", self.identity, code);
        Ok(code)
    }

    /// Opens code entry.
    pub fn begin_join(&mut self) -> Result<()> {
        self.ensure_outside_lobby()?;
        self.phase = LobbyPhase::Joining;
        Ok(())
    }

    /// Joins the game named by `input`. Blank input does nothing. An unknown
    /// code leaves the coordinator in `Joining`.
    pub async fn submit_join(&mut self, input: &str) -> Result<Option<GameCode>> {
        if self.phase != LobbyPhase::Joining {
            return Err(TambolaError::invalid_state("join code entry is not open"));
        }
        let Some(code) = GameCode::normalize(input) else {
            return Ok(None);
        };
        let store = self.store.get()?;

        if store.get(GAMES_COLLECTION, code.as_str()).await?.is_none() {
            tracing::warn!("No game with code {}", code);
            return Err(TambolaError::game_not_found(code.as_str()));
        }

        let name = Value::String(self.identity.as_str().to_string());
        match store
            .append_unique(GAMES_COLLECTION, code.as_str(), PLAYERS_FIELD, name)
            .await
        {
            Ok(()) => {}
            Err(TambolaError::DocumentNotFound { .. }) => {
                return Err(TambolaError::game_not_found(code.as_str()));
            }
            Err(e) => return Err(e),
        }

        self.enter_lobby(store.as_ref(), code.clone(), false, LobbyPhase::Joining)
            .await?;
        tracing::info!("{} joined game {}", self.identity, code);
        Ok(Some(code))
    }

    async fn enter_lobby(
        &mut self,
        store: &dyn DocumentStore,
        code: GameCode,
        is_host: bool,
        fallback: LobbyPhase,
    ) -> Result<()> {
        let subscription = match store.subscribe(GAMES_COLLECTION, code.as_str()).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.phase = fallback;
                return Err(e);
            }
        };

        self.view = LobbyView::entered(&code, is_host);
        self.subscription = Some(subscription);
        self.code = Some(code);
        self.is_host = is_host;
        self.phase = LobbyPhase::InLobby;
        Ok(())
    }

    /// Flags the game as started. Host only.
    pub async fn start(&mut self) -> Result<()> {
        if !matches!(self.phase, LobbyPhase::InLobby | LobbyPhase::Started) {
            return Err(TambolaError::invalid_state("not in a lobby"));
        }
        if !self.is_host {
            return Err(TambolaError::NotHost);
        }
        let code = self
            .code
            .clone()
            .ok_or_else(|| TambolaError::internal("lobby has no game code"))?;
        let store = self.store.get()?;

        store
            .set_field(GAMES_COLLECTION, code.as_str(), STARTED_FIELD, Value::Bool(true))
            .await?;

        self.phase = LobbyPhase::Started;
        tracing::info!("Game {} started", code);
        Ok(())
    }

    /// Waits for the next change to the game record and applies it.
    /// Returns `None` when the subscription has ended.
    pub async fn next_update(&mut self) -> Result<Option<&LobbyView>> {
        let subscription = self
            .subscription
            .as_mut()
            .ok_or_else(|| TambolaError::invalid_state("not in a lobby"))?;

        let Some(document) = subscription.next().await else {
            return Ok(None);
        };
        let code = self
            .code
            .clone()
            .ok_or_else(|| TambolaError::internal("lobby has no game code"))?;

        let game = Game::from_document(code, document)?;
        self.apply_snapshot(&game);
        Ok(Some(&self.view))
    }

    /// Replaces the roster with the record's current players.
    pub fn apply_snapshot(&mut self, game: &Game) {
        self.view.players = game.players.clone();

        if game.started && !self.is_host {
            self.view.waiting_message = Some(STARTED_MESSAGE.to_string());
        }

        tracing::debug!(
            "Game {} roster: {} players, started={}",
            game.code,
            game.players.len(),
            game.started
        );
    }

    /// Leaves the lobby and stops listening for changes.
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            tracing::info!("Left game {:?}", self.code.as_ref().map(GameCode::as_str));
        }

        self.phase = LobbyPhase::Idle;
        self.code = None;
        self.is_host = false;
        self.view = LobbyView::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocumentStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn coordinator(store: &StoreHandle, name: &str) -> LobbyCoordinator {
        LobbyCoordinator::new(store.clone(), PlayerName::new(name))
    }

    fn memory_store() -> StoreHandle {
        StoreHandle::ready(Arc::new(MemoryDocumentStore::new()))
    }

    async fn next_view(lobby: &mut LobbyCoordinator) -> LobbyView {
        tokio::time::timeout(Duration::from_secs(1), lobby.next_update())
            .await
            .unwrap()
            .unwrap()
            .unwrap()
            .clone()
    }

    async fn stored_game(store: &StoreHandle, code: &GameCode) -> Game {
        let document = store
            .get()
            .unwrap()
            .get(GAMES_COLLECTION, code.as_str())
            .await
            .unwrap()
            .unwrap();
        Game::from_document(code.clone(), document).unwrap()
    }

    #[tokio::test]
    async fn test_host_creates_game_record() {
        let store = memory_store();
        let mut host = coordinator(&store, "Player1234");

        let code = host.host().await.unwrap();
        assert_eq!(code.as_str().len(), GAME_CODE_LEN);
        assert_eq!(host.phase(), LobbyPhase::InLobby);
        assert!(host.is_host());

        let game = stored_game(&store, &code).await;
        assert_eq!(game.host, "Player1234");
        assert_eq!(game.players, vec!["Player1234".to_string()]);
        assert!(!game.started);

        let view = next_view(&mut host).await;
        assert_eq!(view.title, format!("Game Code: {}", code));
        assert_eq!(view.players, vec!["Player1234".to_string()]);
        assert!(view.show_start);
        assert_eq!(view.waiting_message, None);
    }

    #[tokio::test]
    async fn test_join_unknown_code_stays_joining() {
        let store = memory_store();
        let mut guest = coordinator(&store, "Player1");

        guest.begin_join().unwrap();
        let result = guest.submit_join("ZZZZZZ").await;

        assert!(matches!(result, Err(TambolaError::GameNotFound { code }) if code == "ZZZZZZ"));
        assert_eq!(guest.phase(), LobbyPhase::Joining);
        assert!(guest.code().is_none());
    }

    #[tokio::test]
    async fn test_blank_join_is_ignored() {
        let store = memory_store();
        let mut guest = coordinator(&store, "Player1");

        guest.begin_join().unwrap();
        assert_eq!(guest.submit_join("   ").await.unwrap(), None);
        assert_eq!(guest.phase(), LobbyPhase::Joining);
    }

    #[tokio::test]
    async fn test_submit_without_code_entry_is_rejected() {
        let store = memory_store();
        let mut guest = coordinator(&store, "Player1");

        let result = guest.submit_join("ABCDEF").await;
        assert!(matches!(result, Err(TambolaError::InvalidState(_))));
        assert_eq!(guest.phase(), LobbyPhase::Idle);
    }

    #[tokio::test]
    async fn test_join_normalizes_code_and_updates_roster() {
        let store = memory_store();
        let mut host = coordinator(&store, "Host");
        let code = host.host().await.unwrap();
        next_view(&mut host).await;

        let mut guest = coordinator(&store, "Guest");
        guest.begin_join().unwrap();
        let typed = format!("  {}  ", code.as_str().to_lowercase());
        assert_eq!(guest.submit_join(&typed).await.unwrap(), Some(code.clone()));
        assert_eq!(guest.phase(), LobbyPhase::InLobby);
        assert!(!guest.is_host());

        let guest_view = next_view(&mut guest).await;
        assert_eq!(guest_view.title, format!("Joined Game: {}", code));
        assert!(!guest_view.show_start);
        assert_eq!(guest_view.waiting_message.as_deref(), Some(WAITING_MESSAGE));
        assert_eq!(guest_view.players, vec!["Host".to_string(), "Guest".to_string()]);

        let host_view = next_view(&mut host).await;
        assert_eq!(host_view.players, vec!["Host".to_string(), "Guest".to_string()]);
    }

    #[tokio::test]
    async fn test_rejoin_with_same_name_does_not_duplicate() {
        let store = memory_store();
        let mut host = coordinator(&store, "Host");
        let code = host.host().await.unwrap();

        for _ in 0..2 {
            let mut guest = coordinator(&store, "Twin");
            guest.begin_join().unwrap();
            guest.submit_join(code.as_str()).await.unwrap();
        }

        let game = stored_game(&store, &code).await;
        assert_eq!(game.players, vec!["Host".to_string(), "Twin".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_joins_keep_both_players() {
        let store = memory_store();
        let mut host = coordinator(&store, "Host");
        let code = host.host().await.unwrap();

        let mut alice = coordinator(&store, "Alice");
        let mut bob = coordinator(&store, "Bob");
        alice.begin_join().unwrap();
        bob.begin_join().unwrap();

        let (a, b) = tokio::join!(
            alice.submit_join(code.as_str()),
            bob.submit_join(code.as_str())
        );
        a.unwrap();
        b.unwrap();

        let game = stored_game(&store, &code).await;
        assert_eq!(game.players.len(), 3);
        assert!(game.players.contains(&"Alice".to_string()));
        assert!(game.players.contains(&"Bob".to_string()));
    }

    #[tokio::test]
    async fn test_start_notifies_guests() {
        let store = memory_store();
        let mut host = coordinator(&store, "Host");
        let code = host.host().await.unwrap();

        let mut guest = coordinator(&store, "Guest");
        guest.begin_join().unwrap();
        guest.submit_join(code.as_str()).await.unwrap();
        next_view(&mut guest).await;

        assert!(matches!(guest.start().await, Err(TambolaError::NotHost)));

        host.start().await.unwrap();
        assert_eq!(host.phase(), LobbyPhase::Started);
        assert!(stored_game(&store, &code).await.started);

        let guest_view = next_view(&mut guest).await;
        assert_eq!(guest_view.waiting_message.as_deref(), Some(STARTED_MESSAGE));
        assert_eq!(guest.phase(), LobbyPhase::InLobby);

        // the host's own view does not change screens
        let host_view = next_view(&mut host).await;
        assert!(host_view.show_start);
        assert_eq!(host_view.waiting_message, None);
    }

    #[tokio::test]
    async fn test_pending_store_is_reported() {
        let store = StoreHandle::pending();
        let mut host = coordinator(&store, "Host");

        assert!(matches!(host.host().await, Err(TambolaError::StoreUnavailable)));
        assert_eq!(host.phase(), LobbyPhase::Idle);

        let mut guest = coordinator(&store, "Guest");
        guest.begin_join().unwrap();
        assert!(matches!(
            guest.submit_join("ABCDEF").await,
            Err(TambolaError::StoreUnavailable)
        ));
        assert_eq!(guest.phase(), LobbyPhase::Joining);

        store.install(Arc::new(MemoryDocumentStore::new()));
        assert!(host.host().await.is_ok());
    }

    #[tokio::test]
    async fn test_teardown_releases_subscription() {
        let store = memory_store();
        let mut host = coordinator(&store, "Host");
        host.host().await.unwrap();

        assert!(matches!(host.begin_join(), Err(TambolaError::InvalidState(_))));

        host.teardown();
        assert_eq!(host.phase(), LobbyPhase::Idle);
        assert!(host.code().is_none());
        assert!(matches!(
            host.next_update().await,
            Err(TambolaError::InvalidState(_))
        ));

        // a fresh game can be hosted afterwards
        let code = host.host().await.unwrap();
        assert_eq!(host.code(), Some(&code));
    }
}
